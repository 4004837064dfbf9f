// crates/tr_cli/src/main.rs

//! trsim — one-shot offline runner: load inputs, validate, enrich, write
//! artifacts, render reports. Diagnostics go to stderr; the exit code is the
//! machine-readable outcome.

#![forbid(unsafe_code)]

mod args;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use chrono::{SecondsFormat, Utc};
use clap::Parser;

use args::Args;
use tr_io::canonical_json::{write_bytes_atomic, write_canonical_file};
use tr_io::loader::LoadedInputs;
use tr_io::{manifest, IoError};
use tr_pipeline::{
    run_from_manifest_path, run_from_paths, validate_run, PipelineError, PipelineOutputs,
    Severity, ToolMeta, ValidationReport,
};

/// Stable process exit codes (scripts key on these).
mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const EXPECT: u8 = 3;
    pub const IO: u8 = 4;
    pub const REPORT: u8 = 5;
    pub const USAGE: u8 = 64;
}

/// Failure buckets, one per non-usage exit code.
#[derive(Debug)]
enum MainError {
    Validation(String),
    Expect(String),
    Io(String),
    Report(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use MainError::*;
        match self {
            Validation(m) => write!(f, "validation failed: {m}"),
            Expect(m) => write!(f, "expectation mismatch: {m}"),
            Io(m) => write!(f, "{m}"),
            Report(m) => write!(f, "report: {m}"),
        }
    }
}

fn exit_code_for(e: &MainError) -> u8 {
    match e {
        MainError::Validation(_) => exitcodes::VALIDATION,
        MainError::Expect(_) => exitcodes::EXPECT,
        MainError::Io(_) => exitcodes::IO,
        MainError::Report(_) => exitcodes::REPORT,
    }
}

fn main() -> ExitCode {
    let parsed = match Args::try_parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            // --help and --version land here too; those are not usage errors.
            let code = if e.use_stderr() {
                exitcodes::USAGE
            } else {
                exitcodes::OK
            };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    if let Err(e) = args::validate(&parsed) {
        eprintln!("trsim: {e}");
        return ExitCode::from(exitcodes::USAGE);
    }

    let outcome = if parsed.validate_only {
        validate_only(&parsed)
    } else {
        run_once(&parsed)
    };

    match outcome {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            eprintln!("trsim: {e}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/* ---------------- modes ---------------- */

/// Load the inputs (verifying manifest pins when present) and report
/// findings without writing anything.
fn validate_only(args: &Args) -> Result<(), MainError> {
    let inputs = load_inputs(args)?;
    let report = validate_run(&inputs.request, &inputs.engine_result);
    print_issues(&report, args.quiet);
    if !report.pass {
        return Err(MainError::Validation(format!(
            "{} error(s)",
            report.error_count()
        )));
    }
    if !args.quiet {
        eprintln!(
            "validate-only: inputs OK ({} warning(s))",
            report.warning_count()
        );
    }
    Ok(())
}

/// One full run. Artifacts land on disk even when validation fails, so the
/// run record always tells what happened; reports are only rendered for a
/// passing run.
fn run_once(args: &Args) -> Result<(), MainError> {
    let timestamp = match &args.timestamp {
        Some(ts) => ts.clone(),
        None => Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    let tool = ToolMeta::new("trsim", env!("CARGO_PKG_VERSION"));

    let outputs = match (&args.manifest, &args.request, &args.engine_result) {
        (Some(manifest_path), _, _) => run_from_manifest_path(manifest_path, &timestamp, tool),
        (None, Some(request), Some(engine_result)) => {
            run_from_paths(request, engine_result, &timestamp, tool)
        }
        _ => return Err(MainError::Io("no inputs named".to_string())),
    }
    .map_err(map_pipeline_err)?;

    write_artifacts(&args.out, &outputs)?;

    print_issues(&outputs.validation, args.quiet);
    if !outputs.validation.pass {
        return Err(MainError::Validation(format!(
            "{} error(s); artifacts written, reports skipped",
            outputs.validation.error_count()
        )));
    }

    render_reports(args, &outputs)?;

    if !args.quiet {
        eprintln!("run: artifacts written to {}", args.out.display());
    }
    Ok(())
}

/* ---------------- steps ---------------- */

fn load_inputs(args: &Args) -> Result<LoadedInputs, MainError> {
    let (request_path, engine_result_path) = match &args.manifest {
        Some(manifest_path) => {
            let resolved = manifest::load_and_resolve(manifest_path).map_err(map_io_err)?;
            manifest::verify_expectations(&resolved).map_err(map_io_err)?;
            (resolved.request_path, resolved.engine_result_path)
        }
        None => match (&args.request, &args.engine_result) {
            (Some(request), Some(engine_result)) => (request.clone(), engine_result.clone()),
            _ => return Err(MainError::Io("no inputs named".to_string())),
        },
    };
    tr_io::loader::load_inputs(&request_path, &engine_result_path).map_err(map_io_err)
}

fn write_artifacts(out_dir: &Path, outputs: &PipelineOutputs) -> Result<(), MainError> {
    fs::create_dir_all(out_dir)
        .map_err(|e| MainError::Io(format!("create {}: {e}", out_dir.display())))?;
    write_canonical_file(&out_dir.join("enriched.json"), &outputs.enriched_doc)
        .map_err(map_io_err)?;
    let record = serde_json::to_value(&outputs.run_record)
        .map_err(|e| MainError::Io(format!("run record to JSON: {e}")))?;
    write_canonical_file(&out_dir.join("run_record.json"), &record).map_err(map_io_err)?;
    Ok(())
}

fn render_reports(args: &Args, outputs: &PipelineOutputs) -> Result<(), MainError> {
    if args.render.is_empty() {
        return Ok(());
    }
    let model = tr_report::build_model(&outputs.enriched);
    for format in &args.render {
        match format.as_str() {
            "json" => {
                let text = tr_report::render_json(&model).map_err(map_report_err)?;
                write_bytes_atomic(&args.out.join("report.json"), text.as_bytes())
                    .map_err(map_io_err)?;
            }
            "html" => {
                let text = tr_report::render_html(&model).map_err(map_report_err)?;
                write_bytes_atomic(&args.out.join("report.html"), text.as_bytes())
                    .map_err(map_io_err)?;
            }
            other => return Err(MainError::Report(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

/// One stderr line per finding; errors always print, warnings obey --quiet.
fn print_issues(report: &ValidationReport, quiet: bool) {
    for issue in &report.issues {
        match issue.severity {
            Severity::Error => {
                eprintln!("error[{}] {}: {}", issue.code, issue.where_, issue.message);
            }
            Severity::Warning if !quiet => {
                eprintln!("warning[{}] {}: {}", issue.code, issue.where_, issue.message);
            }
            Severity::Warning => {}
        }
    }
}

/* ---------------- error mapping ---------------- */

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Expect(m) => MainError::Expect(m),
        other => MainError::Io(other.to_string()),
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Expect(m) => MainError::Expect(m),
        other => MainError::Io(other.to_string()),
    }
}

fn map_report_err(e: tr_report::ReportError) -> MainError {
    MainError::Report(e.to_string())
}
