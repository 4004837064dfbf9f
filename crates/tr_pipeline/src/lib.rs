//! tr_pipeline — deterministic run orchestration (load→validate→enrich→record).
//!
//! The stages are pure over already-loaded inputs; file access and hashing
//! are delegated to `tr_io`. A run always produces all outputs: validation
//! never blocks enrichment here (a failed report still enriches, so callers
//! can show *what* failed next to *what would have been computed*). Gating on
//! `validation.pass` is the binary's job.

#![forbid(unsafe_code)]

use std::fmt;
use std::path::Path;

use serde_json::Value;

use tr_core::request::SimulationRequest;
use tr_io::canonical_json::to_canonical_json_bytes;
use tr_io::hasher::sha256_hex;
use tr_io::loader::{self, EngineResult};
use tr_io::manifest;
use tr_io::IoError;

pub mod enrich;
pub mod run_record;
pub mod validate;

pub use enrich::{enrich, EnrichedResult, EnrichedScenario, EnrichedScenarioSet, ScenarioSummary};
pub use run_record::{build_run_record, RunInputs, RunOutputs, RunRecordDoc, ToolMeta};
pub use validate::{
    validate_request, validate_run, FieldRef, Severity, ValidationIssue, ValidationReport,
};

/// Everything a run needs, already loaded and digested.
#[derive(Debug, Clone)]
pub struct PipelineCtx {
    pub request: SimulationRequest,
    pub engine_result: EngineResult,
    pub request_sha256: String,
    pub engine_result_sha256: String,
    /// RFC3339 UTC instant recorded for the run (callers pin this for
    /// reproducible ids).
    pub timestamp_utc: String,
    pub tool: ToolMeta,
}

/// All artifacts of one run. `enriched_doc` is the JSON form of `enriched`;
/// `enriched_sha256` is the digest of its canonical bytes, and the same
/// digest is echoed inside `run_record`.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub validation: ValidationReport,
    pub enriched: EnrichedResult,
    pub enriched_doc: Value,
    pub enriched_sha256: String,
    pub run_record: RunRecordDoc,
}

/// Single error surface for pipeline orchestration.
#[derive(Debug)]
pub enum PipelineError {
    /// Filesystem access or size-cap failures.
    Io(String),
    /// Input bytes that are not the JSON we require.
    Parse(String),
    /// Manifest policy violations (shape, offline paths, missing files).
    Manifest(String),
    /// A digest pin in the manifest did not match the input.
    Expect(String),
    /// Run-record assembly failures (bad timestamp).
    Record(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use PipelineError::*;
        match self {
            Io(m) => write!(f, "io: {m}"),
            Parse(m) => write!(f, "parse: {m}"),
            Manifest(m) => write!(f, "manifest: {m}"),
            Expect(m) => write!(f, "expect: {m}"),
            Record(m) => write!(f, "record: {m}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        use PipelineError::*;
        match e {
            IoError::Path(m) => Io(m),
            IoError::Limit(m) => Io(m),
            IoError::Json { pointer, msg } => Parse(format!("{pointer}: {msg}")),
            IoError::Manifest(m) => Manifest(m),
            IoError::Expect(m) => Expect(m),
            IoError::Invalid(m) => Record(m),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Parse(e.to_string())
    }
}

/// Run the pipeline over a preloaded context.
pub fn run_with_ctx(ctx: PipelineCtx) -> Result<PipelineOutputs, PipelineError> {
    let validation = validate::validate_run(&ctx.request, &ctx.engine_result);

    let enriched = enrich::enrich(&ctx.request, ctx.engine_result);
    let enriched_doc = serde_json::to_value(&enriched)?;
    let enriched_sha256 = sha256_hex(&to_canonical_json_bytes(&enriched_doc));

    let run_record = run_record::build_run_record(
        &ctx.timestamp_utc,
        &ctx.tool,
        RunInputs {
            request_sha256: ctx.request_sha256,
            engine_result_sha256: ctx.engine_result_sha256,
        },
        &validation,
        RunOutputs {
            enriched_sha256: enriched_sha256.clone(),
        },
    )?;

    Ok(PipelineOutputs {
        validation,
        enriched,
        enriched_doc,
        enriched_sha256,
        run_record,
    })
}

/// Load both inputs from explicit paths, then run.
pub fn run_from_paths(
    request_path: &Path,
    engine_result_path: &Path,
    timestamp_utc: &str,
    tool: ToolMeta,
) -> Result<PipelineOutputs, PipelineError> {
    let loaded = loader::load_inputs(request_path, engine_result_path)?;
    run_with_ctx(PipelineCtx {
        request: loaded.request,
        engine_result: loaded.engine_result,
        request_sha256: loaded.request_sha256,
        engine_result_sha256: loaded.engine_result_sha256,
        timestamp_utc: timestamp_utc.to_string(),
        tool,
    })
}

/// Convenience entry: resolve a manifest, verify its digest pins, then run.
pub fn run_from_manifest_path<P: AsRef<Path>>(
    manifest_path: P,
    timestamp_utc: &str,
    tool: ToolMeta,
) -> Result<PipelineOutputs, PipelineError> {
    let resolved = manifest::load_and_resolve(manifest_path.as_ref())?;
    manifest::verify_expectations(&resolved)?;
    run_from_paths(
        &resolved.request_path,
        &resolved.engine_result_path,
        timestamp_utc,
        tool,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tr_io::loader::engine_result_from_value;

    fn fixture_request() -> SimulationRequest {
        serde_json::from_value(json!({
            "base_year": 2028,
            "revenue": {"goods_annual": 1000000.0, "services_annual": 1000000.0},
            "last_year_taxes_paid": {"icms": 120000.0, "iss": 80000.0, "pis_cofins": 60000.0},
            "growth_rates": {"optimistic": 0.10, "conservative": 0.05, "pessimistic": 0.0}
        }))
        .unwrap()
    }

    fn fixture_engine() -> EngineResult {
        engine_result_from_value(json!({
            "assumptions": {"calculation_mode": "neutral"},
            "projection_2033": {
                "optimistic":   {"year": 2033, "total_tax": 260000.0, "ibs": 200000.0, "cbs": 60000.0, "revenue_projected": 3221020.0},
                "conservative": {"year": 2033, "total_tax": 260000.0, "ibs": 200000.0, "cbs": 60000.0, "revenue_projected": 2552563.125},
                "pessimistic":  {"year": 2033, "total_tax": 260000.0, "ibs": 200000.0, "cbs": 60000.0, "revenue_projected": 2000000.0}
            },
            "transition_2029_2032": [
                {"year": 2029, "total_tax": 260000.0}, {"year": 2030, "total_tax": 260000.0},
                {"year": 2031, "total_tax": 260000.0}, {"year": 2032, "total_tax": 260000.0}
            ]
        }))
        .unwrap()
    }

    fn fixture_ctx() -> PipelineCtx {
        PipelineCtx {
            request: fixture_request(),
            engine_result: fixture_engine(),
            request_sha256: "a".repeat(64),
            engine_result_sha256: "b".repeat(64),
            timestamp_utc: "2026-08-12T10:00:00Z".to_string(),
            tool: ToolMeta::new("trsim", "0.1.0"),
        }
    }

    #[test]
    fn full_run_produces_all_artifacts() {
        let out = run_with_ctx(fixture_ctx()).unwrap();

        assert!(out.validation.pass);
        // Effective rate: 260000 / 2000000 * 100 for every scenario.
        for s in tr_core::scenario::Scenario::ALL {
            let summary = out.enriched.projection_2033.get(s).summary;
            assert_eq!(summary.effective_rate_2033, 13.0);
            assert_eq!(summary.delta_vs_last_year, 0.0);
        }
        assert_eq!(out.enriched.meta.final_year, 2033);
        assert_eq!(out.enriched.baseline.last_year_total, 260000.0);

        assert_eq!(out.enriched_sha256.len(), 64);
        assert_eq!(out.run_record.outputs.enriched_sha256, out.enriched_sha256);
        assert_eq!(out.run_record.inputs.request_sha256, "a".repeat(64));
        assert!(out.run_record.run_id.starts_with("RUN:2026-08-12T10:00:00Z:"));
        assert!(out.run_record.validation.pass);
    }

    #[test]
    fn pinned_timestamp_makes_runs_reproducible() {
        let a = run_with_ctx(fixture_ctx()).unwrap();
        let b = run_with_ctx(fixture_ctx()).unwrap();
        assert_eq!(a.enriched_sha256, b.enriched_sha256);
        assert_eq!(a.run_record, b.run_record);
        assert_eq!(
            to_canonical_json_bytes(&a.enriched_doc),
            to_canonical_json_bytes(&b.enriched_doc)
        );
    }

    #[test]
    fn validation_failure_does_not_block_enrichment() {
        let mut ctx = fixture_ctx();
        ctx.request.base_year = -4;
        let out = run_with_ctx(ctx).unwrap();
        assert!(!out.validation.pass);
        assert!(!out.run_record.validation.pass);
        assert!(out.run_record.validation.errors >= 1);
        // The enriched document still carries the engine's figures.
        assert_eq!(out.enriched.projection_2033.conservative.summary.total_2033, 260000.0);
    }

    #[test]
    fn bad_timestamp_surfaces_as_record_error() {
        let mut ctx = fixture_ctx();
        ctx.timestamp_utc = "not-a-time".to_string();
        let err = run_with_ctx(ctx).unwrap_err();
        assert!(matches!(err, PipelineError::Record(_)));
    }

    #[test]
    fn io_errors_map_to_stable_buckets() {
        let cases = [
            (IoError::Path("p".into()), "io: p"),
            (IoError::Limit("l".into()), "io: l"),
            (
                IoError::Json {
                    pointer: "/".into(),
                    msg: "m".into(),
                },
                "parse: /: m",
            ),
            (IoError::Manifest("m".into()), "manifest: m"),
            (IoError::Expect("e".into()), "expect: e"),
            (IoError::Invalid("t".into()), "record: t"),
        ];
        for (io, text) in cases {
            assert_eq!(PipelineError::from(io).to_string(), text);
        }
    }

    #[test]
    fn run_from_paths_digests_the_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let req = dir.path().join("request.json");
        let er = dir.path().join("engine_result.json");
        std::fs::write(
            &req,
            serde_json::to_vec(&serde_json::to_value(fixture_request()).unwrap()).unwrap(),
        )
        .unwrap();
        std::fs::write(
            &er,
            serde_json::to_vec(&serde_json::to_value(fixture_engine()).unwrap()).unwrap(),
        )
        .unwrap();

        let out = run_from_paths(&req, &er, "2026-08-12T10:00:00Z", ToolMeta::default()).unwrap();
        assert!(out.validation.pass);
        assert_ne!(out.run_record.inputs.request_sha256, out.run_record.inputs.engine_result_sha256);

        let missing = dir.path().join("absent.json");
        let err = run_from_paths(&missing, &er, "2026-08-12T10:00:00Z", ToolMeta::default());
        assert!(matches!(err, Err(PipelineError::Io(_))));
    }
}
