//! Run-record assembly.
//!
//! Every run emits a small provenance document next to the enriched output:
//! input and output digests, validation tallies, tool identity, and a run id
//! of the form `RUN:<rfc3339-utc>:<sha256>`. The id's hash is computed over
//! the canonical bytes of the record **without** the id field, then embedded,
//! so the id is well-defined and reproducible from the record itself.

use serde::{Deserialize, Serialize};

use tr_io::canonical_json::to_canonical_json_bytes;
use tr_io::hasher::{normalize_rfc3339_utc_seconds, run_id_from_bytes};
use tr_io::IoResult;

use crate::validate::ValidationReport;

/// Identity of the tool that produced the run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

impl ToolMeta {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        ToolMeta {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl Default for ToolMeta {
    /// Library fallback; binaries pass their own package identity.
    fn default() -> Self {
        ToolMeta::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Canonical digests of the two input documents.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunInputs {
    pub request_sha256: String,
    pub engine_result_sha256: String,
}

/// Canonical digest of the enriched document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunOutputs {
    pub enriched_sha256: String,
}

/// Validation outcome tallies carried in the record. Issue details stay in
/// the report; the record only answers "did it pass, and how noisily".
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub pass: bool,
    pub errors: u32,
    pub warnings: u32,
}

impl From<&ValidationReport> for ValidationSummary {
    fn from(report: &ValidationReport) -> Self {
        ValidationSummary {
            pass: report.pass,
            errors: report.error_count(),
            warnings: report.warning_count(),
        }
    }
}

/// The complete run record as written to `run_record.json`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunRecordDoc {
    pub run_id: String,
    pub timestamp_utc: String,
    pub tool: ToolMeta,
    pub inputs: RunInputs,
    pub validation: ValidationSummary,
    pub outputs: RunOutputs,
}

/// The record minus its id, in the exact field layout of [`RunRecordDoc`].
/// This is the payload the run id hashes.
#[derive(Serialize)]
struct RunRecordBody<'a> {
    timestamp_utc: &'a str,
    tool: &'a ToolMeta,
    inputs: &'a RunInputs,
    validation: &'a ValidationSummary,
    outputs: &'a RunOutputs,
}

/// Assemble the run record. The timestamp is normalized to RFC3339 UTC
/// seconds first so the same instant always yields the same id.
pub fn build_run_record(
    timestamp_utc: &str,
    tool: &ToolMeta,
    inputs: RunInputs,
    validation: &ValidationReport,
    outputs: RunOutputs,
) -> IoResult<RunRecordDoc> {
    let ts = normalize_rfc3339_utc_seconds(timestamp_utc)?;
    let summary = ValidationSummary::from(validation);

    let body = RunRecordBody {
        timestamp_utc: &ts,
        tool,
        inputs: &inputs,
        validation: &summary,
        outputs: &outputs,
    };
    let body_value = serde_json::to_value(&body)?;
    let run_id = run_id_from_bytes(&ts, &to_canonical_json_bytes(&body_value))?;

    Ok(RunRecordDoc {
        run_id,
        timestamp_utc: ts,
        tool: tool.clone(),
        inputs,
        validation: summary,
        outputs,
    })
}
