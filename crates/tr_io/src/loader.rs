//! Input loading.
//!
//! Two postures, one per input:
//!
//! - The *request* is ours, so it parses strictly into
//!   [`tr_core::request::SimulationRequest`]; a malformed request is a load
//!   error, not something to paper over.
//! - The *engine result* comes from an upstream service we do not control, so
//!   it parses leniently into [`EngineResult`]: a block of the wrong shape
//!   degrades to its default, a numeric field that is absent, null, or
//!   non-numeric coerces to zero, and unknown top-level keys ride along
//!   untouched for re-emission.
//!
//! Both reads are size-capped before parsing.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use tr_core::numeric::coerce;
use tr_core::request::SimulationRequest;
use tr_core::scenario::Scenario;

use crate::{IoError, IoResult};

/// Size cap for request documents.
pub const MAX_REQUEST_BYTES: u64 = 1024 * 1024;
/// Size cap for engine result documents (series can get long).
pub const MAX_ENGINE_RESULT_BYTES: u64 = 8 * 1024 * 1024;

/* ---------------- size-capped reads ---------------- */

/// Read at most `max_bytes` from `path`; anything larger is a `Limit` error.
pub fn read_bytes_limited(path: &Path, max_bytes: u64) -> IoResult<Vec<u8>> {
    let md = fs::metadata(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    if !md.is_file() {
        return Err(IoError::Path(format!("not a file: {}", path.display())));
    }
    if md.len() > max_bytes {
        return Err(IoError::Limit(format!(
            "{} is {} bytes (cap {})",
            path.display(),
            md.len(),
            max_bytes
        )));
    }
    let f = fs::File::open(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let mut buf = Vec::with_capacity(md.len() as usize);
    // take() guards against the file growing between stat and read.
    f.take(max_bytes + 1).read_to_end(&mut buf)?;
    if buf.len() as u64 > max_bytes {
        return Err(IoError::Limit(format!(
            "{} grew past the {} byte cap while reading",
            path.display(),
            max_bytes
        )));
    }
    Ok(buf)
}

/* ---------------- request (strict) ---------------- */

/// Load and strictly parse a simulation request.
pub fn load_request(path: &Path) -> IoResult<SimulationRequest> {
    let bytes = read_bytes_limited(path, MAX_REQUEST_BYTES)?;
    let req = serde_json::from_slice(&bytes).map_err(|e| IoError::Json {
        pointer: "/".to_string(),
        msg: format!("{}: {e}", path.display()),
    })?;
    Ok(req)
}

/* ---------------- engine result (lenient) ---------------- */

fn value_to_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => coerce(n.as_f64().unwrap_or(0.0)),
        _ => 0.0,
    }
}

fn lenient_f64<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(value_to_f64(&v))
}

fn lenient_year<'de, D>(de: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    let y = match &v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        _ => 0,
    };
    Ok(y.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

fn lenient_f64_seq<'de, D>(de: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(match v {
        Value::Array(items) => items.iter().map(value_to_f64).collect(),
        _ => Vec::new(),
    })
}

fn lenient_label_seq<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(match v {
        Value::Array(items) => items.iter().map(label_text).collect(),
        _ => Vec::new(),
    })
}

/// Chart labels arrive as strings or bare numbers (years); render either.
fn label_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// A present-but-wrong-shape block degrades to its default instead of
/// failing the whole load.
fn lenient_block<'de, D, T>(de: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let v = Value::deserialize(de)?;
    Ok(serde_json::from_value(v).unwrap_or_default())
}

fn lenient_rows<'de, D>(de: D) -> Result<Vec<YearRow>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(de)?;
    Ok(match v {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

/// One transition-window row as reported by the engine. Fields the engine
/// left out materialize as zero, so every row always carries the full shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearRow {
    #[serde(deserialize_with = "lenient_year")]
    pub year: i32,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_tax: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ibs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub cbs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub icms: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub iss: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub pis_cofins: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub revenue_projected: f64,
}

/// The engine's final-year figures for one scenario.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioProjection {
    #[serde(deserialize_with = "lenient_year")]
    pub year: i32,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_tax: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ibs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub cbs: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub icms: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub iss: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub pis_cofins: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub revenue_projected: f64,
}

/// All three scenario projections; a missing one is all zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSet {
    #[serde(deserialize_with = "lenient_block")]
    pub optimistic: ScenarioProjection,
    #[serde(deserialize_with = "lenient_block")]
    pub conservative: ScenarioProjection,
    #[serde(deserialize_with = "lenient_block")]
    pub pessimistic: ScenarioProjection,
}

impl ScenarioSet {
    pub fn get(&self, scenario: Scenario) -> &ScenarioProjection {
        match scenario {
            Scenario::Optimistic => &self.optimistic,
            Scenario::Conservative => &self.conservative,
            Scenario::Pessimistic => &self.pessimistic,
        }
    }
}

/// Per-scenario total series for the line chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSeries {
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub optimistic: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub conservative: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub pessimistic: Vec<f64>,
}

impl ScenarioSeries {
    pub fn get(&self, scenario: Scenario) -> &[f64] {
        match scenario {
            Scenario::Optimistic => &self.optimistic,
            Scenario::Conservative => &self.conservative,
            Scenario::Pessimistic => &self.pessimistic,
        }
    }
}

/// Per-tax series for the breakdown chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakdownSeries {
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub icms: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub iss: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub ibs: Vec<f64>,
    #[serde(deserialize_with = "lenient_f64_seq")]
    pub cbs: Vec<f64>,
}

/// Chart-ready series exactly as the engine shipped them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesBlock {
    #[serde(deserialize_with = "lenient_label_seq")]
    pub labels: Vec<String>,
    #[serde(deserialize_with = "lenient_block")]
    pub totals: ScenarioSeries,
    #[serde(deserialize_with = "lenient_block")]
    pub breakdown: BreakdownSeries,
}

/// The upstream engine's result document.
///
/// Known blocks are typed; everything else stays in `extra` and is re-emitted
/// untouched in the enriched document. `assumptions` is pure passthrough.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineResult {
    pub assumptions: Value,
    #[serde(deserialize_with = "lenient_block")]
    pub projection_2033: ScenarioSet,
    #[serde(deserialize_with = "lenient_rows")]
    pub transition_2029_2032: Vec<YearRow>,
    #[serde(deserialize_with = "lenient_block")]
    pub series: SeriesBlock,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lenient parse of an already-loaded JSON value. Only a non-object
/// top level errors.
pub fn engine_result_from_value(value: Value) -> IoResult<EngineResult> {
    let parsed = serde_json::from_value(value)?;
    Ok(parsed)
}

/// Lenient parse of raw engine result bytes.
pub fn engine_result_from_slice(bytes: &[u8]) -> IoResult<EngineResult> {
    let value: Value = serde_json::from_slice(bytes)?;
    engine_result_from_value(value)
}

/// Load an engine result from disk.
pub fn load_engine_result(path: &Path) -> IoResult<EngineResult> {
    let bytes = read_bytes_limited(path, MAX_ENGINE_RESULT_BYTES)?;
    engine_result_from_slice(&bytes).map_err(|e| match e {
        IoError::Json { pointer, msg } => IoError::Json {
            pointer,
            msg: format!("{}: {msg}", path.display()),
        },
        other => other,
    })
}

/* ---------------- paired load with digests ---------------- */

/// Both inputs, typed, plus their canonical sha256 digests for the
/// run record. Each file is read once.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub request: SimulationRequest,
    pub engine_result: EngineResult,
    pub request_sha256: String,
    pub engine_result_sha256: String,
}

/// Load request and engine result together, digesting the canonical form of
/// each file on the way in.
pub fn load_inputs(request_path: &Path, engine_result_path: &Path) -> IoResult<LoadedInputs> {
    let req_bytes = read_bytes_limited(request_path, MAX_REQUEST_BYTES)?;
    let req_value: Value = serde_json::from_slice(&req_bytes).map_err(|e| IoError::Json {
        pointer: "/".to_string(),
        msg: format!("{}: {e}", request_path.display()),
    })?;
    let request_sha256 = crate::hasher::sha256_canonical_value(&req_value);
    let request: SimulationRequest =
        serde_json::from_value(req_value).map_err(|e| IoError::Json {
            pointer: "/".to_string(),
            msg: format!("{}: {e}", request_path.display()),
        })?;

    let er_bytes = read_bytes_limited(engine_result_path, MAX_ENGINE_RESULT_BYTES)?;
    let er_value: Value = serde_json::from_slice(&er_bytes).map_err(|e| IoError::Json {
        pointer: "/".to_string(),
        msg: format!("{}: {e}", engine_result_path.display()),
    })?;
    let engine_result_sha256 = crate::hasher::sha256_canonical_value(&er_value);
    let engine_result = engine_result_from_value(er_value)?;

    Ok(LoadedInputs {
        request,
        engine_result,
        request_sha256,
        engine_result_sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn full_fixture() -> Value {
        json!({
            "assumptions": {"base_year": 2028, "policy": "default"},
            "projection_2033": {
                "optimistic":   {"year": 2033, "revenue_projected": 3221020.0, "icms": 0.0, "iss": 0.0, "ibs": 200000.0, "cbs": 60000.0, "total_tax": 260000.0},
                "conservative": {"year": 2033, "revenue_projected": 2552563.125, "icms": 0.0, "iss": 0.0, "ibs": 200000.0, "cbs": 60000.0, "total_tax": 260000.0},
                "pessimistic":  {"year": 2033, "revenue_projected": 2000000.0, "icms": 0.0, "iss": 0.0, "ibs": 200000.0, "cbs": 60000.0, "total_tax": 260000.0}
            },
            "transition_2029_2032": [
                {"year": 2029, "icms": 90000.0, "iss": 60000.0, "ibs": 50000.0, "cbs": 60000.0, "total_tax": 260000.0},
                {"year": 2030, "icms": 60000.0, "iss": 40000.0, "ibs": 100000.0, "cbs": 60000.0, "total_tax": 260000.0},
                {"year": 2031, "icms": 30000.0, "iss": 20000.0, "ibs": 150000.0, "cbs": 60000.0, "total_tax": 260000.0},
                {"year": 2032, "icms": 0.0, "iss": 0.0, "ibs": 200000.0, "cbs": 60000.0, "total_tax": 260000.0}
            ],
            "series": {
                "labels": [2029, 2030, 2031, 2032, 2033],
                "totals": {
                    "optimistic":   [260000.0, 260000.0, 260000.0, 260000.0, 260000.0],
                    "conservative": [260000.0, 260000.0, 260000.0, 260000.0, 260000.0],
                    "pessimistic":  [260000.0, 260000.0, 260000.0, 260000.0, 260000.0]
                },
                "breakdown": {
                    "icms": [90000.0, 60000.0, 30000.0, 0.0, 0.0],
                    "iss":  [60000.0, 40000.0, 20000.0, 0.0, 0.0],
                    "ibs":  [50000.0, 100000.0, 150000.0, 200000.0, 200000.0],
                    "cbs":  [60000.0, 60000.0, 60000.0, 60000.0, 60000.0]
                }
            }
        })
    }

    #[test]
    fn parses_a_complete_engine_result() {
        let er = engine_result_from_value(full_fixture()).unwrap();
        assert_eq!(er.transition_2029_2032.len(), 4);
        assert_eq!(er.transition_2029_2032[0].year, 2029);
        assert_eq!(er.transition_2029_2032[3].ibs, 200000.0);
        assert_eq!(er.projection_2033.get(Scenario::Conservative).revenue_projected, 2552563.125);
        assert_eq!(er.series.labels, vec!["2029", "2030", "2031", "2032", "2033"]);
        assert_eq!(er.series.totals.get(Scenario::Optimistic).len(), 5);
        assert_eq!(er.series.breakdown.cbs[4], 60000.0);
        assert!(er.extra.is_empty());
    }

    #[test]
    fn missing_blocks_default_to_zero() {
        let er = engine_result_from_value(json!({})).unwrap();
        assert!(er.transition_2029_2032.is_empty());
        assert_eq!(er.projection_2033.optimistic.total_tax, 0.0);
        assert!(er.series.labels.is_empty());
        assert!(er.assumptions.is_null());
    }

    #[test]
    fn non_numeric_fields_coerce_to_zero() {
        let er = engine_result_from_value(json!({
            "transition_2029_2032": [
                {"year": "2029", "icms": "a lot", "iss": null, "ibs": true, "cbs": 60000.0}
            ]
        }))
        .unwrap();
        let row = &er.transition_2029_2032[0];
        assert_eq!(row.year, 0);
        assert_eq!(row.icms, 0.0);
        assert_eq!(row.iss, 0.0);
        assert_eq!(row.ibs, 0.0);
        assert_eq!(row.cbs, 60000.0);
        assert_eq!(row.total_tax, 0.0);
        assert_eq!(row.pis_cofins, 0.0);
        assert_eq!(row.revenue_projected, 0.0);
    }

    #[test]
    fn float_years_truncate() {
        let er = engine_result_from_value(json!({
            "transition_2029_2032": [{"year": 2029.0}]
        }))
        .unwrap();
        assert_eq!(er.transition_2029_2032[0].year, 2029);
    }

    #[test]
    fn wrong_shape_blocks_degrade_to_defaults() {
        let er = engine_result_from_value(json!({
            "projection_2033": [1, 2, 3],
            "transition_2029_2032": {"not": "an array"},
            "series": "nope"
        }))
        .unwrap();
        assert_eq!(er.projection_2033, ScenarioSet::default());
        assert!(er.transition_2029_2032.is_empty());
        assert_eq!(er.series, SeriesBlock::default());
    }

    #[test]
    fn one_bad_scenario_does_not_zero_its_siblings() {
        let er = engine_result_from_value(json!({
            "projection_2033": {
                "optimistic": null,
                "conservative": {"total_tax": 260000.0}
            }
        }))
        .unwrap();
        assert_eq!(er.projection_2033.optimistic, ScenarioProjection::default());
        assert_eq!(er.projection_2033.conservative.total_tax, 260000.0);
    }

    #[test]
    fn unknown_keys_ride_along() {
        let er = engine_result_from_value(json!({
            "transition_2029_2032": [],
            "meta_from_engine": {"engine_version": "1.4.2"}
        }))
        .unwrap();
        assert_eq!(
            er.extra.get("meta_from_engine"),
            Some(&json!({"engine_version": "1.4.2"}))
        );

        let back = serde_json::to_value(&er).unwrap();
        assert_eq!(back["meta_from_engine"]["engine_version"], "1.4.2");
    }

    #[test]
    fn top_level_must_be_an_object() {
        assert!(engine_result_from_value(json!([1, 2, 3])).is_err());
        assert!(engine_result_from_value(json!(null)).is_err());
    }

    #[test]
    fn request_parse_is_strict() {
        // base_year missing: the request side does not coerce.
        let v = json!({
            "revenue": {"goods_annual": 1.0, "services_annual": 1.0},
            "last_year_taxes_paid": {"icms": 0.0, "iss": 0.0, "pis_cofins": 0.0},
            "growth_rates": {"optimistic": 0.1, "conservative": 0.05, "pessimistic": 0.0}
        });
        assert!(serde_json::from_value::<SimulationRequest>(v).is_err());
    }

    #[test]
    fn paired_load_digests_canonical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let req_path = dir.path().join("request.json");
        let er_path = dir.path().join("engine_result.json");

        // Non-canonical formatting on disk; the digest must still be over
        // canonical bytes.
        std::fs::write(
            &req_path,
            "{\n  \"growth_rates\": {\"optimistic\": 0.1, \"conservative\": 0.05, \"pessimistic\": 0.0},\n  \"base_year\": 2028,\n  \"revenue\": {\"goods_annual\": 1000000.0, \"services_annual\": 1000000.0},\n  \"last_year_taxes_paid\": {\"icms\": 120000.0, \"iss\": 80000.0, \"pis_cofins\": 60000.0}\n}",
        )
        .unwrap();
        std::fs::write(&er_path, serde_json::to_vec(&full_fixture()).unwrap()).unwrap();

        let loaded = load_inputs(&req_path, &er_path).unwrap();
        assert_eq!(loaded.request.base_year, 2028);
        assert_eq!(loaded.request.revenue.annual_total(), 2000000.0);
        assert_eq!(loaded.engine_result.transition_2029_2032.len(), 4);

        let req_value: Value =
            serde_json::from_slice(&std::fs::read(&req_path).unwrap()).unwrap();
        let expect = crate::hasher::sha256_canonical_value(&req_value);
        assert_eq!(loaded.request_sha256, expect);
    }

    #[test]
    fn read_cap_is_enforced() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"0123456789").unwrap();
        f.flush().unwrap();
        let err = read_bytes_limited(f.path(), 4).unwrap_err();
        assert!(matches!(err, IoError::Limit(_)));
        assert!(read_bytes_limited(f.path(), 10).is_ok());
    }
}
