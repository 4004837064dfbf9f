// crates/tr_report/src/render_json.rs

//! Canonical JSON rendering of the report model.
//!
//! The bytes come from the workspace's single canonical serializer, so
//! `report.json` follows the same sorted-keys, single-line convention as
//! every other artifact and two renders of one model are byte-identical.

use tr_io::canonical_json::to_canonical_json_bytes;

use crate::{ReportError, ReportModel};

pub fn render_json(model: &ReportModel) -> Result<String, ReportError> {
    let value = serde_json::to_value(model).map_err(|_| ReportError::Serialize("model_to_value"))?;
    let bytes = to_canonical_json_bytes(&value);
    String::from_utf8(bytes).map_err(|_| ReportError::Serialize("utf8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn output_is_canonical_and_parseable() {
        let model = fixtures::model();
        let rendered = render_json(&model).unwrap();
        // Top-level keys in sorted order; "baseline" sorts first.
        assert!(rendered.starts_with(r#"{"baseline""#));
        assert!(!rendered.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, serde_json::to_value(&model).unwrap());
    }

    #[test]
    fn model_round_trips_through_the_rendered_text() {
        let model = fixtures::model();
        let rendered = render_json(&model).unwrap();
        let back: crate::ReportModel = serde_json::from_str(&rendered).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn rendering_is_byte_stable() {
        let model = fixtures::model();
        assert_eq!(render_json(&model).unwrap(), render_json(&model).unwrap());
    }
}
