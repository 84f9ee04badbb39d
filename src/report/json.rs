//! JSON report.
//!
//! The serialized result plus blocks derived from it: the summary,
//! per-category breakdown, compliance overview and a trends placeholder.

use super::{summary_of, ReportFormat, Reporter};
use crate::analysis::{category_breakdown, compliance};
use crate::error::ReportError;
use crate::models::AnalysisResult;
use serde_json::{json, Value};

pub struct JsonReporter;

impl JsonReporter {
    /// Builds the report document.
    pub fn document(result: &AnalysisResult) -> Result<Value, ReportError> {
        let mut doc = serde_json::to_value(result)?;

        if let Value::Object(ref mut map) = doc {
            map.insert("summary".to_string(), serde_json::to_value(summary_of(result))?);
            map.insert(
                "categories".to_string(),
                serde_json::to_value(category_breakdown(result))?,
            );
            map.insert(
                "compliance".to_string(),
                serde_json::to_value(compliance(result))?,
            );
            map.insert(
                "trends".to_string(),
                json!({ "available": false, "history": [] }),
            );
            map.insert(
                "generator".to_string(),
                json!({ "name": "uxaudit", "version": env!("CARGO_PKG_VERSION") }),
            );
        }

        Ok(doc)
    }
}

impl Reporter for JsonReporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn render(&self, result: &AnalysisResult) -> Result<String, ReportError> {
        let doc = Self::document(result)?;
        serde_json::to_string_pretty(&doc).map_err(Into::into)
    }
}
