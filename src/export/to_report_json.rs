use crate::aggregation::Report;
use crate::errors::ExportResult;

pub fn render(report: &Report) -> ExportResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
