pub mod to_custom;
pub mod to_enriched_csv;
pub mod to_markdown;
pub mod to_report_json;

use crate::aggregation::FilteredView;
use crate::errors::ExportResult;
use crate::plan::{ExportFileType, Meta};

/// Renders one export profile for the records of `view`
pub fn render(
    view: &FilteredView,
    exporter: &ExportFileType,
    meta: Option<&Meta>,
    top_natures: usize,
) -> ExportResult<String> {
    match exporter {
        ExportFileType::EnrichedCsv => to_enriched_csv::render(view),
        ExportFileType::ReportJson => to_report_json::render(&view.summarize(top_natures)),
        ExportFileType::Markdown => to_markdown::render(&view.summarize(top_natures), meta),
        ExportFileType::Custom(params) => {
            to_custom::render(&view.summarize(top_natures), meta, params)
        }
    }
}
