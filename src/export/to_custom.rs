use serde_json::json;
use std::fs;
use tracing::error;

use crate::aggregation::Report;
use crate::errors::{ExportError, ExportResult};
use crate::plan::{CustomExportProfile, Meta};

pub fn render(
    report: &Report,
    meta: Option<&Meta>,
    params: &CustomExportProfile,
) -> ExportResult<String> {
    let mut handlebars = crate::common::get_handlebars();

    if let Some(partials) = &params.partials {
        for (name, partial) in partials {
            match fs::read_to_string(partial) {
                Ok(partial_content) => {
                    if let Err(err) = handlebars.register_partial(name, partial_content) {
                        error!("Failed to register partial '{}': {}", name, err);
                    }
                }
                Err(err) => {
                    error!("Failed to read partial file '{}': {}", partial, err);
                    return Err(ExportError::TemplateError(format!(
                        "Failed to read partial file '{}': {}",
                        partial, err
                    )));
                }
            }
        }
    }

    let template_content = fs::read_to_string(&params.template).map_err(|err| {
        ExportError::TemplateError(format!(
            "Failed to read template file '{}': {}",
            params.template, err
        ))
    })?;

    let res = handlebars.render_template(
        &template_content,
        &json!({
            "report": report,
            "meta": meta,
        }),
    )?;
    Ok(res)
}
