use tracing::{error, info};

use crate::plan::Plan;

pub fn generate_template(name: String) {
    info!("Generating template: {}", name);
    match name.as_str() {
        "markdown" => {
            println!("{}", crate::export::to_markdown::get_template());
        }
        "plan" => match serde_yaml::to_string(&Plan::default()) {
            Ok(yaml) => println!("{}", yaml),
            Err(e) => error!("Failed to serialize default plan: {}", e),
        },
        _ => {
            error!("Unsupported template: {} - use markdown, plan", name);
        }
    }
}
