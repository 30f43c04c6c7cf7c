use handlebars::{handlebars_helper, Handlebars};
use serde_json::Value;
use tracing::info;

use std::fs::File;
use std::io::Write;
use std::path::Path;

pub fn create_path_if_not_exists(path: &str) -> anyhow::Result<()> {
    // remove the file name from the path
    let path = Path::new(path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Invalid path: no parent directory for '{}'", path))?;
    if !path.as_os_str().is_empty() && !path.exists() {
        info!("Creating path: {:?}", path);
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

pub fn write_string_to_file(filename: &str, content: &str) -> anyhow::Result<()> {
    create_path_if_not_exists(filename)?;
    let path = Path::new(filename);
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn get_handlebars() -> Handlebars<'static> {
    let mut handlebars = Handlebars::new();
    // outputs are csv, markdown and plain text, never html
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars_helper!(exists: |v: Value| {
        !v.is_null() &&
        match v {
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    });
    handlebars.register_helper("exists", Box::new(exists));

    handlebars_helper!(stringeq: |s1: String, s2: String| s1.eq(&s2));
    handlebars.register_helper("stringeq", Box::new(stringeq));

    handlebars_helper!(is_empty: |v: Value| {
        match v {
            serde_json::Value::Array(arr) => arr.is_empty(),
            _ => false,
        }
    });
    handlebars.register_helper("is_empty", Box::new(is_empty));

    // share of `count` in `total`, one decimal
    handlebars_helper!(percent: |count: u64, total: u64| {
        if total == 0 {
            "0.0%".to_string()
        } else {
            format!("{:.1}%", count as f64 * 100.0 / total as f64)
        }
    });
    handlebars.register_helper("percent", Box::new(percent));

    handlebars
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn handlebars_can_iterate_objects() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#each counts as |c|}}
{{c.label}}: {{c.count}}
{{/each}}"#,
                &json!({"counts": [
                    {"label": "Sécurité", "count": 2},
                    {"label": "Propreté", "count": 1}
                ]}),
            )
            .expect("This to render");
        assert_eq!(res, "Sécurité: 2\nPropreté: 1\n");
    }

    #[test]
    fn handlebars_helper_percent_can_render() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                "{{percent a total}} {{percent b 0}}",
                &json!({"a": 1, "b": 3, "total": 8}),
            )
            .expect("This to render");
        assert_eq!(res, "12.5% 0.0%");
    }

    #[test]
    fn handlebars_helper_exists_and_is_empty() {
        let handlebars = get_handlebars();
        let res = handlebars
            .render_template(
                r#"{{#if (exists name)}}A{{/if}}{{#if (exists missing)}}B{{/if}}{{#if (is_empty rows)}}C{{/if}}"#,
                &json!({"name": "x", "missing": null, "rows": []}),
            )
            .expect("This to render");
        assert_eq!(res, "AC");
    }

    #[test]
    fn write_string_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/out.txt");
        write_string_to_file(target.to_str().unwrap(), "contenu").unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "contenu");
    }
}
