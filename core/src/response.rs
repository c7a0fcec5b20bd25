//! Small constructors so handlers don't each hand-roll the
//! [`InvocationResult`] shape.

use std::fmt::Display;

use serde_json::{Map, Value};

use crate::content::InvocationResult;

pub fn text(message: impl Into<String>) -> InvocationResult {
    InvocationResult::Text {
        text: message.into(),
    }
}

pub fn error(message: impl Into<String>) -> InvocationResult {
    InvocationResult::Error {
        text: message.into(),
    }
}

/// Text result, optionally followed by a fenced, pretty-printed JSON block.
pub fn success(message: impl Into<String>, data: Option<&Value>) -> InvocationResult {
    let message = message.into();
    let text = match data {
        Some(data) => format!("{message}\n\n```json\n{}\n```", to_pretty_json(data)),
        None => message,
    };
    InvocationResult::Text { text }
}

/// Labelled values rendered under `title`, in the supplied order. Values are
/// formatted with `Display`; no recursion beyond one level.
pub fn structured<I, K, V>(title: impl Into<String>, fields: I) -> InvocationResult
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    InvocationResult::Structured {
        title: title.into(),
        fields: fields
            .into_iter()
            .map(|(label, value)| (label.to_string(), value.to_string()))
            .collect(),
    }
}

/// Like [`structured`] for a JSON object. Strings render raw, everything
/// else as compact JSON.
pub fn structured_json(title: impl Into<String>, fields: &Map<String, Value>) -> InvocationResult {
    structured(
        title,
        fields.iter().map(|(label, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (label.as_str(), rendered)
        }),
    )
}

pub(crate) fn render_structured(title: &str, fields: &[(String, String)]) -> String {
    let lines = fields
        .iter()
        .map(|(label, value)| format!("- **{label}:** {value}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("## {title}\n\n{lines}")
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_keeps_supplied_order_in_one_block() {
        let result = structured("Sum", [("a", 2), ("b", 3), ("result", 5)]);
        let payload = result.to_value();
        let content = payload["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);

        let rendered = content[0]["text"].as_str().unwrap();
        assert_eq!(
            rendered,
            "## Sum\n\n- **a:** 2\n- **b:** 3\n- **result:** 5"
        );
        let a = rendered.find("**a:**").unwrap();
        let b = rendered.find("**b:**").unwrap();
        let r = rendered.find("**result:**").unwrap();
        assert!(a < b && b < r);
    }

    #[test]
    fn structured_json_renders_strings_raw() {
        let map = json!({ "name": "beacon", "tools": 2, "tags": ["a"] });
        let result = structured_json("Server", map.as_object().unwrap());
        let rendered = result.rendered_text();
        assert!(rendered.contains("- **name:** beacon"));
        assert!(rendered.contains("- **tools:** 2"));
        assert!(rendered.contains("- **tags:** [\"a\"]"));
    }

    #[test]
    fn structured_json_keeps_supplied_key_order() {
        let map = json!({ "zeta": 1, "alpha": 2 });
        let result = structured_json("Order", map.as_object().unwrap());
        assert_eq!(
            result.rendered_text(),
            "## Order\n\n- **zeta:** 1\n- **alpha:** 2"
        );
    }

    #[test]
    fn success_appends_fenced_json_only_with_data() {
        assert_eq!(success("done", None).rendered_text(), "done");

        let with_data = success("done", Some(&json!({ "id": 7 }))).rendered_text();
        assert!(with_data.starts_with("done\n\n```json\n"));
        assert!(with_data.contains("\"id\": 7"));
        assert!(with_data.ends_with("```"));
    }

    #[test]
    fn error_is_flagged_text_is_not() {
        assert!(error("bad").is_error());
        assert!(!text("good").is_error());
        assert_eq!(error("bad").rendered_text(), "bad");
    }
}
