use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, Serializer};
use serde_json::{Value, json};

use crate::response::render_structured;

/// Normalized outcome of a tool call. Built once per call and handed
/// straight to the transport; never retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    Text {
        text: String,
    },
    /// Marks the call as failed for the client without failing the transport.
    Error {
        text: String,
    },
    Structured {
        title: String,
        /// Label/value pairs in the order the handler supplied them.
        fields: Vec<(String, String)>,
    },
}

impl InvocationResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The single text block this result renders to.
    pub fn rendered_text(&self) -> String {
        match self {
            Self::Text { text } | Self::Error { text } => text.clone(),
            Self::Structured { title, fields } => render_structured(title, fields),
        }
    }

    /// MCP `tools/call` result payload.
    pub fn to_value(&self) -> Value {
        let mut payload = json!({
            "content": [{
                "type": "text",
                "text": self.rendered_text()
            }]
        });
        if self.is_error() {
            payload["isError"] = Value::Bool(true);
        }
        payload
    }
}

/// Body of a single resource content item: inline text or raw bytes that
/// travel base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContentBody {
    Text {
        text: String,
    },
    Blob {
        #[serde(serialize_with = "serialize_base64")]
        blob: Vec<u8>,
    },
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub body: ContentBody,
}

impl ContentItem {
    pub fn text(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
            body: ContentBody::Text { text: text.into() },
        }
    }

    pub fn blob(uri: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
            body: ContentBody::Blob { blob: bytes },
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            ContentBody::Text { text } => Some(text),
            ContentBody::Blob { .. } => None,
        }
    }
}

/// Result of a `resources/read`. A handler must return at least one item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResourceFetchResult {
    pub contents: Vec<ContentItem>,
}

impl ResourceFetchResult {
    pub fn new(contents: Vec<ContentItem>) -> Self {
        Self { contents }
    }

    pub fn single(item: ContentItem) -> Self {
        Self {
            contents: vec![item],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "contents": [] }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_result_sets_is_error_flag() {
        let payload = InvocationResult::Error {
            text: "nope".to_string(),
        }
        .to_value();
        assert_eq!(payload["isError"], json!(true));
        assert_eq!(payload["content"][0]["type"], json!("text"));
        assert_eq!(payload["content"][0]["text"], json!("nope"));

        let ok = InvocationResult::Text {
            text: "fine".to_string(),
        }
        .to_value();
        assert!(ok.get("isError").is_none());
    }

    #[test]
    fn text_item_serializes_flat_with_mime_type() {
        let item = ContentItem::text("greeting://Alice", "Hello").with_mime_type("text/plain");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            json!({
                "uri": "greeting://Alice",
                "mimeType": "text/plain",
                "text": "Hello"
            })
        );
    }

    #[test]
    fn blob_item_is_base64_encoded() {
        let item = ContentItem::blob("file://logo", b"hi!".to_vec());
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["blob"], json!("aGkh"));
        assert!(value.get("mimeType").is_none());
        assert!(item.as_text().is_none());
    }

    #[test]
    fn fetch_result_wraps_contents_array() {
        let result = ResourceFetchResult::single(ContentItem::text("info://server", "{}"));
        assert_eq!(result.to_value()["contents"][0]["uri"], json!("info://server"));
        assert!(!result.is_empty());
        assert!(ResourceFetchResult::default().is_empty());
    }
}
