use async_trait::async_trait;
use beacon_core::{ContentItem, HandlerFault, ResourceFetchResult};

use crate::config::ProcessIdentity;
use crate::router::ResourceHandler;
use crate::template::ResourceParams;

/// Serves the process identity as JSON.
pub struct ServerInfo {
    identity: ProcessIdentity,
}

impl ServerInfo {
    pub fn new(identity: ProcessIdentity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl ResourceHandler for ServerInfo {
    async fn read(
        &self,
        uri: &str,
        _params: &ResourceParams,
    ) -> Result<ResourceFetchResult, HandlerFault> {
        let body = serde_json::to_string_pretty(&self.identity.to_value())
            .map_err(|err| HandlerFault::new(format!("Failed to encode server info: {err}")))?;
        Ok(ResourceFetchResult::single(
            ContentItem::text(uri, body).with_mime_type("application/json"),
        ))
    }
}
