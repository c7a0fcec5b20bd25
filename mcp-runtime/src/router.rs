use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::{ConfigurationError, DispatchError, HandlerFault, ResourceFetchResult};
use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::guard;
use crate::template::{ResourceParams, UriTemplate};

/// Executable half of a resource.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Called with the requested URI and every placeholder already bound.
    async fn read(
        &self,
        uri: &str,
        params: &ResourceParams,
    ) -> Result<ResourceFetchResult, HandlerFault>;
}

#[derive(Clone)]
pub struct ResourceDescriptor {
    pub name: String,
    pub description: String,
    pub template: UriTemplate,
    pub mime_type: Option<String>,
    handler: Arc<dyn ResourceHandler>,
}

impl ResourceDescriptor {
    /// Fails when `uri_template` is malformed.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        uri_template: &str,
        handler: impl ResourceHandler + 'static,
    ) -> Result<Self, ConfigurationError> {
        Ok(Self {
            name: name.into(),
            description: description.into(),
            template: UriTemplate::parse(uri_template)?,
            mime_type: None,
            handler: Arc::new(handler),
        })
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Entry for `resources/list` (static templates) or
    /// `resources/templates/list` (parametrized ones).
    pub fn to_value(&self) -> Value {
        let mut entry = json!({
            "name": self.name,
            "title": self.name,
            "description": self.description,
        });
        let key = if self.template.is_static() {
            "uri"
        } else {
            "uriTemplate"
        };
        entry[key] = Value::String(self.template.to_string());
        if let Some(mime_type) = &self.mime_type {
            entry["mimeType"] = Value::String(mime_type.clone());
        }
        entry
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("template", &self.template.as_str())
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Resource templates in registration order; the first structural match wins.
#[derive(Debug, Default)]
pub struct ResourceRouter {
    resources: IndexMap<String, ResourceDescriptor>,
}

impl ResourceRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, resource: ResourceDescriptor) -> Result<(), ConfigurationError> {
        if self.resources.contains_key(&resource.name) {
            return Err(ConfigurationError::DuplicateName {
                name: resource.name,
            });
        }
        self.resources.insert(resource.name.clone(), resource);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.resources.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Finds the first template `uri` fits and binds its placeholders.
    pub fn resolve(
        &self,
        uri: &str,
    ) -> Result<(&ResourceDescriptor, ResourceParams), DispatchError> {
        self.resources
            .values()
            .find_map(|resource| {
                resource
                    .template
                    .matches(uri)
                    .map(|params| (resource, params))
            })
            .ok_or_else(|| DispatchError::ResourceNotFound {
                uri: uri.to_string(),
            })
    }

    pub async fn fetch(&self, uri: &str) -> Result<ResourceFetchResult, DispatchError> {
        let (resource, params) = self.resolve(uri)?;
        tracing::debug!(resource = %resource.name, uri, "resource read");

        let result = guard::contain(resource.handler.read(uri, &params))
            .await
            .map_err(|fault| {
                tracing::warn!(
                    resource = %resource.name,
                    uri,
                    error = %fault,
                    "resource handler failed"
                );
                DispatchError::Handler {
                    capability: resource.name.clone(),
                    fault,
                }
            })?;

        if result.is_empty() {
            tracing::error!(
                resource = %resource.name,
                uri,
                "resource handler returned no contents"
            );
            return Err(DispatchError::EmptyContents {
                name: resource.name.clone(),
                uri: uri.to_string(),
            });
        }
        Ok(result)
    }
}
