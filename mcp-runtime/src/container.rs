use std::collections::HashSet;

use beacon_core::ConfigurationError;
use serde_json::{Value, json};

use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::router::{ResourceDescriptor, ResourceRouter};

/// Registration record for one capability.
#[derive(Debug, Clone)]
pub enum CapabilityDescriptor {
    Tool(ToolDescriptor),
    Resource(ResourceDescriptor),
}

impl CapabilityDescriptor {
    pub fn name(&self) -> &str {
        match self {
            Self::Tool(tool) => &tool.name,
            Self::Resource(resource) => &resource.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tool(_) => "tool",
            Self::Resource(_) => "resource",
        }
    }
}

impl From<ToolDescriptor> for CapabilityDescriptor {
    fn from(tool: ToolDescriptor) -> Self {
        Self::Tool(tool)
    }
}

impl From<ResourceDescriptor> for CapabilityDescriptor {
    fn from(resource: ResourceDescriptor) -> Self {
        Self::Resource(resource)
    }
}

/// Borrowed view handed to [`CapabilityContainer::for_each`].
#[derive(Debug, Clone, Copy)]
pub enum Capability<'a> {
    Tool(&'a ToolDescriptor),
    Resource(&'a ResourceDescriptor),
}

impl Capability<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Tool(tool) => &tool.name,
            Self::Resource(resource) => &resource.name,
        }
    }
}

#[derive(Debug, Default)]
pub struct CapabilityContainerBuilder {
    pending: Vec<CapabilityDescriptor>,
}

impl CapabilityContainerBuilder {
    pub fn tool(self, tool: ToolDescriptor) -> Self {
        self.register(tool)
    }

    pub fn resource(self, resource: ResourceDescriptor) -> Self {
        self.register(resource)
    }

    pub fn register(mut self, descriptor: impl Into<CapabilityDescriptor>) -> Self {
        self.pending.push(descriptor.into());
        self
    }

    pub fn extend<I>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<CapabilityDescriptor>,
    {
        self.pending.extend(descriptors.into_iter().map(Into::into));
        self
    }

    /// Names are unique across tools and resources together.
    pub fn build(self) -> Result<CapabilityContainer, ConfigurationError> {
        let mut seen = HashSet::new();
        let mut container = CapabilityContainer::default();
        for descriptor in self.pending {
            if !seen.insert(descriptor.name().to_string()) {
                return Err(ConfigurationError::DuplicateName {
                    name: descriptor.name().to_string(),
                });
            }
            tracing::debug!(
                kind = descriptor.kind(),
                name = descriptor.name(),
                "registering capability"
            );
            match descriptor {
                CapabilityDescriptor::Tool(tool) => {
                    container.order.push((Kind::Tool, tool.name.clone()));
                    container.tools.register(tool)?;
                }
                CapabilityDescriptor::Resource(resource) => {
                    container
                        .order
                        .push((Kind::Resource, resource.name.clone()));
                    container.resources.register(resource)?;
                }
            }
        }
        Ok(container)
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Tool,
    Resource,
}

/// Every capability the host serves. Read-only after [`CapabilityContainerBuilder::build`].
#[derive(Debug, Default)]
pub struct CapabilityContainer {
    tools: ToolRegistry,
    resources: ResourceRouter,
    order: Vec<(Kind, String)>,
}

impl CapabilityContainer {
    pub fn builder() -> CapabilityContainerBuilder {
        CapabilityContainerBuilder::default()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn resources(&self) -> &ResourceRouter {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Visits every capability in the order it was registered.
    pub fn for_each<'a, F>(&'a self, mut visit: F)
    where
        F: FnMut(Capability<'a>),
    {
        for (kind, name) in &self.order {
            let capability = match kind {
                Kind::Tool => self.tools.lookup(name).ok().map(Capability::Tool),
                Kind::Resource => self.resources.get(name).map(Capability::Resource),
            };
            if let Some(capability) = capability {
                visit(capability);
            }
        }
    }

    pub fn describe(&self) -> Value {
        let mut tools = Vec::new();
        let mut resources = Vec::new();
        let mut templates = Vec::new();
        self.for_each(|capability| match capability {
            Capability::Tool(tool) => tools.push(tool.to_value()),
            Capability::Resource(resource) if resource.template.is_static() => {
                resources.push(resource.to_value())
            }
            Capability::Resource(resource) => templates.push(resource.to_value()),
        });
        json!({
            "tools": tools,
            "resources": resources,
            "resourceTemplates": templates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolHandler;
    use crate::router::ResourceHandler;
    use crate::template::ResourceParams;
    use async_trait::async_trait;
    use beacon_core::{
        ContentItem, HandlerFault, InputSchema, InvocationResult, ResourceFetchResult,
        ToolArguments, response,
    };

    struct Noop;

    #[async_trait]
    impl ToolHandler for Noop {
        fn parameters(&self) -> &[&'static str] {
            &[]
        }

        async fn call(&self, _args: ToolArguments) -> Result<InvocationResult, HandlerFault> {
            Ok(response::text("ok"))
        }
    }

    #[async_trait]
    impl ResourceHandler for Noop {
        async fn read(
            &self,
            uri: &str,
            _params: &ResourceParams,
        ) -> Result<ResourceFetchResult, HandlerFault> {
            Ok(ResourceFetchResult::single(ContentItem::text(uri, "ok")))
        }
    }

    fn tool(name: &str) -> ToolDescriptor {
        ToolDescriptor::new(name, "test tool", InputSchema::new(), Noop)
    }

    fn resource(name: &str, template: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(name, "test resource", template, Noop).unwrap()
    }

    #[test]
    fn visits_capabilities_in_insertion_order() {
        let container = CapabilityContainer::builder()
            .tool(tool("add"))
            .resource(resource("greeting", "greeting://{name}"))
            .tool(tool("multiply"))
            .resource(resource("info", "info://server"))
            .build()
            .unwrap();

        let mut visited = Vec::new();
        container.for_each(|capability| visited.push(capability.name().to_string()));
        assert_eq!(visited, vec!["add", "greeting", "multiply", "info"]);
        assert_eq!(container.len(), 4);
        assert_eq!(container.tools().len(), 2);
        assert_eq!(container.resources().len(), 2);
    }

    #[test]
    fn duplicate_names_across_kinds_are_fatal() {
        let err = CapabilityContainer::builder()
            .tool(tool("greeting"))
            .resource(resource("greeting", "greeting://{name}"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateName {
                name: "greeting".to_string()
            }
        );
    }

    #[test]
    fn describe_splits_static_resources_from_templates() {
        let container = CapabilityContainer::builder()
            .extend([tool("add"), tool("multiply")])
            .resource(resource("greeting", "greeting://{name}"))
            .resource(resource("info", "info://server"))
            .build()
            .unwrap();

        let described = container.describe();
        assert_eq!(described["tools"].as_array().unwrap().len(), 2);
        assert_eq!(described["resources"][0]["uri"], json!("info://server"));
        assert_eq!(
            described["resourceTemplates"][0]["uriTemplate"],
            json!("greeting://{name}")
        );
    }

    #[test]
    fn empty_container_builds() {
        let container = CapabilityContainer::builder().build().unwrap();
        assert!(container.is_empty());
        assert!(container.tools().is_empty());
    }
}
