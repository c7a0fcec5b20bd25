use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use beacon_core::response;
use beacon_core::{
    ConfigurationError, DispatchError, HandlerFault, InputSchema, InvocationResult, ToolArguments,
};
use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::guard;

/// Executable half of a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Argument names the handler reads. Must match the schema's field names
    /// exactly; checked when the tool is registered.
    fn parameters(&self) -> &[&'static str];

    async fn call(&self, args: ToolArguments) -> Result<InvocationResult, HandlerFault>;
}

#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: InputSchema,
    handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self::from_arc(name, description, input_schema, Arc::new(handler))
    }

    pub fn from_arc(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler,
        }
    }

    pub fn handler(&self) -> &Arc<dyn ToolHandler> {
        &self.handler
    }

    /// Entry for `tools/list`.
    pub fn to_value(&self) -> Value {
        json!({
            "name": self.name,
            "title": self.name,
            "description": self.description,
            "inputSchema": self.input_schema.to_json_schema(),
        })
    }

    fn check_signature(&self) -> Result<(), ConfigurationError> {
        let declared = self.handler.parameters();
        let missing: Vec<String> = declared
            .iter()
            .filter(|param| self.input_schema.get(param).is_none())
            .map(|param| param.to_string())
            .collect();
        let unexpected: Vec<String> = self
            .input_schema
            .field_names()
            .filter(|field| !declared.iter().any(|param| param == field))
            .map(str::to_string)
            .collect();
        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::SchemaMismatch {
                tool: self.name.clone(),
                missing,
                unexpected,
            })
        }
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// Tools by name, in registration order. Read-only once the host is serving.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), ConfigurationError> {
        if self.tools.contains_key(&tool.name) {
            return Err(ConfigurationError::DuplicateName { name: tool.name });
        }
        tool.check_signature()?;
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&ToolDescriptor, DispatchError> {
        self.tools
            .get(name)
            .ok_or_else(|| DispatchError::ToolNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validates `raw_args` and runs the handler. Every failure comes back as
    /// an error-kind result; nothing escapes to the transport.
    pub async fn invoke(&self, name: &str, raw_args: &Value) -> InvocationResult {
        match self.try_invoke(name, raw_args).await {
            Ok(result) => {
                tracing::debug!(tool = name, is_error = result.is_error(), "tool call finished");
                result
            }
            Err(err) => {
                tracing::warn!(tool = name, code = err.code(), error = %err, "tool call failed");
                response::error(err.to_string())
            }
        }
    }

    async fn try_invoke(
        &self,
        name: &str,
        raw_args: &Value,
    ) -> Result<InvocationResult, DispatchError> {
        let tool = self.lookup(name)?;
        let args = tool.input_schema.validate(raw_args)?;
        guard::contain(tool.handler.call(args))
            .await
            .map_err(|fault| DispatchError::Handler {
                capability: tool.name.clone(),
                fault,
            })
    }
}
