//! Shared types for the Beacon MCP host: input schemas, normalized
//! responses, resource contents and the error taxonomy.

pub mod content;
pub mod error;
pub mod response;
pub mod schema;

pub use content::{ContentBody, ContentItem, InvocationResult, ResourceFetchResult};
pub use error::{ConfigurationError, DispatchError, FieldIssue, HandlerFault, ValidationError};
pub use schema::{FieldKind, FieldSpec, InputSchema, ToolArguments};
