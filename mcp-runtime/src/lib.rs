use std::sync::Arc;

use beacon_core::{ConfigurationError, DispatchError};
use clap::{Args, Subcommand};
use serde_json::{Value, json};
use tokio::io::{self, AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;

pub mod config;
pub mod container;
pub mod framing;
mod guard;
pub mod registry;
pub mod resources;
pub mod router;
pub mod template;
pub mod tools;

use framing::{Framing, Incoming, read_message, write_message};

pub use config::{Configuration, ProcessIdentity};
pub use container::{Capability, CapabilityContainer, CapabilityDescriptor};
pub use registry::{ToolDescriptor, ToolHandler, ToolRegistry};
pub use router::{ResourceDescriptor, ResourceHandler, ResourceRouter};
pub use template::{ParamValue, ResourceParams, UriTemplate};

/// Newest first; the first entry is offered when the client asks for
/// something we do not speak.
const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

#[derive(Subcommand)]
pub enum McpCommands {
    /// Run the MCP server over stdio
    Serve(ServeArgs),
    /// Print the capability listing as JSON and exit
    Describe,
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error, off)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
    /// Emit logs as JSON lines on stderr
    #[arg(long, env = "BEACON_LOG_JSON")]
    pub log_json: bool,
    /// API key handed to the server at start-up
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// Refuse to start without an API key
    #[arg(long, env = "BEACON_REQUIRE_API_KEY")]
    pub require_api_key: bool,
}

pub async fn run(identity: ProcessIdentity, command: McpCommands) -> i32 {
    match command {
        McpCommands::Serve(args) => {
            let server = match build_server(identity, &args) {
                Ok(server) => Arc::new(server),
                Err(err) => {
                    tracing::error!(error = %err, "refusing to start");
                    print_error("configuration_error", &err.to_string());
                    return 1;
                }
            };
            match server.serve_stdio().await {
                Ok(()) => 0,
                Err(err) => {
                    print_error("mcp_server_error", &err);
                    1
                }
            }
        }
        McpCommands::Describe => match default_container(&identity) {
            Ok(container) => {
                let mut listing = container.describe();
                listing["serverInfo"] = identity.to_value();
                println!("{}", to_pretty_json(&listing));
                0
            }
            Err(err) => {
                print_error("configuration_error", &err.to_string());
                1
            }
        },
    }
}

fn build_server(
    identity: ProcessIdentity,
    args: &ServeArgs,
) -> Result<McpServer, ConfigurationError> {
    let config = Configuration::from_args(args)?;
    let container = default_container(&identity)?;
    Ok(McpServer::new(identity, config, container))
}

fn print_error(code: &str, message: &str) {
    let payload = json!({
        "error": code,
        "message": message,
    });
    eprintln!("{}", to_pretty_json(&payload));
}

/// The built-in tools and resources.
pub fn default_container(
    identity: &ProcessIdentity,
) -> Result<CapabilityContainer, ConfigurationError> {
    CapabilityContainer::builder()
        .extend(tools::all())
        .extend(resources::all(identity)?)
        .build()
}

pub struct McpServer {
    identity: ProcessIdentity,
    config: Configuration,
    container: CapabilityContainer,
    session_id: String,
}

impl McpServer {
    pub fn new(
        identity: ProcessIdentity,
        config: Configuration,
        container: CapabilityContainer,
    ) -> Self {
        Self {
            identity,
            config,
            container,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn container(&self) -> &CapabilityContainer {
        &self.container
    }

    pub async fn serve_stdio(self: Arc<Self>) -> Result<(), String> {
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Reads until end of input. Every message is handled on its own task;
    /// a single writer task emits responses in completion order.
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tracing::info!(
            session_id = %self.session_id,
            server = %self.identity.name,
            version = %self.identity.version,
            tools = self.container.tools().len(),
            resources = self.container.resources().len(),
            api_key = self.config.api_key().is_some(),
            "serving MCP over stdio"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<(Framing, Value)>();
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some((framing, response)) = rx.recv().await {
                write_message(&mut writer, framing, &response).await?;
            }
            Ok::<(), io::Error>(())
        });

        let mut in_flight = JoinSet::new();
        let read_result = loop {
            let incoming = match read_message(&mut reader).await {
                Ok(Some(incoming)) => incoming,
                Ok(None) => break Ok(()),
                Err(e) => break Err(format!("Failed to read MCP message: {e}")),
            };
            match incoming {
                Incoming::Malformed { framing, reason } => {
                    tracing::warn!(session_id = %self.session_id, %reason, "unparseable message");
                    let response = error_response(Value::Null, RpcError::parse_error(reason));
                    if tx.send((framing, response)).is_err() {
                        break Err("MCP writer stopped".to_string());
                    }
                }
                Incoming::Message { framing, value } => {
                    let server = Arc::clone(&self);
                    let tx = tx.clone();
                    in_flight.spawn(async move {
                        if let Some(response) = server.respond(value).await {
                            // A closed channel means the writer already failed.
                            let _ = tx.send((framing, response));
                        }
                    });
                }
            }
        };

        while let Some(joined) = in_flight.join_next().await {
            if let Err(err) = joined {
                tracing::error!(session_id = %self.session_id, error = %err, "request task failed");
            }
        }
        drop(tx);

        writer_task
            .await
            .map_err(|e| format!("MCP writer task failed: {e}"))?
            .map_err(|e| format!("Failed to write MCP response: {e}"))?;
        tracing::info!(session_id = %self.session_id, "input closed, shutting down");
        read_result
    }

    /// The single value to write back for `incoming`, if any. Non-empty
    /// batches are answered with an array.
    pub async fn respond(&self, incoming: Value) -> Option<Value> {
        let is_batch = incoming.as_array().is_some_and(|batch| !batch.is_empty());
        let mut responses = self.handle_incoming_message(incoming).await;
        if is_batch {
            (!responses.is_empty()).then_some(Value::Array(responses))
        } else {
            responses.pop()
        }
    }

    pub async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        let mut responses = Vec::new();

        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                responses.push(error_response(
                    Value::Null,
                    RpcError::invalid_request("Batch request must not be empty"),
                ));
                return responses;
            }
            for item in batch {
                if let Some(response) = self.handle_single_message(item.clone()).await {
                    responses.push(response);
                }
            }
            return responses;
        }

        if let Some(response) = self.handle_single_message(incoming).await {
            responses.push(response);
        }
        responses
    }

    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Some(obj) = incoming.as_object() else {
            return Some(error_response(
                Value::Null,
                RpcError::invalid_request("Request must be a JSON object"),
            ));
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            let id = obj.get("id").cloned().unwrap_or(Value::Null);
            return Some(error_response(
                id,
                RpcError::invalid_request("jsonrpc must be '2.0'"),
            ));
        }

        let Some(method) = obj.get("method").and_then(Value::as_str) else {
            // A client response; this server never issues requests.
            return None;
        };

        let params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(id) = obj.get("id").cloned() {
            let result = self.handle_request(method, params).await;
            Some(match result {
                Ok(payload) => success_response(id, payload),
                Err(err) => error_response(id, err),
            })
        } else {
            self.handle_notification(method);
            None
        }
    }

    fn handle_notification(&self, method: &str) {
        if matches!(
            method,
            "notifications/initialized" | "notifications/cancelled"
        ) {
            tracing::debug!(session_id = %self.session_id, method, "notification");
            return;
        }
        tracing::debug!(session_id = %self.session_id, method, "ignoring unknown notification");
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        tracing::debug!(session_id = %self.session_id, method, "request");
        match method {
            "initialize" => Ok(self.initialize_payload(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(self.resources_list_payload()),
            "resources/templates/list" => Ok(self.resource_templates_list_payload()),
            "resources/read" => self.handle_resources_read(params).await,
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let protocol_version = requested
            .filter(|version| SUPPORTED_PROTOCOL_VERSIONS.contains(version))
            .unwrap_or(SUPPORTED_PROTOCOL_VERSIONS[0]);
        if requested.is_some_and(|version| version != protocol_version) {
            tracing::info!(
                session_id = %self.session_id,
                requested = requested.unwrap_or_default(),
                offered = protocol_version,
                "client asked for an unsupported protocol version"
            );
        }

        let mut tool_names = Vec::new();
        let mut resource_uris = Vec::new();
        self.container.for_each(|capability| match capability {
            Capability::Tool(tool) => tool_names.push(tool.name.as_str()),
            Capability::Resource(resource) => resource_uris.push(resource.template.as_str()),
        });
        let instructions = format!(
            "Tools: {}. Resources: {}.",
            tool_names.join(", "),
            resource_uris.join(", ")
        );

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {
                    "listChanged": false
                },
                "resources": {
                    "subscribe": false,
                    "listChanged": false
                },
                "prompts": {
                    "listChanged": false
                }
            },
            "serverInfo": self.identity.to_value(),
            "instructions": instructions
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .container
            .tools()
            .iter()
            .map(ToolDescriptor::to_value)
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        let result = self.container.tools().invoke(name, &arguments).await;
        Ok(result.to_value())
    }

    fn resources_list_payload(&self) -> Value {
        let resources: Vec<Value> = self
            .container
            .resources()
            .iter()
            .filter(|resource| resource.template.is_static())
            .map(ResourceDescriptor::to_value)
            .collect();
        json!({ "resources": resources })
    }

    fn resource_templates_list_payload(&self) -> Value {
        let templates: Vec<Value> = self
            .container
            .resources()
            .iter()
            .filter(|resource| !resource.template.is_static())
            .map(ResourceDescriptor::to_value)
            .collect();
        json!({ "resourceTemplates": templates })
    }

    async fn handle_resources_read(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("resources/read params must be an object"))?;
        let uri = params.get("uri").and_then(Value::as_str).ok_or_else(|| {
            RpcError::invalid_params("resources/read requires string field 'uri'")
        })?;

        match self.container.resources().fetch(uri).await {
            Ok(result) => Ok(result.to_value()),
            Err(DispatchError::ResourceNotFound { uri }) => {
                Err(RpcError::resource_not_found(&uri))
            }
            Err(err) => Err(RpcError::internal(err.to_string())
                .with_data(json!({ "error": err.code() }))),
        }
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            code: -32603,
            message: message.into(),
            data: None,
        }
    }

    fn resource_not_found(uri: &str) -> Self {
        Self {
            code: -32002,
            message: format!("Resource not found: {uri}"),
            data: Some(json!({ "uri": uri })),
        }
    }

    fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

fn success_response(id: Value, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

fn error_response(id: Value, error: RpcError) -> Value {
    let mut payload = json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": error.code,
            "message": error.message
        }
    });
    if let Some(data) = error.data {
        payload["error"]["data"] = data;
    }
    payload
}

fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
