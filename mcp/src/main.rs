use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use beacon_mcp_runtime::{McpCommands, ProcessIdentity, run};

#[derive(Parser)]
#[command(
    name = "beacon-mcp",
    version,
    about = "Beacon MCP server: schema-checked tools and templated resources over stdio"
)]
struct Cli {
    #[command(subcommand)]
    command: McpCommands,
}

fn init_tracing(command: &McpCommands) {
    let (level, json) = match command {
        McpCommands::Serve(args) => (args.log_level.as_str(), args.log_json),
        McpCommands::Describe => ("warn", false),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the protocol; logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.command);

    let identity = ProcessIdentity::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
        .with_title("Beacon");
    let code = run(identity, cli.command).await;
    std::process::exit(code);
}
