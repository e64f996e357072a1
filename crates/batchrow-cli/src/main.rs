use anyhow::Context;
use batchrow_client::BaserowClient;
use batchrow_core::Settings;
use batchrow_mcp::tools::ToolCatalog;
use batchrow_mcp::{McpServer, ToolExecutor, http_transport};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "batchrow", version, about = "Access-controlled MCP proxy for Baserow production data")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server
    Serve {
        /// Transport to serve on
        #[arg(long, value_enum, default_value_t = TransportArg::Stdio)]
        transport: TransportArg,

        /// Port for the HTTP transport
        #[arg(long, default_value_t = 3000, env = "BATCHROW_HTTP_PORT")]
        port: u16,
    },

    /// Print the tool catalog as JSON and exit
    Tools,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransportArg {
    Stdio,
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; with the stdio transport, stdout carries JSON-RPC.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { transport, port } => {
            let settings = Settings::from_env().context("failed to load configuration")?;
            tracing::info!(
                base_url = %settings.base_url,
                tables = settings.tables.len(),
                "loaded configuration"
            );

            let store = Arc::new(BaserowClient::new(&settings));
            let executor = ToolExecutor::new(store, settings.tables, settings.filter_mode);
            let server = McpServer::new(executor);

            match transport {
                TransportArg::Stdio => server.run_stdio().await?,
                TransportArg::Http => http_transport::run_http(Arc::new(server), port).await?,
            }
        }
        Command::Tools => {
            let catalog = ToolCatalog::new();
            println!("{}", serde_json::to_string_pretty(catalog.definitions())?);
        }
    }

    Ok(())
}
