use clap::{Parser, Subcommand};
use mcp_gateway::Result;
use mcp_gateway::commands::{init_config, list_tools, serve, show_config};

#[derive(Parser)]
#[command(name = "mcp-gateway")]
#[command(about = "JSON-RPC 2.0 / MCP tool-invocation gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway on stdio
    Serve,
    /// List the registered tools
    Tools,
    /// Manage the gateway configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is the JSON-RPC channel, so diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve().await?,
        Commands::Tools => list_tools()?,
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                init_config()?;
            }
        }
    }

    Ok(())
}
