//! databricks-mcp - Databricks SQL warehouse tools for LLM clients over MCP.

use databricks_mcp::cli::Cli;
use databricks_mcp::config::Config;
use databricks_mcp::error::Result;
use databricks_mcp::logging;
use databricks_mcp::mcp::McpServer;
use databricks_mcp::tools::ToolDispatcher;
use databricks_mcp::warehouse::{self, WarehouseBackend};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse_args();
    match cli.log_path() {
        Some(path) => logging::init_file_logging(&path),
        None => logging::init_stderr_logging(),
    }

    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    // Precedence: CLI arguments > config file > environment variables
    config.warehouse.merge(&cli.to_warehouse_settings());
    config.warehouse.apply_env_defaults();
    cli.apply_polling_overrides(&mut config.polling);

    let policy = config.polling.to_policy()?;
    info!(
        "Polling every {:?}, giving up after {:?}",
        policy.interval, policy.max_wait
    );

    let client = if cli.mock_warehouse {
        info!("Using {} warehouse", WarehouseBackend::Mock.as_str());
        warehouse::connect(WarehouseBackend::Mock, None)?
    } else {
        let resolved = config.warehouse.resolve()?;
        info!("Connecting to {}", resolved.display_string());
        warehouse::connect(WarehouseBackend::Databricks, Some(&resolved))?
    };

    let dispatcher = ToolDispatcher::new(client).with_policy(policy);
    McpServer::new(dispatcher).run_stdio().await
}
