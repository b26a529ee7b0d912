//! sqlchat - chat with your database through a language model.

use anyhow::Context;
use sqlchat::cli::Cli;
use sqlchat::config::{Config, ConnectionConfig};
use sqlchat::error::{ChatError, Result};
use sqlchat::llm::{self, LlmProvider};
use sqlchat::logging;
use sqlchat::orchestrator::ResponseOrchestrator;
use sqlchat::session::Session;
use sqlchat::shell::Shell;
use tokio::io::BufReader;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up API keys and MYSQL_* defaults from a local .env, if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();

    if cli.log_stderr {
        logging::init_stderr_logging();
    } else {
        logging::init_file_logging();
    }

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        return Err(e).context("sqlchat failed");
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration file
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;

    cli.apply_chat_overrides(&mut config.chat);

    let provider = match cli.provider()? {
        Some(provider) => provider,
        None => config
            .llm
            .provider
            .parse::<LlmProvider>()
            .map_err(ChatError::config)?,
    };
    let model = cli.model.clone().or_else(|| config.llm.model.clone());
    info!("Using LLM provider: {}", provider);
    let client = llm::create_client(provider, None, model)?;

    let mut session = Session::new(ResponseOrchestrator::new(client), &config.chat);

    // Build connection config with precedence:
    // 1. CLI arguments (highest)
    // 2. Named connection from config
    // 3. Default connection from config
    // 4. Environment variables
    let explicit = resolve_connection(&cli, &config)?;
    let default_connection = explicit.clone().unwrap_or_else(|| {
        let mut conn = ConnectionConfig::local_default();
        conn.apply_env_defaults();
        conn
    });

    if let Some(conn) = &explicit {
        info!("Connecting to {}", conn.display_string());
        match session.connect(conn).await {
            Ok(()) => println!("Connected to {}", conn.display_string()),
            Err(e) => {
                warn!(kind = ?e.connection_kind(), "Startup connection failed: {}", e);
                println!("Connection failed: {e}");
            }
        }
    } else {
        println!(
            "Not connected. Type /connect to use {} or /help for options.",
            default_connection.display_string()
        );
    }

    let mut shell = Shell::new(session, default_connection);
    shell
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}

/// Resolves the final connection configuration from CLI args, config file, and environment.
fn resolve_connection(cli: &Cli, config: &Config) -> Result<Option<ConnectionConfig>> {
    // Start with CLI connection config if provided
    let mut connection = cli.to_connection_config()?;

    // If no CLI connection, try named connection from config
    if connection.is_none() {
        if let Some(name) = cli.connection_name() {
            connection = config.get_connection(Some(name)).cloned();
            if connection.is_none() {
                return Err(ChatError::config(format!(
                    "Connection '{}' not found in config file",
                    name
                )));
            }
        }
    }

    // If still no connection, try default from config
    if connection.is_none() {
        connection = config.get_connection(None).cloned();
    }

    // Apply environment variable defaults
    if let Some(ref mut conn) = connection {
        conn.apply_env_defaults();
    }

    Ok(connection)
}
