use anyhow::Result;
use dotenvy::dotenv;

pub mod agents;
pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod history;
pub mod interface;
pub mod logger;
pub mod retrieval;
pub mod session;
pub mod utils;

/// Run the application: load `.env`, load config, and start the chat.
///
/// When `enable_dashboard = true` in `earthnight.toml`, the analytics
/// dashboard is spawned as a background task alongside the chat REPL.
pub async fn run() -> Result<()> {
    // Load environment variables from .env
    dotenv().ok();

    let config = config::AppConfig::load();

    if config.enable_dashboard {
        interface::run_chat_with_dashboard(&config).await;
    } else {
        interface::run_chat(&config).await;
    }

    Ok(())
}

// Re-exports for library consumers: common useful types
pub use config::{AppConfig, ServiceSettings};
pub use session::{AssistantSession, ConnectionStatus};
