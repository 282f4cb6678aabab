// Pinboard collaborative canvas
// Main entry point for the pinboard binary

use clap::Parser;
use pinboard_engine::cli::{Cli, Command, ConfigAction, ItemsAction};
use pinboard_engine::config::Config;
use pinboard_engine::handlers::{
    handle_config_path, handle_config_show, handle_items_list, handle_serve, OutputFormat,
};
use pinboard_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_flag(cli.json);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };

    let config = if cli.config.is_some() {
        Config::load_from_path(&config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    tracing::info!(
        "Pinboard v{} ({} - {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_COMMIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );

    match cli.command {
        Command::Serve { host, port } => handle_serve(config, host, port).await,

        Command::Items { action } => match action {
            ItemsAction::List => handle_items_list(&config, format).await,
        },

        Command::Config { action } => match action {
            ConfigAction::Show => handle_config_show(&config, format),
            ConfigAction::Path => handle_config_path(&config_path, format),
        },
    }
}
