mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};

use handlers::Command;
use limpeh_says::config::Config;
use limpeh_says::logging;
use limpeh_says::relay::Relay;

#[tokio::main]
async fn main() {
    let env_file = std::env::args().nth(1).map(PathBuf::from);

    let config = match Config::load(env_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let _guard = logging::init(None);
            error!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    let _guard = logging::init(Some(&config.log_dir));

    info!("🚀 Starting LimpehSays...");
    if let Some(ref path) = env_file {
        info!("Loaded env file {}", path.display());
    }
    info!(
        "Rate limit: {} requests/minute, model: {}",
        config.rate_limit,
        config.model_tier.model_id()
    );

    let bot = Bot::new(&config.telegram_bot_token);
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let relay = Arc::new(Relay::from_config(&config));

    Dispatcher::builder(bot, handlers::schema())
        .dependencies(dptree::deps![relay])
        .error_handler(LoggingErrorHandler::with_custom_text("Exception while handling an update"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
