//! Bot initialization and command registration

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::{config, AppError, AppResult};

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "register and show your chat id")]
    Start,
    #[command(description = "show this help")]
    Help,
}

/// Creates a Bot instance with custom or default API URL
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(AppError)` - Missing token, invalid `BOT_API_URL` or HTTP client failure
pub fn create_bot() -> AppResult<Bot> {
    let token = config::TELEGRAM_TOKEN.as_str();
    if token.is_empty() {
        return Err(AppError::Validation("TELEGRAM_TOKEN is not set".to_string()));
    }

    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    let bot = Bot::with_client(token, client);

    let bot = if let Some(ref bot_api_url) = *config::BOT_API_URL {
        log::info!("Using custom Bot API URL: {}", bot_api_url);
        bot.set_api_url(url::Url::parse(bot_api_url)?)
    } else {
        bot
    };

    Ok(bot)
}

/// Registers the command list shown in the Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
