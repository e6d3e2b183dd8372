//! /start and /help

use teloxide::prelude::*;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;

use super::types::HandlerDeps;
use crate::core::AppResult;
use crate::storage::users::{self, User};
use crate::telegram::bot::Command;

/// Reply when the user could not be loaded or registered
pub const FAILURE_TEXT: &str = "Something went wrong, please try again later.";
pub const LOCKED_TEXT: &str = "Your account is locked.";

/// Display name for a new user: Telegram username, else first name, else the chat id
pub(super) fn display_name(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map(|u| u.username.clone().unwrap_or_else(|| u.first_name.clone()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| msg.chat.id.0.to_string())
}

pub(super) fn greeting(user: &User, created: bool, bot_name: &str) -> String {
    let intro = if created {
        format!("Welcome to {}, {}!", bot_name, user.name)
    } else {
        format!("Welcome back, {}!", user.name)
    };
    format!("{}\nYour chat id: {}", intro, user.telegram_id)
}

async fn load_user(deps: &HandlerDeps, telegram_id: i64, name: &str) -> AppResult<(User, bool)> {
    let (user, created) = users::get_or_create_user(&deps.db, telegram_id, name).await?;
    if created {
        log::info!("Registered new user {} ({})", user.telegram_id, user.name);
    }
    Ok((user, created))
}

/// Text answering `/start` from `telegram_id`.
///
/// Registers the user on first contact. Locked users get [`LOCKED_TEXT`]; storage
/// failures are logged and answered with [`FAILURE_TEXT`].
pub async fn start_reply(deps: &HandlerDeps, telegram_id: i64, name: &str) -> String {
    match load_user(deps, telegram_id, name).await {
        Ok((user, _)) if user.locked => {
            log::info!("Refused locked user {}", user.telegram_id);
            LOCKED_TEXT.to_string()
        }
        Ok((user, created)) => greeting(&user, created, &deps.bot_name),
        Err(e) => {
            log::error!("Failed to load user {}: {}", telegram_id, e);
            FAILURE_TEXT.to_string()
        }
    }
}

/// Handle /start command
pub(super) async fn handle_start_command(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let reply = start_reply(deps, msg.chat.id.0, &display_name(msg)).await;
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Handle /help command
pub(super) async fn handle_help_command(bot: &Bot, msg: &Message) -> AppResult<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, DbConfig};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn user(name: &str) -> User {
        User {
            id: 7,
            name: name.to_string(),
            roles: Vec::new(),
            telegram_id: 424242,
            locked: false,
        }
    }

    #[test]
    fn test_greeting_for_new_user() {
        assert_eq!(
            greeting(&user("alice"), true, "tgbase"),
            "Welcome to tgbase, alice!\nYour chat id: 424242"
        );
    }

    #[test]
    fn test_greeting_for_returning_user() {
        assert_eq!(
            greeting(&user("alice"), false, "tgbase"),
            "Welcome back, alice!\nYour chat id: 424242"
        );
    }

    #[tokio::test]
    async fn test_start_reply_on_storage_failure() {
        let deps = HandlerDeps::new(Arc::new(Database::new(DbConfig::for_connector("oracle"))), "tgbase");

        assert_eq!(start_reply(&deps, 424242, "alice").await, FAILURE_TEXT);
        assert!(!deps.db.is_connected());
    }
}
