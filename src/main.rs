use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;

use tgbase::cli::{Cli, Commands, MigrateAction};
use tgbase::core::{config, init_logger};
use tgbase::storage::migrations::{migrate_down, migrate_up, migration_status};
use tgbase::storage::{Database, Value};
use tgbase::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point
///
/// Parses CLI arguments and dispatches to appropriate subcommand.
/// Without a subcommand the bot runs in polling mode.
#[tokio::main]
async fn main() -> Result<()> {
    // --help and usage errors must exit before the log file is created
    let cli = Cli::parse_args();

    let _ = dotenv();
    init_logger(&config::LOG_FILE_PATH, &config::LOG_LEVEL)?;

    let db = Arc::new(Database::from_env().context("Invalid database configuration")?);

    match cli.command {
        Some(Commands::Run { webhook }) => run_bot(db, webhook).await,
        Some(Commands::CheckDb) => check_db(&db).await,
        Some(Commands::Migrate { action }) => run_migrations(&db, action).await,
        Some(Commands::Query { sql, params }) => run_query(&db, &sql, &params).await,
        None => run_bot(db, false).await,
    }
}

async fn run_bot(db: Arc<Database>, use_webhook: bool) -> Result<()> {
    log::info!("Starting {} (webhook: {})", *config::BOT_NAME, use_webhook);

    log::info!("Testing database connection...");
    if !db.test_connection().await {
        log::error!("No connection to the database");
        anyhow::bail!("No connection to the database");
    }
    log::info!("Database connection OK");

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps::new(Arc::clone(&db), config::BOT_NAME.as_str());
    let mut dispatcher = Dispatcher::builder(bot.clone(), schema(deps))
        .enable_ctrlc_handler()
        .build();

    if use_webhook {
        let url = config::WEBHOOK_URL
            .as_deref()
            .context("--webhook requires WEBHOOK_URL")?;
        let url = url::Url::parse(url).context("Invalid WEBHOOK_URL")?;
        let addr: SocketAddr = config::WEBHOOK_ADDR
            .parse()
            .with_context(|| format!("Invalid WEBHOOK_ADDR: {}", *config::WEBHOOK_ADDR))?;

        log::info!("Starting bot in webhook mode at {} (listening on {})", url, addr);
        let listener = webhooks::axum(bot, webhooks::Options::new(addr, url))
            .await
            .context("Failed to set up webhook")?;

        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
    } else {
        use teloxide::update_listeners::Polling;

        log::info!("Starting bot in long polling mode");
        let listener = Polling::builder(bot).drop_pending_updates().build();

        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("An error from the update listener"),
            )
            .await;
    }

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

async fn check_db(db: &Database) -> Result<()> {
    if db.test_connection().await {
        log::info!("Database connection OK");
        Ok(())
    } else {
        log::error!("No connection to the database");
        anyhow::bail!("No connection to the database")
    }
}

async fn run_migrations(db: &Database, action: MigrateAction) -> Result<()> {
    match action {
        MigrateAction::Up => {
            let applied = migrate_up(db).await?;
            println!("Applied {} migration(s): {:?}", applied.len(), applied);
        }
        MigrateAction::Down => match migrate_down(db).await? {
            Some(version) => println!("Reverted migration {}", version),
            None => println!("Nothing to revert"),
        },
        MigrateAction::Status => {
            for status in migration_status(db).await? {
                let mark = if status.applied { "applied" } else { "pending" };
                println!("{} {:<8} {}", status.version, mark, status.description);
            }
        }
    }
    Ok(())
}

async fn run_query(db: &Database, sql: &str, params: &[String]) -> Result<()> {
    let rows = if params.is_empty() {
        db.raw_query(sql).await?
    } else {
        let values: Vec<Value> = params.iter().map(|p| Value::from_cli_arg(p)).collect();
        db.prepared_query(sql, &values).await?
    };

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}
