use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tgbase")]
#[command(author, version, about = "Telegram bot with a single-connection PostgreSQL/MySQL storage layer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the bot (default)
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Check that the configured database answers `SELECT 1`
    CheckDb,

    /// Apply, revert or list schema migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Run a single SQL statement and print the rows as JSON
    Query {
        /// SQL text; use `?` placeholders together with --param
        sql: String,

        /// Parameter bound to the next `?` (null, true, false, numbers, otherwise text)
        #[arg(short, long = "param", value_name = "VALUE")]
        params: Vec<String>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Revert the latest applied migration
    Down,
    /// List migrations and whether they are applied
    Status,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Option<Commands> {
        Cli::try_parse_from(std::iter::once("tgbase").chain(args.iter().copied()))
            .unwrap()
            .command
    }

    #[test]
    fn test_no_subcommand() {
        assert_eq!(parse(&[]), None);
    }

    #[test]
    fn test_run_webhook() {
        assert_eq!(parse(&["run", "--webhook"]), Some(Commands::Run { webhook: true }));
        assert_eq!(parse(&["run"]), Some(Commands::Run { webhook: false }));
    }

    #[test]
    fn test_migrate_actions() {
        assert_eq!(
            parse(&["migrate", "down"]),
            Some(Commands::Migrate {
                action: MigrateAction::Down
            })
        );
        assert!(Cli::try_parse_from(["tgbase", "migrate", "sideways"]).is_err());
    }

    #[test]
    fn test_query_params_in_order() {
        assert_eq!(
            parse(&["query", "SELECT ? , ?", "--param", "1", "-p", "O'Brien"]),
            Some(Commands::Query {
                sql: "SELECT ? , ?".to_string(),
                params: vec!["1".to_string(), "O'Brien".to_string()],
            })
        );
    }

    #[test]
    fn test_help_and_usage_errors_stop_at_parsing() {
        let help = Cli::try_parse_from(["tgbase", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);

        let unknown = Cli::try_parse_from(["tgbase", "serve"]).unwrap_err();
        assert_eq!(unknown.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_check_db() {
        assert_eq!(parse(&["check-db"]), Some(Commands::CheckDb));
    }
}
