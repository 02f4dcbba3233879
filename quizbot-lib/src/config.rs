//! Process configuration loaded from flags and environment variables.

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Bot settings.
///
/// Every field can come from a command-line flag or from the environment
/// variable named next to it. The binary loads `.env` before parsing, so the
/// usual deployment only sets environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "quizbot", about = "Telegram buzzer quiz bot")]
pub struct Settings {
    /// Telegram Bot API token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true, global = true)]
    pub bot_token: Option<String>,

    /// Database location, e.g. `sqlite://data/bot.db` or `:memory:`.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://data/bot.db",
        global = true
    )]
    pub database_url: String,

    /// Comma-separated Telegram ids allowed to host games.
    #[arg(
        long = "admin-ids",
        env = "DEFAULT_ADMIN_IDS",
        default_value = "",
        value_parser = parse_admin_ids,
        global = true
    )]
    pub admin_ids: AdminIds,

    /// Log level (TRACE, DEBUG, INFO, WARNING, ERROR).
    #[arg(
        long,
        env = "LOG_LEVEL",
        default_value = "INFO",
        value_parser = parse_log_level,
        global = true
    )]
    pub log_level: LevelFilter,
}

/// Error for settings that are required by a particular subcommand.
#[derive(Debug, thiserror::Error)]
#[error("{0} is not set")]
pub struct MissingSetting(pub &'static str);

impl Settings {
    /// Returns the bot token, which `run` cannot do without.
    pub fn require_token(&self) -> Result<&str, MissingSetting> {
        self.bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(MissingSetting("BOT_TOKEN"))
    }

    /// Filesystem path (or `:memory:`) of the SQLite database.
    pub fn database_path(&self) -> PathBuf {
        database_path(&self.database_url)
    }
}

/// Set of Telegram user ids with host rights.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminIds(Vec<i64>);

impl AdminIds {
    /// Creates the list from explicit ids.
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Ids in configuration order.
    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

/// Parses `"1,  2,3"` style lists; blank items are skipped.
pub fn parse_admin_ids(value: &str) -> Result<AdminIds, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>()
                .map_err(|e| format!("invalid admin id {item:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(AdminIds)
}

/// Parses a log level name, accepting `WARNING` and `CRITICAL` as aliases.
pub fn parse_log_level(value: &str) -> Result<LevelFilter, String> {
    match value.trim().to_ascii_uppercase().as_str() {
        "WARNING" => Ok(LevelFilter::Warn),
        "CRITICAL" | "FATAL" => Ok(LevelFilter::Error),
        other => other
            .parse::<LevelFilter>()
            .map_err(|_| format!("unknown log level {value:?}")),
    }
}

fn database_path(url: &str) -> PathBuf {
    let trimmed = url.trim();
    let path = ["sqlite+aiosqlite:///", "sqlite:///", "sqlite://", "sqlite:"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(args: &[&str]) -> Settings {
        let mut argv = vec!["quizbot"];
        argv.extend_from_slice(args);
        Settings::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_admin_ids_csv() {
        let ids = parse_admin_ids("1,  2,3").unwrap();
        assert_eq!(ids.as_slice(), &[1, 2, 3]);
        assert!(parse_admin_ids("").unwrap().as_slice().is_empty());
        assert_eq!(parse_admin_ids(" 7 ,, 8 ,").unwrap().as_slice(), &[7, 8]);
        assert!(parse_admin_ids("1,two").is_err());
    }

    #[test]
    fn test_settings_from_flags() {
        let settings = settings(&[
            "--bot-token",
            "token",
            "--database-url",
            ":memory:",
            "--admin-ids",
            "1,  2,3",
            "--log-level",
            "warning",
        ]);
        assert_eq!(settings.require_token().unwrap(), "token");
        assert_eq!(settings.admin_ids, AdminIds::new([1, 2, 3]));
        assert_eq!(settings.log_level, LevelFilter::Warn);
        assert_eq!(settings.database_path(), PathBuf::from(":memory:"));
    }

    #[test]
    fn test_blank_token_is_missing() {
        let settings = settings(&["--bot-token", "  "]);
        assert!(settings.require_token().is_err());
    }

    #[test]
    fn test_log_level_aliases() {
        assert_eq!(parse_log_level("INFO").unwrap(), LevelFilter::Info);
        assert_eq!(parse_log_level("critical").unwrap(), LevelFilter::Error);
        assert_eq!(parse_log_level("Debug").unwrap(), LevelFilter::Debug);
        assert!(parse_log_level("loud").is_err());
    }

    #[test]
    fn test_database_url_prefixes() {
        assert_eq!(database_path("sqlite://data/bot.db"), PathBuf::from("data/bot.db"));
        assert_eq!(
            database_path("sqlite+aiosqlite:///data/bot.db"),
            PathBuf::from("data/bot.db")
        );
        assert_eq!(database_path("/var/lib/quizbot.db"), PathBuf::from("/var/lib/quizbot.db"));
    }
}
