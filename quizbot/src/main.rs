use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use quizbot_lib::BotClient;
use quizbot_lib::Dispatcher;
use quizbot_lib::GameService;
use quizbot_lib::QuizBot;
use quizbot_lib::Settings;
use quizbot_lib::store::init_db;
use simplelog::ConfigBuilder;
use simplelog::LevelFilter;
use simplelog::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "quizbot", version, about = "Telegram buzzer quiz bot")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Poll Telegram and serve games (default).
    Run,
    /// Create the database schema and exit.
    DbInit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the container passes real environment variables.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.settings.log_level)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(cli.settings).await,
        Command::DbInit => db_init(&cli.settings).await,
    }
}

fn init_logging(level: LevelFilter) -> anyhow::Result<()> {
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("rustls")
        .build();
    SimpleLogger::init(level, config).context("failed to initialise logging")
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let token = settings.require_token()?;
    let path = settings.database_path();
    let store = init_db(&path)
        .await
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    let client = BotClient::builder().token(token).build()?;
    let me = client
        .get_me()
        .await
        .context("Telegram rejected BOT_TOKEN")?;
    log::info!(
        "Authorized as @{}",
        me.username.as_deref().unwrap_or(&me.first_name)
    );
    if settings.admin_ids.as_slice().is_empty() {
        log::warn!("DEFAULT_ADMIN_IDS is empty; nobody can host a game");
    }

    let game = GameService::new(store);
    if let Some(active) = game.resume().await? {
        log::info!("Resuming game {} ({})", active.id, active.status.as_str());
    }
    let bot = QuizBot::new(
        Arc::new(client.clone()),
        game,
        settings.admin_ids.as_slice().iter().copied(),
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            log::info!("Shutdown requested");
            cancel.cancel();
        }
    });

    Dispatcher::new(client, bot).run(cancel).await;
    Ok(())
}

async fn db_init(settings: &Settings) -> anyhow::Result<()> {
    let path = settings.database_path();
    let store = init_db(&path)
        .await
        .with_context(|| format!("failed to initialise database at {}", path.display()))?;
    let tables = store.table_names().await?;
    log::info!("Database ready at {}: {}", path.display(), tables.join(", "));
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM from `docker stop`.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;
        use tokio::signal::unix::signal;

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => log::warn!("SIGTERM handler unavailable: {}", e),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Ctrl-C handler failed: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["quizbot", "--database-url", ":memory:"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.settings.database_url, ":memory:");
    }

    #[test]
    fn test_db_init_with_global_flags() {
        let cli = Cli::try_parse_from([
            "quizbot",
            "db-init",
            "--admin-ids",
            "1, 2",
            "--log-level",
            "warning",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Command::DbInit)));
        assert_eq!(cli.settings.admin_ids.as_slice(), &[1, 2]);
        assert_eq!(cli.settings.log_level, LevelFilter::Warn);
    }

    #[tokio::test]
    async fn test_db_init_creates_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("bot.db");
        let cli = Cli::try_parse_from([
            "quizbot",
            "db-init",
            "--database-url",
            &format!("sqlite:///{}", path.display()),
        ])
        .unwrap();
        db_init(&cli.settings).await.unwrap();
        assert!(path.exists());
    }
}
