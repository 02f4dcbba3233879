//! SQLite persistence for players, teams, games and scores.

mod games;
mod models;
mod players;
mod teams;

pub use models::*;

use std::path::Path;

use async_sqlite::Client;
use async_sqlite::ClientBuilder;
use async_sqlite::JournalMode;

use crate::error::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS players (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tg_user_id INTEGER NOT NULL UNIQUE,
        username TEXT,
        full_name TEXT,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        name_key TEXT NOT NULL UNIQUE,
        created_at INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS team_members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        team_id INTEGER NOT NULL,
        player_id INTEGER NOT NULL UNIQUE,
        FOREIGN KEY (team_id) REFERENCES teams(id) ON DELETE CASCADE,
        FOREIGN KEY (player_id) REFERENCES players(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_team_members_team ON team_members(team_id);

    CREATE TABLE IF NOT EXISTS games (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_user_id INTEGER NOT NULL,
        status TEXT NOT NULL DEFAULT 'idle',
        created_at INTEGER NOT NULL,
        finished_at INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_games_status ON games(status);

    CREATE TABLE IF NOT EXISTS game_participants (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        game_id INTEGER NOT NULL,
        team_id INTEGER NOT NULL,
        score INTEGER NOT NULL DEFAULT 0,
        UNIQUE (game_id, team_id),
        FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE,
        FOREIGN KEY (team_id) REFERENCES teams(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS rounds (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        game_id INTEGER NOT NULL,
        question TEXT,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (game_id) REFERENCES games(id) ON DELETE CASCADE
    );
";

/// Handle to the bot database.
///
/// Wraps a single `async-sqlite` connection; statements are executed on its
/// background thread, so the handle is cheap to clone and share between
/// update handlers.
///
/// # Example
///
/// ```ignore
/// use quizbot_lib::Store;
///
/// let store = Store::open("data/bot.db").await?;
/// store.init_schema().await?;
/// ```
#[derive(Clone)]
pub struct Store {
    client: Client,
}

impl Store {
    /// Opens the database at `path`, creating the file and its directory if needed.
    ///
    /// `:memory:` opens a private in-memory database instead.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::open_in_memory().await;
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let client = ClientBuilder::new()
            .path(path)
            .journal_mode(JournalMode::Wal)
            .open()
            .await?;

        Self::with_client(client).await
    }

    /// Opens an in-memory database. Data is lost when the store is dropped.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let client = ClientBuilder::new().path(":memory:").open().await?;
        Self::with_client(client).await
    }

    async fn with_client(client: Client) -> Result<Self, StoreError> {
        client
            .conn(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
            .await?;
        Ok(Self { client })
    }

    /// Creates all tables and checks that the connection answers queries.
    ///
    /// Safe to call on every start.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        self.client
            .conn(|conn| {
                conn.execute_batch(SCHEMA)?;
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            })
            .await?;
        log::debug!("database schema is ready");
        Ok(())
    }

    /// Returns `true` if SQLite enforces foreign keys on this connection.
    pub async fn foreign_keys_enabled(&self) -> Result<bool, StoreError> {
        let enabled = self
            .client
            .conn(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get::<_, i64>(0)))
            .await?;
        Ok(enabled == 1)
    }

    /// Lists the user tables in the database.
    pub async fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let names = self
            .client
            .conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master
                     WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
                     ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(names)
    }
}

/// Opens the database and makes sure the schema exists.
pub async fn init_db(path: impl AsRef<Path>) -> Result<Store, StoreError> {
    let store = Store::open(path).await?;
    store.init_schema().await?;
    Ok(store)
}
