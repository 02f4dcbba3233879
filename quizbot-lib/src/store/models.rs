//! Rows persisted by the store.

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

/// Someone who has talked to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: i64,
    pub tg_user_id: i64,
    pub username: Option<String>,
    pub full_name: Option<String>,
}

/// A team registered by a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    pub id: i64,
    pub name: String,
}

/// Lifecycle of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    /// Created, waiting for the host to start it.
    Idle,
    /// Started, between questions.
    Running,
    /// A question is open and buzzers are live.
    Question,
    /// Over; no longer returned as the active game.
    Finished,
}

impl GameStatus {
    /// Convert to string for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Idle => "idle",
            GameStatus::Running => "running",
            GameStatus::Question => "question",
            GameStatus::Finished => "finished",
        }
    }

    /// Parse from database string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(GameStatus::Idle),
            "running" => Some(GameStatus::Running),
            "question" => Some(GameStatus::Question),
            "finished" => Some(GameStatus::Finished),
            _ => None,
        }
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quiz game run by one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub id: i64,
    pub owner_user_id: i64,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// One question asked during a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub id: i64,
    pub game_id: i64,
    pub question: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Timestamps are stored as unix milliseconds.
pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
