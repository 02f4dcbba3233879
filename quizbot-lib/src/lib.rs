//! Quiz buzzer bot library
//!
//! Everything the `quizbot` binary needs to run a Telegram "buzzer" quiz:
//! a small Bot API client, SQLite persistence, the in-memory round queues
//! and the update handlers that tie them together.

pub mod bot;
pub mod config;
pub mod error;
pub mod format;
pub mod game;
pub mod keyboards;
pub mod rate_limit;
pub mod store;
pub mod telegram;

pub use bot::Dispatcher;
pub use bot::QuizBot;
pub use config::Settings;
pub use game::GameService;
pub use store::Store;
pub use telegram::BotClient;
