//! Minimal Telegram Bot API client.
//!
//! Only the calls the bot needs are implemented: long polling, sending and
//! editing messages, deleting messages and answering callback queries.

mod client;
mod messenger;
mod types;

pub use client::*;
pub use messenger::Messenger;
pub use types::*;
