//! The outgoing side of the bot, as a trait.

use async_trait::async_trait;

use super::client::BotClient;
use super::types::InlineKeyboardMarkup;
use crate::error::ApiError;

/// Everything the handlers send to Telegram.
///
/// [`BotClient`] is the real implementation; tests record calls instead.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends an HTML message, returning the new message id.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, ApiError>;

    /// Replaces the text and keyboard of an existing message.
    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), ApiError>;

    /// Answers a callback query; an empty `text` shows nothing.
    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), ApiError>;

    /// Deletes a message.
    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ApiError>;
}

#[async_trait]
impl Messenger for BotClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, ApiError> {
        BotClient::send_message(self, chat_id, text, keyboard)
            .await
            .map(|message| message.message_id)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), ApiError> {
        self.edit_message_text(chat_id, message_id, text, keyboard)
            .await
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), ApiError> {
        self.answer_callback_query(callback_id, text, show_alert)
            .await
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ApiError> {
        BotClient::delete_message(self, chat_id, message_id).await
    }
}
