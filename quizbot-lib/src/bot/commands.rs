//! Text message handlers: `/start`, `/help` and team name input.

use super::QuizBot;
use crate::error::BotError;
use crate::format::escape_html;
use crate::format::status_label;
use crate::keyboards;
use crate::store::GameStatus;
use crate::telegram::Message;
use crate::telegram::User;

const HELP_TEXT: &str = "ℹ️ <b>Как всё устроено:</b>\n\
— Ведущий запускает раунды через панель.\n\
— Игроки регистрируют команды и жмут «БАЗЗЕР» по сигналу.\n\
— Бот фиксирует очередь и считает очки до финала.";

/// A bot command found at the start of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Start,
    Help,
    Other,
}

impl Command {
    /// Parses `/name` or `/name@botname`; plain text yields `None`.
    fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or_default();
        Some(match name {
            "start" => Self::Start,
            "help" => Self::Help,
            _ => Self::Other,
        })
    }
}

impl QuizBot {
    /// Handles a text message.
    pub async fn handle_message(&self, message: Message) -> Result<(), BotError> {
        let (Some(user), Some(text)) = (message.from.as_ref(), message.text.as_deref()) else {
            return Ok(());
        };
        let chat_id = message.chat.id;

        match Command::parse(text) {
            Some(Command::Start) => self.cmd_start(chat_id, user).await,
            Some(Command::Help) => {
                self.messenger.send_message(chat_id, HELP_TEXT, None).await?;
                Ok(())
            }
            Some(Command::Other) => Ok(()),
            None => self.registration_input(chat_id, user, text).await,
        }
    }

    async fn cmd_start(&self, chat_id: i64, user: &User) -> Result<(), BotError> {
        let player = self.refresh_player(user).await?;
        if self.is_admin(user.id) {
            let game = self.take_over_game(user.id).await?;
            let text = format!(
                "Привет, ведущий! 🎙️\nТекущий статус: <b>{}</b>\nИспользуй кнопки ниже, чтобы управлять раундом.",
                status_label(Some(game.status))
            );
            let panel = keyboards::admin_panel(Some(game.status));
            self.messenger
                .send_message(chat_id, &text, Some(&panel))
                .await?;
            return Ok(());
        }

        let game = self.store().active_game().await?;
        let team = self.store().player_team(player.id).await?;
        let status = game.as_ref().map(|g| g.status);
        let can_press = team.is_some() && status == Some(GameStatus::Question);
        let text = format!(
            "Привет! 🔔 Это бот «БАЗЗЕР».\nТекущий статус: <b>{}</b>\n\
             Нажимай кнопки под сообщением, чтобы зарегистрировать команду и не пропустить сигнал ведущего.",
            status_label(status)
        );
        let menu = keyboards::player_menu(team.is_some(), can_press);
        self.messenger
            .send_message(chat_id, &text, Some(&menu))
            .await?;
        Ok(())
    }

    /// Treats the text as a team name if the user asked to register.
    async fn registration_input(&self, chat_id: i64, user: &User, text: &str) -> Result<(), BotError> {
        if !self.pending.is_pending(user.id) {
            return Ok(());
        }

        let player = self.refresh_player(user).await?;
        let team = match self.store().register_team(player.id, text).await {
            Ok(team) => team,
            Err(err) if err.is_user_error() => {
                self.messenger
                    .send_message(chat_id, &format!("⚠️ {}", err), None)
                    .await?;
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(game) = self.store().active_game().await? {
            self.store().ensure_participants(game.id).await?;
        }
        self.pending.clear(user.id);

        let text = format!(
            "Готово! 🎉 Ты в команде «{}». Нажми /start, чтобы увидеть обновлённое меню.",
            escape_html(&team.name)
        );
        self.messenger.send_message(chat_id, &text, None).await?;
        Ok(())
    }
}
