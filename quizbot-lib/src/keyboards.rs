//! Inline keyboards and their callback payloads.

use std::fmt;

use crate::error::CallbackDataError;
use crate::store::GameStatus;
use crate::telegram::InlineKeyboardButton;
use crate::telegram::InlineKeyboardMarkup;

const PLAYER_REGISTER: &str = "player_register";
const PLAYER_BUZZER: &str = "player_buzzer";
const ADMIN_START_GAME: &str = "admin_start_game";
const ADMIN_START_QUESTION: &str = "admin_start_question";
const ADMIN_FINISH_GAME: &str = "admin_finish_game";
const ADMIN_SHOW_SCORES: &str = "admin_show_scores";
const ADMIN_CORRECT_PREFIX: &str = "admin_correct:";
const ADMIN_WRONG: &str = "admin_wrong";

/// A decoded button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    PlayerRegister,
    PlayerBuzzer,
    AdminStartGame,
    AdminStartQuestion,
    AdminFinishGame,
    AdminShowScores,
    AdminCorrect(i64),
    AdminWrong,
}

impl CallbackAction {
    /// The `callback_data` string for this action.
    pub fn data(&self) -> String {
        match self {
            Self::PlayerRegister => PLAYER_REGISTER.to_string(),
            Self::PlayerBuzzer => PLAYER_BUZZER.to_string(),
            Self::AdminStartGame => ADMIN_START_GAME.to_string(),
            Self::AdminStartQuestion => ADMIN_START_QUESTION.to_string(),
            Self::AdminFinishGame => ADMIN_FINISH_GAME.to_string(),
            Self::AdminShowScores => ADMIN_SHOW_SCORES.to_string(),
            Self::AdminCorrect(team_id) => format!("{}{}", ADMIN_CORRECT_PREFIX, team_id),
            Self::AdminWrong => ADMIN_WRONG.to_string(),
        }
    }

    /// Decodes `callback_data`.
    pub fn parse(data: &str) -> Result<Self, CallbackDataError> {
        if let Some(raw) = data.strip_prefix(ADMIN_CORRECT_PREFIX) {
            return raw
                .trim()
                .parse()
                .map(Self::AdminCorrect)
                .map_err(|_| CallbackDataError::MalformedTeamId(data.to_string()));
        }
        match data {
            PLAYER_REGISTER => Ok(Self::PlayerRegister),
            PLAYER_BUZZER => Ok(Self::PlayerBuzzer),
            ADMIN_START_GAME => Ok(Self::AdminStartGame),
            ADMIN_START_QUESTION => Ok(Self::AdminStartQuestion),
            ADMIN_FINISH_GAME => Ok(Self::AdminFinishGame),
            ADMIN_SHOW_SCORES => Ok(Self::AdminShowScores),
            ADMIN_WRONG => Ok(Self::AdminWrong),
            other => Err(CallbackDataError::Unknown(other.to_string())),
        }
    }

    /// Returns `true` for actions reserved to admins.
    pub fn requires_admin(&self) -> bool {
        !matches!(self, Self::PlayerRegister | Self::PlayerBuzzer)
    }

    fn button(self, text: &str) -> InlineKeyboardButton {
        InlineKeyboardButton::callback(text, self.data())
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.data())
    }
}

/// The player's menu.
///
/// Without a team only registration is offered; with a team the buzzer is
/// shown, live while a question is open and muted otherwise.
pub fn player_menu(has_team: bool, can_press: bool) -> InlineKeyboardMarkup {
    if has_team && can_press {
        return buzzer();
    }
    let button = if !has_team {
        CallbackAction::PlayerRegister.button("🆕 Зарегистрировать команду")
    } else {
        CallbackAction::PlayerBuzzer.button("🔕 Ждём вопрос")
    };
    InlineKeyboardMarkup::new(vec![vec![button]])
}

/// The admin's control panel for the given game status.
pub fn admin_panel(status: Option<GameStatus>) -> InlineKeyboardMarkup {
    let show_scores = || CallbackAction::AdminShowScores.button("📊 Очки");
    let finish_game = || CallbackAction::AdminFinishGame.button("🏁 Завершить игру");

    let rows = match status {
        None | Some(GameStatus::Idle) | Some(GameStatus::Finished) => {
            vec![vec![CallbackAction::AdminStartGame.button("🚀 Начать игру")]]
        }
        Some(GameStatus::Running) => vec![
            vec![CallbackAction::AdminStartQuestion.button("❓ Запустить вопрос")],
            vec![show_scores(), finish_game()],
        ],
        Some(GameStatus::Question) => vec![vec![show_scores(), finish_game()]],
    };
    InlineKeyboardMarkup::new(rows)
}

/// "Correct" / "wrong" buttons for the team currently answering.
pub fn admin_answer(team_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        CallbackAction::AdminCorrect(team_id).button("✅ Верно"),
        CallbackAction::AdminWrong.button("❌ Неверно"),
    ]])
}

/// A lone buzzer button.
pub fn buzzer() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![CallbackAction::PlayerBuzzer.button("БАЗЗЕР 🛎️")]])
}
