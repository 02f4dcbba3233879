//! Shared fixtures for handler tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use quizbot_lib::GameService;
use quizbot_lib::QuizBot;
use quizbot_lib::Store;
use quizbot_lib::error::ApiError;
use quizbot_lib::store::Game;
use quizbot_lib::store::init_db;
use quizbot_lib::store::Player;
use quizbot_lib::store::Team;
use quizbot_lib::telegram::InlineKeyboardMarkup;
use quizbot_lib::telegram::Messenger;
use quizbot_lib::telegram::Update;

pub const ADMIN_ID: i64 = 1;

/// Chat and message id of the message carrying pressed buttons.
pub const PANEL_MESSAGE_ID: i64 = 77;

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl SentMessage {
    pub fn callbacks(&self) -> Vec<String> {
        self.keyboard
            .iter()
            .flat_map(|k| k.buttons())
            .filter_map(|b| b.callback_data.clone())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub alert: bool,
}

/// Records every outgoing call instead of talking to Telegram.
#[derive(Default)]
pub struct RecordingMessenger {
    messages: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<SentMessage>>,
    answers: Mutex<Vec<Answer>>,
    deletes: Mutex<Vec<(i64, i64)>>,
    unreachable: Mutex<HashSet<i64>>,
}

impl RecordingMessenger {
    /// Makes sends to `chat_id` fail like a user who blocked the bot.
    pub fn block(&self, chat_id: i64) {
        self.unreachable.lock().unwrap().insert(chat_id);
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn messages_to(&self, chat_id: i64) -> Vec<SentMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .collect()
    }

    pub fn recipients(&self) -> HashSet<i64> {
        self.messages().iter().map(|m| m.chat_id).collect()
    }

    pub fn edits(&self) -> Vec<SentMessage> {
        self.edits.lock().unwrap().clone()
    }

    pub fn answers(&self) -> Vec<Answer> {
        self.answers.lock().unwrap().clone()
    }

    pub fn last_answer(&self) -> Answer {
        self.answers().pop().expect("no callback answer recorded")
    }

    pub fn deletes(&self) -> Vec<(i64, i64)> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<i64, ApiError> {
        if self.unreachable.lock().unwrap().contains(&chat_id) {
            return Err(ApiError::telegram(403, "Forbidden: bot was blocked by the user"));
        }
        let mut messages = self.messages.lock().unwrap();
        messages.push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(messages.len() as i64 + 1000)
    }

    async fn edit_message(
        &self,
        chat_id: i64,
        _message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), ApiError> {
        self.edits.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        text: &str,
        show_alert: bool,
    ) -> Result<(), ApiError> {
        self.answers.lock().unwrap().push(Answer {
            text: text.to_string(),
            alert: show_alert,
        });
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), ApiError> {
        self.deletes.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }
}

pub struct Harness {
    pub bot: QuizBot,
    pub messenger: Arc<RecordingMessenger>,
}

impl Harness {
    pub async fn new() -> Self {
        let store = init_db(":memory:").await.unwrap();
        let messenger = Arc::new(RecordingMessenger::default());
        let bot = QuizBot::new(messenger.clone(), GameService::new(store), [ADMIN_ID]);
        Self { bot, messenger }
    }

    pub fn store(&self) -> &Store {
        self.bot.store()
    }

    pub fn game(&self) -> &GameService {
        self.bot.game()
    }

    pub async fn player(&self, tg_user_id: i64, name: &str) -> Player {
        self.store()
            .get_or_create_player(tg_user_id, Some(&name.to_lowercase()), Some(name))
            .await
            .unwrap()
    }

    pub async fn player_with_team(&self, tg_user_id: i64, team: &str) -> (Player, Team) {
        let player = self.player(tg_user_id, team).await;
        let team = self.store().register_team(player.id, team).await.unwrap();
        (player, team)
    }

    /// A game owned by the admin, already started.
    pub async fn running_game(&self) -> Game {
        let mut game = self.store().create_game(ADMIN_ID).await.unwrap();
        self.game().start_game(&mut game).await.unwrap();
        game
    }

    /// A started game with an open question.
    pub async fn question_game(&self) -> Game {
        let mut game = self.running_game().await;
        self.game().start_question(&mut game).await.unwrap();
        game
    }

    pub async fn active_game(&self) -> Option<Game> {
        self.store().active_game().await.unwrap()
    }

    pub async fn press(&self, user_id: i64, data: &str) {
        self.bot.handle_update(callback(user_id, data)).await.unwrap();
    }

    pub async fn say(&self, user_id: i64, text: &str) {
        self.bot.handle_update(message(user_id, text)).await.unwrap();
    }
}

pub fn message(user_id: i64, text: &str) -> Update {
    serde_json::from_value(serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "from": {"id": user_id, "is_bot": false, "first_name": "Test", "username": "tester"},
            "chat": {"id": user_id, "type": "private"},
            "date": 1_700_000_000,
            "text": text
        }
    }))
    .unwrap()
}

pub fn callback(user_id: i64, data: &str) -> Update {
    serde_json::from_value(serde_json::json!({
        "update_id": 2,
        "callback_query": {
            "id": "cb",
            "from": {"id": user_id, "is_bot": false, "first_name": "CB", "username": "cb-user"},
            "message": {
                "message_id": PANEL_MESSAGE_ID,
                "chat": {"id": user_id, "type": "private"},
                "date": 1_700_000_000
            },
            "chat_instance": "1",
            "data": data
        }
    }))
    .unwrap()
}
