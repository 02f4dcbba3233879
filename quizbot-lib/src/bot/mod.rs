//! Update handlers and the polling loop.
//!
//! [`QuizBot`] turns one Telegram update into store changes and outgoing
//! messages; [`Dispatcher`] feeds it from `getUpdates`.

mod callbacks;
mod commands;
mod dispatcher;

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;

pub use dispatcher::DEFAULT_POLL_TIMEOUT;
pub use dispatcher::Dispatcher;
pub use dispatcher::UpdateSource;

use crate::error::BotError;
use crate::game::GameService;
use crate::game::PendingRegistrations;
use crate::store::Game;
use crate::store::Player;
use crate::store::Store;
use crate::telegram::InlineKeyboardMarkup;
use crate::telegram::Messenger;
use crate::telegram::Update;
use crate::telegram::User;

/// How many broadcast messages are in flight at once.
const BROADCAST_CONCURRENCY: usize = 8;

/// The quiz bot: handlers plus the state they share.
///
/// Cheap to clone; every clone sees the same queues, pending registrations
/// and database.
#[derive(Clone)]
pub struct QuizBot {
    messenger: Arc<dyn Messenger>,
    game: GameService,
    pending: PendingRegistrations,
    admins: Arc<HashSet<i64>>,
}

impl QuizBot {
    /// Creates a bot with a fresh registration state.
    pub fn new(
        messenger: Arc<dyn Messenger>,
        game: GameService,
        admins: impl IntoIterator<Item = i64>,
    ) -> Self {
        Self {
            messenger,
            game,
            pending: PendingRegistrations::new(),
            admins: Arc::new(admins.into_iter().collect()),
        }
    }

    /// Uses an existing registration state instead of a fresh one.
    pub fn with_registrations(mut self, pending: PendingRegistrations) -> Self {
        self.pending = pending;
        self
    }

    /// Returns the game service.
    pub fn game(&self) -> &GameService {
        &self.game
    }

    /// Returns the store.
    pub fn store(&self) -> &Store {
        self.game.store()
    }

    /// Returns the pending team registrations.
    pub fn pending(&self) -> &PendingRegistrations {
        &self.pending
    }

    /// Returns `true` if the user may control the game.
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admins.contains(&user_id)
    }

    /// Handles one update.
    pub async fn handle_update(&self, update: Update) -> Result<(), BotError> {
        if let Some(message) = update.message {
            return self.handle_message(message).await;
        }
        if let Some(query) = update.callback_query {
            return self.handle_callback(query).await;
        }
        log::debug!("Ignoring update {} of unsupported kind", update.update_id);
        Ok(())
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    /// Registers the user or refreshes their name.
    async fn refresh_player(&self, user: &User) -> Result<Player, BotError> {
        let full_name = user.full_name();
        let player = self
            .store()
            .get_or_create_player(user.id, user.username.as_deref(), Some(&full_name))
            .await?;
        Ok(player)
    }

    /// Returns the active game owned by `user_id`, creating one if needed.
    async fn take_over_game(&self, user_id: i64) -> Result<Game, BotError> {
        let store = self.store();
        match store.active_game().await? {
            Some(mut game) => {
                if game.owner_user_id != user_id {
                    store.set_game_owner(&mut game, user_id).await?;
                }
                Ok(game)
            }
            None => Ok(store.create_game(user_id).await?),
        }
    }

    /// Sends `text` to every player. Failures are logged and skipped.
    async fn broadcast(
        &self,
        players: &[Player],
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) {
        futures::stream::iter(players)
            .for_each_concurrent(BROADCAST_CONCURRENCY, |player| async move {
                self.send_logged(player.tg_user_id, text, keyboard).await;
            })
            .await;
    }

    /// Sends `text` to every member of a team.
    async fn notify_team(&self, team_id: i64, text: &str) -> Result<(), BotError> {
        let members = self.store().team_members(team_id).await?;
        self.broadcast(&members, text, None).await;
        Ok(())
    }

    async fn send_logged(&self, chat_id: i64, text: &str, keyboard: Option<&InlineKeyboardMarkup>) {
        if let Err(err) = self.messenger.send_message(chat_id, text, keyboard).await {
            log::warn!("Failed to deliver message to {}: {}", chat_id, err);
        }
    }
}
