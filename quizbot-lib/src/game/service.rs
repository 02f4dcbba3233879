//! Game state transitions and the buzzer race.

use chrono::Utc;

use super::Enqueued;
use super::RoundQueues;
use crate::error::StoreError;
use crate::store::Game;
use crate::store::GameStatus;
use crate::store::Player;
use crate::store::Store;
use crate::store::Team;

/// What happened when a player pressed the buzzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuzzOutcome {
    /// No question is open.
    NoQuestion,
    /// The player has not registered a team.
    NoTeam,
    /// The player's team was already waiting at this position.
    AlreadyQueued { position: usize, team: Team },
    /// The player's team joined the queue at this position.
    Queued { position: usize, team: Team },
}

impl BuzzOutcome {
    /// Text shown to the player in the callback answer.
    pub fn message(&self) -> String {
        match self {
            BuzzOutcome::NoQuestion => {
                "❗ Сейчас нет активного вопроса. Ждите сигнал от ведущего.".to_string()
            }
            BuzzOutcome::NoTeam => {
                "👥 Ты ещё без команды. Используй кнопку регистрации, чтобы участвовать."
                    .to_string()
            }
            BuzzOutcome::AlreadyQueued { position, .. } => {
                format!("ℹ️ Ты уже в очереди, твой номер — №{position}.")
            }
            BuzzOutcome::Queued { position: 1, .. } => {
                "Вы первые! 🔥 Готовьтесь отвечать.".to_string()
            }
            BuzzOutcome::Queued { position, .. } => {
                format!("Записал! Твоя позиция — №{position}.")
            }
        }
    }

    /// 1-based queue position, if the team is queued.
    pub fn position(&self) -> Option<usize> {
        match self {
            BuzzOutcome::AlreadyQueued { position, .. } | BuzzOutcome::Queued { position, .. } => {
                Some(*position)
            }
            _ => None,
        }
    }

    /// The player's team, if it is queued.
    pub fn team(&self) -> Option<&Team> {
        match self {
            BuzzOutcome::AlreadyQueued { team, .. } | BuzzOutcome::Queued { team, .. } => Some(team),
            _ => None,
        }
    }

    /// Returns `true` if this press put the team first in line.
    pub fn is_first(&self) -> bool {
        matches!(self, BuzzOutcome::Queued { position: 1, .. })
    }
}

/// Drives games through `idle → running ⇄ question → finished`.
///
/// Combines the persistent [`Store`] with the in-memory [`RoundQueues`].
/// Cheap to clone.
#[derive(Clone)]
pub struct GameService {
    store: Store,
    queues: RoundQueues,
}

impl GameService {
    /// Creates a service with fresh round queues.
    pub fn new(store: Store) -> Self {
        Self::with_queues(store, RoundQueues::new())
    }

    /// Creates a service sharing existing round queues.
    pub fn with_queues(store: Store, queues: RoundQueues) -> Self {
        Self { store, queues }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The in-memory round queues.
    pub fn queues(&self) -> &RoundQueues {
        &self.queues
    }

    /// Starts (or restarts) a game: every team becomes a participant.
    pub async fn start_game(&self, game: &mut Game) -> Result<(), StoreError> {
        game.status = GameStatus::Running;
        game.finished_at = None;
        self.store.save_game_status(game).await?;
        self.store.ensure_participants(game.id).await?;
        self.queues.close(game.id).await;
        log::info!("game {} started", game.id);
        Ok(())
    }

    /// Opens a new question: buzzers go live with an empty queue.
    pub async fn start_question(&self, game: &mut Game) -> Result<(), StoreError> {
        game.status = GameStatus::Question;
        self.store.save_game_status(game).await?;
        self.queues.open(game.id).await;
        self.store.record_round(game.id, None).await?;
        log::info!("game {}: question opened", game.id);
        Ok(())
    }

    /// Closes the current question.
    pub async fn finish_question(&self, game: &mut Game) -> Result<(), StoreError> {
        game.status = GameStatus::Running;
        self.queues.close(game.id).await;
        self.store.save_game_status(game).await?;
        Ok(())
    }

    /// Finishes the game and drops its queue.
    pub async fn finish_game(&self, game: &mut Game) -> Result<(), StoreError> {
        game.status = GameStatus::Finished;
        game.finished_at = Some(Utc::now());
        self.queues.close(game.id).await;
        self.store.save_game_status(game).await?;
        self.queues.discard(game.id);
        log::info!("game {} finished", game.id);
        Ok(())
    }

    /// Reopens the buzzers of a game that was left with an open question,
    /// e.g. after a restart. Returns the active game, if any.
    pub async fn resume(&self) -> Result<Option<Game>, StoreError> {
        let game = self.store.active_game().await?;
        if let Some(game) = &game {
            if game.status == GameStatus::Question && !self.queues.is_open(game.id).await {
                self.queues.open(game.id).await;
                log::info!("game {}: question reopened", game.id);
            }
        }
        Ok(game)
    }

    /// Handles a buzzer press by `player`.
    ///
    /// `game` may be stale: the press is only queued while the game's
    /// question is still open at the moment the queue lock is taken.
    pub async fn press_buzzer(&self, game: &Game, player: &Player) -> Result<BuzzOutcome, StoreError> {
        if game.status != GameStatus::Question {
            return Ok(BuzzOutcome::NoQuestion);
        }
        let Some(team) = self.store.player_team(player.id).await? else {
            return Ok(BuzzOutcome::NoTeam);
        };

        // Teams registered mid-game still need a score row.
        self.store.ensure_participants(game.id).await?;

        let outcome = match self.queues.enqueue(game.id, team.id).await {
            None => BuzzOutcome::NoQuestion,
            Some(Enqueued::Existing(position)) => BuzzOutcome::AlreadyQueued { position, team },
            Some(Enqueued::New(position)) => {
                log::debug!("game {}: team {} buzzed at #{position}", game.id, team.id);
                BuzzOutcome::Queued { position, team }
            }
        };
        Ok(outcome)
    }

    /// Removes the team that just answered; returns it and the remaining queue.
    pub async fn pop_queue(&self, game: &Game) -> (Option<i64>, Vec<i64>) {
        self.queues.pop_front(game.id).await
    }

    /// Copy of the current queue.
    pub async fn current_queue(&self, game: &Game) -> Vec<i64> {
        self.queues.snapshot(game.id).await
    }

    /// Adds `points` to a team's score in this game.
    pub async fn award_score(&self, game: &Game, team_id: i64, points: i64) -> Result<(), StoreError> {
        self.store.award_score(game.id, team_id, points).await
    }

    /// Score table of the game.
    pub async fn scores(&self, game: &Game) -> Result<Vec<(String, i64)>, StoreError> {
        self.store.scores(game.id).await
    }
}
