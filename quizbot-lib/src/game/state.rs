//! Per-game buzzer queues.

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Result of putting a team into a round queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
    /// The team was appended at this 1-based position.
    New(usize),
    /// The team was already queued at this 1-based position.
    Existing(usize),
}

impl Enqueued {
    /// The team's 1-based position in the queue.
    pub fn position(&self) -> usize {
        match self {
            Enqueued::New(pos) | Enqueued::Existing(pos) => *pos,
        }
    }
}

#[derive(Debug, Default)]
struct Round {
    open: bool,
    teams: VecDeque<i64>,
}

type Queue = Arc<Mutex<Round>>;

/// Order in which teams pressed the buzzer, per game.
///
/// Each game's queue sits behind its own async mutex together with a flag
/// telling whether a question is open. Simultaneous presses are serialised
/// into a strict order, a team can never be queued twice, and a press that
/// arrives after the question closed is refused even if the caller still
/// holds a stale copy of the game. Queues are created closed on first use.
/// Cheap to clone; clones share the same queues.
#[derive(Debug, Clone, Default)]
pub struct RoundQueues {
    queues: Arc<DashMap<i64, Queue>>,
}

impl RoundQueues {
    /// Creates an empty set of queues.
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self, game_id: i64) -> Queue {
        // Clone the Arc out so the map shard is unlocked before awaiting.
        self.queues.entry(game_id).or_default().clone()
    }

    /// Empties the queue and starts accepting presses.
    pub async fn open(&self, game_id: i64) {
        let queue = self.queue(game_id);
        let mut round = queue.lock().await;
        round.teams.clear();
        round.open = true;
    }

    /// Empties the queue and stops accepting presses.
    pub async fn close(&self, game_id: i64) {
        let queue = self.queue(game_id);
        let mut round = queue.lock().await;
        round.teams.clear();
        round.open = false;
    }

    /// Returns `true` while the game's queue accepts presses.
    pub async fn is_open(&self, game_id: i64) -> bool {
        match self.queues.get(&game_id).map(|q| q.clone()) {
            Some(queue) => queue.lock().await.open,
            None => false,
        }
    }

    /// Appends a team unless it is already waiting.
    ///
    /// Returns `None` when the queue is closed.
    pub async fn enqueue(&self, game_id: i64, team_id: i64) -> Option<Enqueued> {
        let queue = self.queue(game_id);
        let mut round = queue.lock().await;
        if !round.open {
            return None;
        }
        if let Some(index) = round.teams.iter().position(|&id| id == team_id) {
            return Some(Enqueued::Existing(index + 1));
        }
        round.teams.push_back(team_id);
        Some(Enqueued::New(round.teams.len()))
    }

    /// Removes the first team and returns it with the teams still waiting.
    pub async fn pop_front(&self, game_id: i64) -> (Option<i64>, Vec<i64>) {
        let queue = self.queue(game_id);
        let mut round = queue.lock().await;
        let removed = round.teams.pop_front();
        (removed, round.teams.iter().copied().collect())
    }

    /// Copy of the current queue.
    pub async fn snapshot(&self, game_id: i64) -> Vec<i64> {
        let queue = self.queue(game_id);
        let round = queue.lock().await;
        round.teams.iter().copied().collect()
    }

    /// Drops all state for a finished game.
    pub fn discard(&self, game_id: i64) {
        self.queues.remove(&game_id);
    }

    /// Returns `true` if the game has queue state.
    pub fn contains(&self, game_id: i64) -> bool {
        self.queues.contains_key(&game_id)
    }
}
