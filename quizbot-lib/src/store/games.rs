//! Game, participant and round queries.

use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use async_sqlite::rusqlite::types::Type;
use chrono::Utc;

use super::Game;
use super::GameStatus;
use super::Round;
use super::Store;
use super::models::from_millis;
use super::models::to_millis;
use crate::error::StoreError;

const GAME_COLUMNS: &str = "id, owner_user_id, status, created_at, finished_at";

fn game_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Game> {
    let status: String = row.get(2)?;
    let status = GameStatus::parse(&status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown game status {status:?}").into(),
        )
    })?;
    let finished_at: Option<i64> = row.get(4)?;
    Ok(Game {
        id: row.get(0)?,
        owner_user_id: row.get(1)?,
        status,
        created_at: from_millis(row.get(3)?),
        finished_at: finished_at.map(from_millis),
    })
}

fn round_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Round> {
    Ok(Round {
        id: row.get(0)?,
        game_id: row.get(1)?,
        question: row.get(2)?,
        created_at: from_millis(row.get(3)?),
    })
}

impl Store {
    /// The newest game that has not finished yet.
    pub async fn active_game(&self) -> Result<Option<Game>, StoreError> {
        let game = self
            .client
            .conn(|conn| {
                conn.query_row(
                    &format!(
                        "SELECT {GAME_COLUMNS} FROM games
                         WHERE status != 'finished'
                         ORDER BY created_at DESC, id DESC
                         LIMIT 1"
                    ),
                    [],
                    game_from_row,
                )
                .optional()
            })
            .await?;
        Ok(game)
    }

    /// Loads a game by id.
    pub async fn game(&self, game_id: i64) -> Result<Game, StoreError> {
        let game = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    &format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?"),
                    [game_id],
                    game_from_row,
                )
                .optional()
            })
            .await?;
        game.ok_or(StoreError::NotFound {
            entity: "game",
            id: game_id,
        })
    }

    /// Creates a new game in the `idle` state.
    pub async fn create_game(&self, owner_user_id: i64) -> Result<Game, StoreError> {
        let created_at = Utc::now();
        let millis = to_millis(created_at);

        let id = self
            .client
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO games (owner_user_id, status, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![owner_user_id, GameStatus::Idle.as_str(), millis],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        log::info!("created game {id} owned by {owner_user_id}");
        Ok(Game {
            id,
            owner_user_id,
            status: GameStatus::Idle,
            created_at: from_millis(millis),
            finished_at: None,
        })
    }

    /// Hands a game over to another host.
    pub async fn set_game_owner(&self, game: &mut Game, owner_user_id: i64) -> Result<(), StoreError> {
        let game_id = game.id;
        self.client
            .conn(move |conn| {
                conn.execute(
                    "UPDATE games SET owner_user_id = ?1 WHERE id = ?2",
                    [owner_user_id, game_id],
                )
            })
            .await?;
        game.owner_user_id = owner_user_id;
        Ok(())
    }

    /// Persists `status` and `finished_at` of a game.
    pub async fn save_game_status(&self, game: &Game) -> Result<(), StoreError> {
        let game_id = game.id;
        let status = game.status.as_str();
        let finished_at = game.finished_at.map(to_millis);
        let updated = self
            .client
            .conn(move |conn| {
                conn.execute(
                    "UPDATE games SET status = ?1, finished_at = ?2 WHERE id = ?3",
                    rusqlite::params![status, finished_at, game_id],
                )
            })
            .await?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "game",
                id: game_id,
            });
        }
        Ok(())
    }

    /// Adds a zero-score participant row for every team missing from the game.
    pub async fn ensure_participants(&self, game_id: i64) -> Result<usize, StoreError> {
        let added = self
            .client
            .conn(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO game_participants (game_id, team_id, score)
                     SELECT ?1, id, 0 FROM teams",
                    [game_id],
                )
            })
            .await?;
        Ok(added)
    }

    /// Adds `points` to a team's score, creating its participant row if needed.
    pub async fn award_score(&self, game_id: i64, team_id: i64, points: i64) -> Result<(), StoreError> {
        self.client
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO game_participants (game_id, team_id, score)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(game_id, team_id) DO UPDATE SET score = score + excluded.score",
                    [game_id, team_id, points],
                )
            })
            .await?;
        Ok(())
    }

    /// Score table of a game: highest score first, ties by team name.
    pub async fn scores(&self, game_id: i64) -> Result<Vec<(String, i64)>, StoreError> {
        let rows = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT t.name, p.score
                     FROM game_participants p
                     JOIN teams t ON t.id = p.team_id
                     WHERE p.game_id = ?
                     ORDER BY p.score DESC, t.name ASC",
                )?;
                let rows = stmt.query_map([game_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(rows)
    }

    /// Records that a new question was opened.
    pub async fn record_round(&self, game_id: i64, question: Option<&str>) -> Result<Round, StoreError> {
        let question = question.map(str::to_string);
        let millis = to_millis(Utc::now());
        let stored = question.clone();

        let id = self
            .client
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO rounds (game_id, question, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![game_id, stored, millis],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        Ok(Round {
            id,
            game_id,
            question,
            created_at: from_millis(millis),
        })
    }

    /// Rounds of a game, oldest first.
    pub async fn rounds(&self, game_id: i64) -> Result<Vec<Round>, StoreError> {
        let rounds = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, game_id, question, created_at FROM rounds
                     WHERE game_id = ? ORDER BY id",
                )?;
                let rows = stmt.query_map([game_id], round_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(rounds)
    }
}
