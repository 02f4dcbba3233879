//! Team queries and registration.

use std::collections::HashMap;

use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use chrono::Utc;

use super::Store;
use super::Team;
use crate::error::RegistrationError;
use crate::error::StoreError;

fn team_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

fn team_of(conn: &rusqlite::Connection, player_id: i64) -> rusqlite::Result<Option<Team>> {
    conn.query_row(
        "SELECT t.id, t.name FROM teams t
         JOIN team_members m ON m.team_id = t.id
         WHERE m.player_id = ?",
        [player_id],
        team_from_row,
    )
    .optional()
}

/// Case-insensitive uniqueness key for a team name.
pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl Store {
    /// The team a player belongs to, if any.
    pub async fn player_team(&self, player_id: i64) -> Result<Option<Team>, StoreError> {
        let team = self
            .client
            .conn(move |conn| team_of(conn, player_id))
            .await?;
        Ok(team)
    }

    /// Creates a team named `team_name` and makes the player its member.
    ///
    /// Fails if the player already has a team, the trimmed name is empty, or
    /// a team with the same name (ignoring case) exists. Runs in a single
    /// transaction.
    pub async fn register_team(
        &self,
        player_id: i64,
        team_name: &str,
    ) -> Result<Team, RegistrationError> {
        let name = team_name.trim().to_string();
        let key = name_key(&name);
        let now = Utc::now().timestamp_millis();

        let outcome = self
            .client
            .conn_mut(move |conn| {
                let tx = conn.transaction()?;

                if team_of(&tx, player_id)?.is_some() {
                    return Ok(Err(RegistrationError::AlreadyInTeam));
                }
                if name.is_empty() {
                    return Ok(Err(RegistrationError::EmptyName));
                }
                let taken = tx
                    .query_row("SELECT 1 FROM teams WHERE name_key = ?", [&key], |_| Ok(()))
                    .optional()?
                    .is_some();
                if taken {
                    return Ok(Err(RegistrationError::NameTaken));
                }

                tx.execute(
                    "INSERT INTO teams (name, name_key, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![&name, &key, now],
                )?;
                let team_id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO team_members (team_id, player_id) VALUES (?1, ?2)",
                    [team_id, player_id],
                )?;
                tx.commit()?;

                Ok(Ok(Team { id: team_id, name }))
            })
            .await?;

        let team = outcome?;
        log::info!("player {player_id} registered team {:?} ({})", team.name, team.id);
        Ok(team)
    }

    /// All registered teams.
    pub async fn teams(&self) -> Result<Vec<Team>, StoreError> {
        let teams = self
            .client
            .conn(|conn| {
                let mut stmt = conn.prepare("SELECT id, name FROM teams ORDER BY id")?;
                let rows = stmt.query_map([], team_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(teams)
    }

    /// Loads the given teams, keyed by id. Unknown ids are skipped.
    pub async fn teams_by_ids(&self, team_ids: &[i64]) -> Result<HashMap<i64, Team>, StoreError> {
        if team_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = team_ids.to_vec();
        let placeholders = vec!["?"; ids.len()].join(", ");

        let teams = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, name FROM teams WHERE id IN ({placeholders})"
                ))?;
                let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), team_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;

        Ok(teams.into_iter().map(|team| (team.id, team)).collect())
    }
}
