//! Player queries.

use async_sqlite::rusqlite;
use async_sqlite::rusqlite::OptionalExtension;
use chrono::Utc;

use super::Player;
use super::Store;
use crate::error::StoreError;

const PLAYER_COLUMNS: &str = "id, tg_user_id, username, full_name";

pub(crate) fn player_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Player> {
    Ok(Player {
        id: row.get(0)?,
        tg_user_id: row.get(1)?,
        username: row.get(2)?,
        full_name: row.get(3)?,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Store {
    /// Returns the player for a Telegram user, creating the row on first contact.
    ///
    /// Non-empty `username` and `full_name` values overwrite stale ones.
    pub async fn get_or_create_player(
        &self,
        tg_user_id: i64,
        username: Option<&str>,
        full_name: Option<&str>,
    ) -> Result<Player, StoreError> {
        let username = non_empty(username);
        let full_name = non_empty(full_name);
        let now = Utc::now().timestamp_millis();

        let player = self
            .client
            .conn(move |conn| {
                conn.execute(
                    "INSERT INTO players (tg_user_id, username, full_name, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(tg_user_id) DO UPDATE SET
                        username = COALESCE(excluded.username, players.username),
                        full_name = COALESCE(excluded.full_name, players.full_name)",
                    rusqlite::params![tg_user_id, username, full_name, now],
                )?;
                conn.query_row(
                    &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE tg_user_id = ?"),
                    [tg_user_id],
                    player_from_row,
                )
            })
            .await?;
        Ok(player)
    }

    /// Looks up a player by Telegram id without creating one.
    pub async fn find_player(&self, tg_user_id: i64) -> Result<Option<Player>, StoreError> {
        let player = self
            .client
            .conn(move |conn| {
                conn.query_row(
                    &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE tg_user_id = ?"),
                    [tg_user_id],
                    player_from_row,
                )
                .optional()
            })
            .await?;
        Ok(player)
    }

    /// Everyone who has ever talked to the bot.
    pub async fn all_players(&self) -> Result<Vec<Player>, StoreError> {
        self.query_players(format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id"), None)
            .await
    }

    /// Players that are not a member of any team.
    pub async fn players_without_team(&self) -> Result<Vec<Player>, StoreError> {
        self.query_players(
            format!(
                "SELECT {PLAYER_COLUMNS} FROM players
                 WHERE id NOT IN (SELECT player_id FROM team_members)
                 ORDER BY id"
            ),
            None,
        )
        .await
    }

    /// Members of a team.
    pub async fn team_members(&self, team_id: i64) -> Result<Vec<Player>, StoreError> {
        self.query_players(
            "SELECT p.id, p.tg_user_id, p.username, p.full_name
             FROM players p
             JOIN team_members m ON m.player_id = p.id
             WHERE m.team_id = ?
             ORDER BY p.id"
                .to_string(),
            Some(team_id),
        )
        .await
    }

    async fn query_players(&self, sql: String, param: Option<i64>) -> Result<Vec<Player>, StoreError> {
        let players = self
            .client
            .conn(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = match param {
                    Some(param) => stmt.query_map([param], player_from_row)?,
                    None => stmt.query_map([], player_from_row)?,
                };
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await?;
        Ok(players)
    }
}
