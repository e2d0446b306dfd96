//! Relational primary store backed by SQLite.
//!
//! # Responsibility
//! - Persist and query echoes in the migrated `echoes` table.
//! - Keep SQL details inside the store boundary.
//!
//! # Invariants
//! - Write paths call `Echo::validate()` before SQL mutations.
//! - Read paths reject rows with unparseable ids instead of masking them.
//! - A non-integer `unlock_at` reads back as `None` so one bad row never hides
//!   the rest of a user's echoes.

use crate::model::echo::{Echo, EchoId, EchoValidationError};
use crate::store::{EchoRepository, StoreError, StoreResult};
use log::warn;
use rusqlite::{params, Connection, ErrorCode, Row};
use uuid::Uuid;

const ECHO_SELECT_SQL: &str = "SELECT
    id,
    user_id,
    audio_ref,
    created_at,
    unlock_at,
    mood_tag
FROM echoes";

/// SQLite-backed echo repository.
pub struct SqliteEchoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEchoRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    ///
    /// # Errors
    /// - `StoreError::Connectivity` when the `echoes` table is missing, which
    ///   means the connection skipped migrations.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        let ready: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'echoes'
            );",
            [],
            |row| row.get(0),
        )?;
        if ready != 1 {
            return Err(StoreError::Connectivity(
                "echoes table missing; open the database through db::open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl EchoRepository for SqliteEchoRepository<'_> {
    fn create_echo(&self, echo: &Echo) -> StoreResult<EchoId> {
        echo.validate()?;
        let unlock_at = echo
            .unlock_at
            .ok_or(EchoValidationError::MissingUnlockAt)?;

        let result = self.conn.execute(
            "INSERT INTO echoes (
                id,
                user_id,
                audio_ref,
                created_at,
                unlock_at,
                mood_tag
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                echo.id.to_string(),
                echo.user_id.as_str(),
                echo.audio_ref.as_str(),
                echo.created_at,
                unlock_at,
                echo.mood_tag.as_deref(),
            ],
        );

        match result {
            Ok(_) => Ok(echo.id),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateId(echo.id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn get_echo(&self, id: EchoId) -> StoreResult<Option<Echo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ECHO_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_echo_row(row)?));
        }
        Ok(None)
    }

    fn list_echoes(&self, user_id: &str) -> StoreResult<Vec<Echo>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ECHO_SELECT_SQL}
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC;"
        ))?;
        let mut rows = stmt.query([user_id])?;
        let mut echoes = Vec::new();
        while let Some(row) = rows.next()? {
            echoes.push(parse_echo_row(row)?);
        }
        Ok(echoes)
    }
}

fn parse_echo_row(row: &Row<'_>) -> StoreResult<Echo> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::Serialization(format!("invalid uuid value `{id_text}` in echoes.id"))
    })?;

    // Column affinity keeps TEXT values written by older clients.
    let unlock_at = row.get_ref("unlock_at")?.as_i64().ok();
    if unlock_at.is_none() {
        warn!(
            "event=sqlite_read module=store status=degraded echo_id={} reason=malformed_unlock_at",
            id
        );
    }

    Ok(Echo {
        id,
        user_id: row.get("user_id")?,
        audio_ref: row.get("audio_ref")?,
        created_at: row.get("created_at")?,
        unlock_at,
        mood_tag: row.get("mood_tag")?,
    })
}
