//! SQLite-backed entity directory.
//!
//! One row per `(user_id, entity_key)` in `canonical_entities`. Aliases and
//! properties are stored as JSON text; timestamps as fixed-width RFC 3339
//! so they order lexically.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::EntityDirectory;
use graphmind_core::types::CanonicalEntity;

pub const CREATE_CANONICAL_ENTITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS canonical_entities (
    user_id TEXT NOT NULL,
    entity_key TEXT NOT NULL,
    canonical_name TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    aliases TEXT NOT NULL DEFAULT '[]',
    properties TEXT NOT NULL DEFAULT '{}',
    mention_count INTEGER NOT NULL DEFAULT 0,
    first_mentioned_id TEXT,
    last_mentioned_id TEXT,
    confidence REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, entity_key)
)
"#;

pub const CREATE_TYPE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_canonical_entities_type ON canonical_entities(user_id, entity_type)
"#;

pub const CREATE_RECENCY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_canonical_entities_updated ON canonical_entities(user_id, updated_at)
"#;

const COLUMNS: &str = "user_id, entity_key, canonical_name, entity_type, aliases, properties, \
    mention_count, first_mentioned_id, last_mentioned_id, confidence, created_at, updated_at";

fn sql_error(e: rusqlite::Error) -> GraphMindError {
    GraphMindError::directory(e.to_string())
}

/// Create the table and indexes. Idempotent.
pub fn init_schema(conn: &Connection) -> GraphMindResult<()> {
    conn.execute(CREATE_CANONICAL_ENTITIES_TABLE, []).map_err(sql_error)?;
    conn.execute(CREATE_TYPE_INDEX, []).map_err(sql_error)?;
    conn.execute(CREATE_RECENCY_INDEX, []).map_err(sql_error)?;
    Ok(())
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> GraphMindResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GraphMindError::directory(format!("Bad timestamp {:?}: {}", s, e)))
}

/// Escape `%`, `_` and `\` for a `LIKE ... ESCAPE '\'` pattern.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Row as stored, before JSON and timestamp decoding.
struct StoredEntity {
    user_id: String,
    entity_key: String,
    canonical_name: String,
    entity_type: String,
    aliases: String,
    properties: String,
    mention_count: i64,
    first_mentioned_id: Option<String>,
    last_mentioned_id: Option<String>,
    confidence: f64,
    created_at: String,
    updated_at: String,
}

impl StoredEntity {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            entity_key: row.get(1)?,
            canonical_name: row.get(2)?,
            entity_type: row.get(3)?,
            aliases: row.get(4)?,
            properties: row.get(5)?,
            mention_count: row.get(6)?,
            first_mentioned_id: row.get(7)?,
            last_mentioned_id: row.get(8)?,
            confidence: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_entity(self) -> GraphMindResult<CanonicalEntity> {
        let mut entity = CanonicalEntity {
            user_id: self.user_id,
            entity_key: self.entity_key,
            canonical_name: self.canonical_name,
            entity_type: self.entity_type,
            aliases: serde_json::from_str(&self.aliases)?,
            properties: serde_json::from_str(&self.properties)?,
            mention_count: self.mention_count.max(0) as u64,
            first_mentioned_id: self.first_mentioned_id,
            last_mentioned_id: self.last_mentioned_id,
            confidence: self.confidence as f32,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        };
        entity.ensure_canonical_alias();
        Ok(entity)
    }
}

/// Entity directory stored in SQLite.
pub struct SqliteDirectory {
    conn: Mutex<Connection>,
}

impl SqliteDirectory {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> GraphMindResult<Self> {
        let conn = Connection::open(path).map_err(sql_error)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> GraphMindResult<Self> {
        let conn = Connection::open_in_memory().map_err(sql_error)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_entities<P: rusqlite::Params>(&self, sql: &str, params: P) -> GraphMindResult<Vec<CanonicalEntity>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphMindError::internal(e.to_string()))?;
        let mut stmt = conn.prepare(sql).map_err(sql_error)?;
        let stored = stmt
            .query_map(params, StoredEntity::from_row)
            .map_err(sql_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(sql_error)?;
        stored.into_iter().map(StoredEntity::into_entity).collect()
    }
}

#[async_trait]
impl EntityDirectory for SqliteDirectory {
    async fn search(
        &self,
        user_id: &str,
        name_like: &str,
        limit: usize,
    ) -> GraphMindResult<Vec<CanonicalEntity>> {
        let needle = name_like.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        // LIKE over the alias JSON narrows the scan; the exact containment
        // check runs below on decoded names.
        let sql = format!(
            "SELECT {} FROM canonical_entities \
             WHERE user_id = ?1 AND (canonical_name LIKE ?2 ESCAPE '\\' OR aliases LIKE ?2 ESCAPE '\\') \
             ORDER BY updated_at DESC, entity_key",
            COLUMNS
        );
        let candidates = self.query_entities(&sql, params![user_id, like_pattern(&needle)])?;

        Ok(candidates
            .into_iter()
            .filter(|e| {
                e.canonical_name.to_lowercase().contains(&needle)
                    || e.aliases.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .take(limit)
            .collect())
    }

    async fn list(
        &self,
        user_id: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> GraphMindResult<Vec<CanonicalEntity>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        match entity_type {
            Some(entity_type) => self.query_entities(
                &format!(
                    "SELECT {} FROM canonical_entities WHERE user_id = ?1 AND entity_type = ?2 \
                     ORDER BY updated_at DESC, entity_key LIMIT ?3",
                    COLUMNS
                ),
                params![user_id, entity_type, limit],
            ),
            None => self.query_entities(
                &format!(
                    "SELECT {} FROM canonical_entities WHERE user_id = ?1 \
                     ORDER BY updated_at DESC, entity_key LIMIT ?2",
                    COLUMNS
                ),
                params![user_id, limit],
            ),
        }
    }

    async fn get(&self, user_id: &str, entity_key: &str) -> GraphMindResult<Option<CanonicalEntity>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphMindError::internal(e.to_string()))?;
        let stored = conn
            .query_row(
                &format!(
                    "SELECT {} FROM canonical_entities WHERE user_id = ?1 AND entity_key = ?2",
                    COLUMNS
                ),
                params![user_id, entity_key],
                StoredEntity::from_row,
            )
            .optional()
            .map_err(sql_error)?;
        stored.map(StoredEntity::into_entity).transpose()
    }

    async fn upsert(&self, entity: &CanonicalEntity) -> GraphMindResult<()> {
        let aliases = serde_json::to_string(&entity.aliases)?;
        let properties = serde_json::to_string(&entity.properties)?;
        let mention_count = i64::try_from(entity.mention_count).unwrap_or(i64::MAX);

        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphMindError::internal(e.to_string()))?;
        conn.execute(
            &format!(
                "INSERT INTO canonical_entities ({}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
                 ON CONFLICT(user_id, entity_key) DO UPDATE SET \
                 canonical_name = excluded.canonical_name, entity_type = excluded.entity_type, \
                 aliases = excluded.aliases, properties = excluded.properties, \
                 mention_count = excluded.mention_count, \
                 first_mentioned_id = excluded.first_mentioned_id, \
                 last_mentioned_id = excluded.last_mentioned_id, \
                 confidence = excluded.confidence, created_at = excluded.created_at, \
                 updated_at = excluded.updated_at",
                COLUMNS
            ),
            params![
                entity.user_id,
                entity.entity_key,
                entity.canonical_name,
                entity.entity_type,
                aliases,
                properties,
                mention_count,
                entity.first_mentioned_id,
                entity.last_mentioned_id,
                f64::from(entity.confidence),
                timestamp(&entity.created_at),
                timestamp(&entity.updated_at),
            ],
        )
        .map_err(sql_error)?;

        debug!(entity_type = %entity.entity_type, "Upserted canonical entity");
        Ok(())
    }

    async fn delete(&self, user_id: &str, entity_key: &str) -> GraphMindResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| GraphMindError::internal(e.to_string()))?;
        let removed = conn
            .execute(
                "DELETE FROM canonical_entities WHERE user_id = ?1 AND entity_key = ?2",
                params![user_id, entity_key],
            )
            .map_err(sql_error)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("sarah"), "%sarah%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }
}
