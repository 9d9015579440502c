// Optional SQLite persistence for the Q-table and artifact history.
// The core functions identically without it, just without cross-restart
// memory.

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::error::{ReelsmithError, ReelsmithResult};
use crate::learning::action::TagAction;
use crate::learning::state::StateKey;
use crate::refine::artifact::ArtifactDescription;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS q_values (
    authenticity_bucket INTEGER NOT NULL,
    tag_count_bucket INTEGER NOT NULL,
    action TEXT NOT NULL,
    value REAL NOT NULL,
    PRIMARY KEY (authenticity_bucket, tag_count_bucket, action)
);
CREATE TABLE IF NOT EXISTS artifact_versions (
    content_id TEXT NOT NULL,
    version INTEGER NOT NULL,
    payload TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (content_id, version)
);
";

/// SQLite-backed durability for learned values and artifact versions.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> ReelsmithResult<Self> {
        let path = PathBuf::from(path.as_ref());
        debug!("Opening store at {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ReelsmithError::io_error(e, Some(parent)))?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store, useful for tests.
    pub fn open_in_memory() -> ReelsmithResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert a batch of Q-table cells in one transaction.
    pub fn save_q_values(&self, cells: &[(StateKey, TagAction, f64)]) -> ReelsmithResult<()> {
        let mut conn = self.connection.lock().unwrap();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO q_values (authenticity_bucket, tag_count_bucket, action, value) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (authenticity_bucket, tag_count_bucket, action) \
                 DO UPDATE SET value = excluded.value",
            )?;
            for (state, action, value) in cells {
                stmt.execute(params![
                    state.authenticity_bucket,
                    state.tag_count_bucket,
                    action.as_str(),
                    value,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load every persisted Q-table cell.
    pub fn load_q_values(&self) -> ReelsmithResult<Vec<(StateKey, TagAction, f64)>> {
        let conn = self.connection.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT authenticity_bucket, tag_count_bucket, action, value FROM q_values",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u8>(0)?,
                row.get::<_, u8>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut cells = Vec::new();
        for row in rows {
            let (authenticity_bucket, tag_count_bucket, action, value) = row?;
            let action = action.parse::<TagAction>()?;
            cells.push((
                StateKey {
                    authenticity_bucket,
                    tag_count_bucket,
                },
                action,
                value,
            ));
        }
        Ok(cells)
    }

    /// Persist one artifact version. Versions are immutable once written.
    pub fn save_artifact(&self, artifact: &ArtifactDescription) -> ReelsmithResult<()> {
        let payload = serde_json::to_string(artifact)?;
        let conn = self.connection.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO artifact_versions (content_id, version, payload, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                artifact.content_id.to_string(),
                artifact.version,
                payload,
                artifact.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load every persisted artifact version, ordered so each content's
    /// history comes back in version order.
    pub fn load_artifacts(&self) -> ReelsmithResult<Vec<ArtifactDescription>> {
        let conn = self.connection.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT payload FROM artifact_versions ORDER BY content_id, version",
        )?;

        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut artifacts = Vec::new();
        for payload in rows {
            artifacts.push(serde_json::from_str(&payload?)?);
        }
        Ok(artifacts)
    }
}
