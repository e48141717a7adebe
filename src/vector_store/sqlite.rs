//! SQLite storage for the per-project vector index.
//!
//! Cosine similarity is computed in Rust over a full scan; project indexes
//! are small enough that this beats carrying a vector-search extension.
//!
//! Rebuilds never touch the live file: [`IndexBuilder`] writes a fresh
//! database next to it and renames it into place on commit, so a failed
//! rebuild leaves the previous index intact.

use super::{cosine_similarity, ChunkRecord, SearchResult};
use crate::error::{PrateError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    content TEXT NOT NULL,
    chunk_order INTEGER NOT NULL,
    embedding BLOB NOT NULL,
    indexed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
"#;

/// Read handle to a persisted project index.
#[derive(Debug)]
pub struct SqliteIndex {
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open an existing index file.
    ///
    /// A missing file is its own error kind so callers can tell "not
    /// indexed yet" apart from a corrupt database.
    #[instrument]
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PrateError::IndexNotFound(path.display().to_string()));
        }

        let conn = Connection::open(path)?;
        debug!("Opened index at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An empty in-memory index, for tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert records directly; used by tests and the in-memory path.
    pub fn insert(&self, records: &[ChunkRecord]) -> Result<usize> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        for record in records {
            insert_record(&tx, record)?;
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Nearest chunks to the query embedding, best first, filtered by a
    /// minimum similarity score.
    #[instrument(skip(self, query_embedding))]
    pub fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            "SELECT id, source, content, chunk_order, embedding, indexed_at FROM chunks",
        )?;
        let records = stmt.query_map([], row_to_record)?;

        let mut results: Vec<SearchResult> = records
            .filter_map(|r| r.ok())
            .map(|chunk| {
                let score = cosine_similarity(query_embedding, &chunk.embedding);
                SearchResult { chunk, score }
            })
            .filter(|r| r.score >= min_score)
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);

        debug!("Found {} matching chunks", results.len());
        Ok(results)
    }

    /// Total number of indexed chunks.
    pub fn chunk_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Distinct transcript sources in the index.
    pub fn sources(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT DISTINCT source FROM chunks ORDER BY source")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PrateError::VectorIndex(format!("Failed to acquire lock: {}", e)))
    }
}

/// Writes a replacement index and swaps it into place atomically.
///
/// Records go into `<index>.tmp`; [`commit`] closes the database and
/// renames it over the live file. Dropping an uncommitted builder removes
/// the temporary file and leaves the previous index untouched.
///
/// [`commit`]: IndexBuilder::commit
pub struct IndexBuilder {
    conn: Option<Connection>,
    temp_path: PathBuf,
    final_path: PathBuf,
    committed: bool,
}

impl IndexBuilder {
    /// Start building a replacement for the index at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("db.tmp");
        if temp_path.exists() {
            std::fs::remove_file(&temp_path)?;
        }

        let conn = Connection::open(&temp_path)?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Some(conn),
            temp_path,
            final_path: path.to_path_buf(),
            committed: false,
        })
    }

    /// Insert a batch of records in one transaction.
    pub fn insert_batch(&mut self, records: &[ChunkRecord]) -> Result<usize> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| PrateError::VectorIndex("Builder already committed".to_string()))?;

        let tx = conn.unchecked_transaction()?;
        for record in records {
            insert_record(&tx, record)?;
        }
        tx.commit()?;
        debug!("Staged {} chunks", records.len());
        Ok(records.len())
    }

    /// Close the staged database and atomically replace the live index.
    pub fn commit(mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .map_err(|(_, e)| PrateError::Database(e))?;
        }
        std::fs::rename(&self.temp_path, &self.final_path)?;
        self.committed = true;
        info!("Replaced index at {}", self.final_path.display());
        Ok(())
    }
}

impl Drop for IndexBuilder {
    fn drop(&mut self) {
        if !self.committed {
            drop(self.conn.take());
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

fn insert_record(conn: &Connection, record: &ChunkRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT OR REPLACE INTO chunks (id, source, content, chunk_order, embedding, indexed_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            record.id.to_string(),
            record.source,
            record.content,
            record.chunk_order,
            embedding_to_bytes(&record.embedding),
            record.indexed_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkRecord> {
    let id_str: String = row.get(0)?;
    let embedding_bytes: Vec<u8> = row.get(4)?;
    let indexed_at_str: String = row.get(5)?;

    Ok(ChunkRecord {
        id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
        source: row.get(1)?,
        content: row.get(2)?,
        chunk_order: row.get(3)?,
        embedding: bytes_to_embedding(&embedding_bytes),
        indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

/// Serialize embedding to bytes.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from bytes.
fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
            f32::from_le_bytes(arr)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(source: &str, content: &str, order: i64, embedding: Vec<f32>) -> ChunkRecord {
        ChunkRecord::new(source.to_string(), content.to_string(), order, embedding)
    }

    #[test]
    fn test_embedding_bytes_round_trip() {
        let embedding = vec![0.25f32, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes_to_embedding(&bytes), embedding);
    }

    #[test]
    fn test_in_memory_search() {
        let index = SqliteIndex::in_memory().unwrap();
        index
            .insert(&[
                record("talk", "about cats", 0, vec![1.0, 0.0, 0.0]),
                record("talk", "about dogs", 1, vec![0.0, 1.0, 0.0]),
            ])
            .unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 10, 0.0).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.content, "about cats");
        assert!((results[0].score - 1.0).abs() < 0.001);

        // threshold filters the orthogonal chunk
        let filtered = index.search(&[1.0, 0.0, 0.0], 10, 0.5).unwrap();
        assert_eq!(filtered.len(), 1);
    }

    #[test]
    fn test_open_missing_is_index_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteIndex::open(&dir.path().join("index.db")).unwrap_err();
        assert!(matches!(err, PrateError::IndexNotFound(_)));
    }

    #[test]
    fn test_builder_commit_replaces_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let mut builder = IndexBuilder::create(&path).unwrap();
        builder
            .insert_batch(&[record("a", "first version", 0, vec![1.0])])
            .unwrap();
        builder.commit().unwrap();

        let index = SqliteIndex::open(&path).unwrap();
        assert_eq!(index.chunk_count().unwrap(), 1);
        drop(index);

        // rebuild with different content replaces wholesale
        let mut builder = IndexBuilder::create(&path).unwrap();
        builder
            .insert_batch(&[
                record("a", "second version", 0, vec![1.0]),
                record("b", "more", 1, vec![0.5]),
            ])
            .unwrap();
        builder.commit().unwrap();

        let index = SqliteIndex::open(&path).unwrap();
        assert_eq!(index.chunk_count().unwrap(), 2);
        assert_eq!(index.sources().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_abandoned_builder_leaves_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");

        let mut builder = IndexBuilder::create(&path).unwrap();
        builder
            .insert_batch(&[record("a", "good", 0, vec![1.0])])
            .unwrap();
        builder.commit().unwrap();

        // a failed rebuild: records staged but never committed
        let mut builder = IndexBuilder::create(&path).unwrap();
        builder
            .insert_batch(&[record("a", "partial", 0, vec![0.0])])
            .unwrap();
        drop(builder);

        let index = SqliteIndex::open(&path).unwrap();
        assert_eq!(index.chunk_count().unwrap(), 1);
        let results = index.search(&[1.0], 1, 0.0).unwrap();
        assert_eq!(results[0].chunk.content, "good");
        assert!(!path.with_extension("db.tmp").exists());
    }
}
