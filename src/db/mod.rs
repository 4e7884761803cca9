//! ProcessedStore (C6): the durable "have we already handled this file"
//! record. Two interchangeable backends share one trait — a relational
//! MySQL table or an append-only delimited log — selected by `db.type`.
//!
//! `is_processed` is authoritative: backend unavailability must fail the
//! call rather than silently return `false`, or the dispatcher would
//! reprocess a file it already wrote (§4.2).

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::{Config, DbConfig, MysqlConfig};
use crate::model::ProcessedRecord;

/// Sentinel written to `recording_id` for a loose file that was quarantined
/// without ever being identified (§4.13).
pub const RECORDING_ID_UNKNOWN: &str = "UNKNOWN";
/// Sentinel written to `recording_id` when a write succeeded at
/// identification but failed to land in its output location (§4.11 step 2).
pub const RECORDING_ID_WRITE_FAILED: &str = "WRITE_FAILED";

#[derive(Debug, thiserror::Error)]
pub enum ProcessedStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no processed-file log path configured for the file backend")]
    NoLogPath,
}

#[async_trait]
pub trait ProcessedStore: Send + Sync {
    async fn is_processed(&self, absolute_path: &str) -> Result<bool, ProcessedStoreError>;
    async fn mark_processed(&self, record: ProcessedRecord) -> Result<(), ProcessedStoreError>;
}

/// Build the configured backend from `config.db` / `config.logging`.
pub async fn build_store(config: &Config) -> Result<Arc<dyn ProcessedStore>, ProcessedStoreError> {
    match &config.db {
        DbConfig::Mysql { mysql } => Ok(Arc::new(SqlxProcessedStore::connect(mysql).await?)),
        DbConfig::File { path } => {
            let path = path
                .clone()
                .or_else(|| config.logging.processed_file_log_path.clone())
                .ok_or(ProcessedStoreError::NoLogPath)?;
            Ok(Arc::new(FileProcessedStore::new(path)))
        }
    }
}

/// MD5 of `first 1 MiB || last 1 MiB || size || filename`, per §4.2's
/// definition of the `ProcessedRecord.fileHash` column.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    use std::io::{Read, Seek, SeekFrom};

    const CHUNK: usize = 1024 * 1024;

    let mut file = std::fs::File::open(path)?;
    let size = file.metadata()?.len();

    let mut context = md5::Context::new();

    let mut head = vec![0u8; CHUNK.min(size as usize)];
    file.read_exact(&mut head)?;
    context.consume(&head);

    if size > CHUNK as u64 {
        let tail_len = CHUNK.min(size as usize);
        file.seek(SeekFrom::End(-(tail_len as i64)))?;
        let mut tail = vec![0u8; tail_len];
        file.read_exact(&mut tail)?;
        context.consume(&tail);
    }

    context.consume(size.to_le_bytes());
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        context.consume(name.as_bytes());
    }

    Ok(format!("{:x}", context.compute()))
}

/// MySQL-backed `ProcessedStore`.
pub struct SqlxProcessedStore {
    pool: MySqlPool,
}

impl SqlxProcessedStore {
    pub async fn connect(config: &MysqlConfig) -> Result<Self, ProcessedStoreError> {
        let url = format!(
            "mysql://{}:{}@{}:{}/{}",
            config.username, config.password, config.host, config.port, config.database
        );
        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool.max_pool_size)
            .min_connections(config.pool.min_idle)
            .acquire_timeout(std::time::Duration::from_secs(config.pool.connection_timeout_secs))
            .connect(&url)
            .await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProcessedStore for SqlxProcessedStore {
    async fn is_processed(&self, absolute_path: &str) -> Result<bool, ProcessedStoreError> {
        let row = sqlx::query("SELECT 1 FROM processed_files WHERE absolute_path = ?")
            .bind(absolute_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn mark_processed(&self, record: ProcessedRecord) -> Result<(), ProcessedStoreError> {
        sqlx::query(
            r#"
            INSERT INTO processed_files
                (absolute_path, file_hash, file_name, file_size, processed_time, recording_id, artist, title, album)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                file_hash = VALUES(file_hash),
                file_name = VALUES(file_name),
                file_size = VALUES(file_size),
                processed_time = VALUES(processed_time),
                recording_id = VALUES(recording_id),
                artist = VALUES(artist),
                title = VALUES(title),
                album = VALUES(album)
            "#,
        )
        .bind(&record.absolute_path)
        .bind(&record.file_hash)
        .bind(&record.file_name)
        .bind(record.file_size)
        .bind(&record.processed_time)
        .bind(&record.recording_id)
        .bind(&record.artist)
        .bind(&record.title)
        .bind(&record.album)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Append-only delimited-log `ProcessedStore`. Lines are
/// `absolutePath|fileHash|fileName|fileSize|processedTime|recordingId|artist|title|album`,
/// `|`-delimited with empty fields for absent `Option`s. All appends are
/// serialized behind `write_lock` so two concurrent writers can never
/// interleave partial lines.
pub struct FileProcessedStore {
    path: std::path::PathBuf,
    write_lock: AsyncMutex<()>,
}

impl FileProcessedStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into(), write_lock: AsyncMutex::new(()) }
    }

    fn encode(record: &ProcessedRecord) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            record.absolute_path,
            record.file_hash,
            record.file_name,
            record.file_size,
            record.processed_time,
            record.recording_id.as_deref().unwrap_or(""),
            record.artist.as_deref().unwrap_or(""),
            record.title.as_deref().unwrap_or(""),
            record.album.as_deref().unwrap_or(""),
        )
    }
}

#[async_trait]
impl ProcessedStore for FileProcessedStore {
    async fn is_processed(&self, absolute_path: &str) -> Result<bool, ProcessedStoreError> {
        let path = self.path.clone();
        let needle = format!("{absolute_path}|");
        let found = tokio::task::spawn_blocking(move || -> std::io::Result<bool> {
            if !path.exists() {
                return Ok(false);
            }
            let contents = std::fs::read_to_string(&path)?;
            Ok(contents.lines().any(|line| line.starts_with(&needle)))
        })
        .await
        .expect("blocking task panicked")?;
        Ok(found)
    }

    async fn mark_processed(&self, record: ProcessedRecord) -> Result<(), ProcessedStoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let line = Self::encode(&record);
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            use std::io::Write;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            writeln!(file, "{line}")?;
            Ok(())
        })
        .await
        .expect("blocking task panicked")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(path: &str) -> ProcessedRecord {
        ProcessedRecord {
            absolute_path: path.to_string(),
            file_hash: "abc123".to_string(),
            file_name: "track.mp3".to_string(),
            file_size: 1024,
            processed_time: "2026-01-01T00:00:00Z".to_string(),
            recording_id: Some("rec-1".to_string()),
            artist: Some("Artist".to_string()),
            title: Some("Title".to_string()),
            album: Some("Album".to_string()),
        }
    }

    #[tokio::test]
    async fn file_store_marks_and_reports_processed() {
        let dir = tempdir().unwrap();
        let store = FileProcessedStore::new(dir.path().join("processed.log"));

        assert!(!store.is_processed("/music/track.mp3").await.unwrap());
        store.mark_processed(record("/music/track.mp3")).await.unwrap();
        assert!(store.is_processed("/music/track.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn file_store_is_processed_false_when_log_absent() {
        let dir = tempdir().unwrap();
        let store = FileProcessedStore::new(dir.path().join("missing.log"));
        assert!(!store.is_processed("/music/track.mp3").await.unwrap());
    }

    #[tokio::test]
    async fn file_store_does_not_prefix_match_unrelated_paths() {
        let dir = tempdir().unwrap();
        let store = FileProcessedStore::new(dir.path().join("processed.log"));
        store.mark_processed(record("/music/track.mp3")).await.unwrap();
        assert!(!store.is_processed("/music/track.mp3.bak").await.unwrap());
    }

    #[test]
    fn hash_file_is_stable_for_small_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"some short audio content").unwrap();
        let a = hash_file(&path).unwrap();
        let b = hash_file(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn hash_file_differs_for_different_filenames_same_bytes() {
        let dir = tempdir().unwrap();
        let a_path = dir.path().join("a.mp3");
        let b_path = dir.path().join("b.mp3");
        std::fs::write(&a_path, b"identical bytes").unwrap();
        std::fs::write(&b_path, b"identical bytes").unwrap();
        assert_ne!(hash_file(&a_path).unwrap(), hash_file(&b_path).unwrap());
    }
}
