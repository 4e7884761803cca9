//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\music-curator\config.toml
//! - macOS: ~/Library/Application Support/music-curator/config.toml
//! - Linux: ~/.config/music-curator/config.toml
//!
//! The config file is human-readable and editable. It is loaded once at
//! startup; there is no interactive settings surface (this is a daemon,
//! not an app with a preferences screen), so `save`/`save_async` exist for
//! the `scan`/`check-tools` CLI paths that may want to persist a
//! newly-discovered `acoustid.apiKey` back to disk, not for live editing.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration. Mirrors the dotted option groups from the
/// system's configuration surface one-to-one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub acoustid: AcoustIdConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub file: FileConfig,
    pub logging: LoggingConfig,
    pub cache: CacheConfig,
    pub db: DbConfig,
    pub proxy: ProxyConfig,
    pub audio: AudioNormalizeSection,
    /// `maxRetries` — maximum reprocessing attempts before a file is quarantined. Default 3.
    #[serde(rename = "maxRetries")]
    pub max_retries: u32,
}

fn default_max_retries() -> u32 {
    3
}

/// `monitor.*` — drop-zone directories and scan cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorConfig {
    /// `monitor.directory` — required. Root watched for new/changed audio files.
    pub directory: Option<PathBuf>,
    /// `monitor.outputDirectory` — required. Root of the curated `AlbumArtist/Album` tree.
    pub output_directory: Option<PathBuf>,
    /// `monitor.scanInterval` — advisory seconds between startup/backlog scans. Default 30.
    pub scan_interval_secs: u64,
    /// `monitor.tempSuffixes` — ordered list of download-in-progress suffixes to ignore.
    pub temp_suffixes: Vec<String>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            directory: None,
            output_directory: None,
            scan_interval_secs: 30,
            temp_suffixes: vec![
                ".part".to_string(),
                ".crdownload".to_string(),
                ".tmp".to_string(),
                ".download".to_string(),
            ],
        }
    }
}

/// `acoustid.*` — fingerprint lookup service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AcoustIdConfig {
    /// `acoustid.apiKey` — required.
    pub api_key: Option<String>,
    /// `acoustid.apiUrl`
    pub api_url: String,
}

impl Default for AcoustIdConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.acoustid.org/v2/lookup".to_string(),
        }
    }
}

/// `musicbrainz.*` — metadata and cover-art-manifest service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MusicBrainzConfig {
    /// `musicbrainz.apiUrl`
    pub api_url: String,
    /// `musicbrainz.coverArtApiUrl`
    pub cover_art_api_url: String,
    /// `musicbrainz.userAgent` — app/version and contact, required by MusicBrainz's usage policy.
    pub user_agent: String,
}

impl Default for MusicBrainzConfig {
    fn default() -> Self {
        Self {
            api_url: "https://musicbrainz.org/ws/2".to_string(),
            cover_art_api_url: "https://coverartarchive.org".to_string(),
            user_agent: format!(
                "music-curator/{} ( https://github.com/music-curator )",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

/// `file.*` — write-back and output-tree behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileConfig {
    /// `file.autoRename` — default true. Rename on write per the output-layout template.
    pub auto_rename: bool,
    /// `file.createBackup` — default false. Keep the original file alongside the rewritten one.
    pub create_backup: bool,
    /// `file.exportLyricsToFile` — default false. Also write a sidecar `.lrc`.
    pub export_lyrics_to_file: bool,
    /// `file.partialDirectory` — partial-recognition tree for files that only quick-scan resolved.
    pub partial_directory: Option<PathBuf>,
    /// `file.failedDirectory` — quarantine tree for permanently-failed files.
    pub failed_directory: Option<PathBuf>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            auto_rename: true,
            create_backup: false,
            export_lyrics_to_file: false,
            partial_directory: None,
            failed_directory: None,
        }
    }
}

/// `logging.*`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `logging.detailed` — raises the crate's own tracing directive to `debug`.
    pub detailed: bool,
    /// `logging.processedFileLogPath` — only meaningful when `db.type = "file"`.
    pub processed_file_log_path: Option<PathBuf>,
}

/// `cache.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// `cache.coverArtDirectory` — persistent per-release-group cover cache.
    pub cover_art_directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cover_art_directory: dirs::cache_dir().map(|d| d.join("music-curator").join("covers")),
        }
    }
}

/// `db.type` — the two interchangeable `ProcessedStore` backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DbConfig {
    Mysql { mysql: MysqlConfig },
    File { path: Option<PathBuf> },
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig::File { path: None }
    }
}

/// `db.mysql.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MysqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub pool: MysqlPoolConfig,
}

impl Default for MysqlConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "music_curator".to_string(),
            username: String::new(),
            password: String::new(),
            pool: MysqlPoolConfig::default(),
        }
    }
}

/// `db.mysql.pool.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MysqlPoolConfig {
    pub max_pool_size: u32,
    pub min_idle: u32,
    #[serde(rename = "connectionTimeout")]
    pub connection_timeout_secs: u64,
}

impl Default for MysqlPoolConfig {
    fn default() -> Self {
        Self {
            max_pool_size: 5,
            min_idle: 1,
            connection_timeout_secs: 30,
        }
    }
}

/// `proxy.*` — outbound HTTP proxy for the rate-limited clients (C1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

/// `audio.normalize.*`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioNormalizeSection {
    pub normalize: AudioNormalizeConfig,
}

impl Default for AudioNormalizeSection {
    fn default() -> Self {
        Self {
            normalize: AudioNormalizeConfig::default(),
        }
    }
}

/// `audio.normalize.*` — downsample to 48 kHz / 24-bit before tagging, via `ffmpeg`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioNormalizeConfig {
    pub enabled: bool,
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for AudioNormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ffmpeg_path: None,
        }
    }
}

impl Config {
    /// Validate the configuration, as called once at startup before the
    /// monitor loop, file watcher, or any network client is constructed.
    ///
    /// A missing `acoustid.apiKey` or either monitor directory is a fatal
    /// startup failure (§7: "Configuration/availability").
    pub fn validate(&self) -> Result<()> {
        if self.acoustid.api_key.as_deref().unwrap_or_default().is_empty() {
            return Err(Error::config("acoustid.apiKey is required"));
        }
        if self.monitor.directory.is_none() {
            return Err(Error::config("monitor.directory is required"));
        }
        if self.monitor.output_directory.is_none() {
            return Err(Error::config("monitor.outputDirectory is required"));
        }
        if let DbConfig::File { path } = &self.db
            && path.is_none()
            && self.logging.processed_file_log_path.is_none()
        {
            return Err(Error::config(
                "db.type = \"file\" requires a path (or logging.processedFileLogPath)",
            ));
        }
        Ok(())
    }

    /// `maxRetries`, kept as a plain field above but surfaced with the
    /// documented default for callers that construct a `Config` by hand
    /// (e.g. tests) without going through `Default`.
    pub fn max_retries_or_default(&self) -> u32 {
        if self.max_retries == 0 {
            default_max_retries()
        } else {
            self.max_retries
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-curator"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from disk.
///
/// Returns default config if the file doesn't exist or can't be parsed; the
/// defaults are not valid standalone (no API key, no monitor directory), so
/// callers must still call [`Config::validate`] before using them.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config");
                config
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to parse config file");
                tracing::warn!("using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read config file");
            Config::default()
        }
    }
}

/// Save configuration to disk.
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> std::result::Result<(), ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!(path = %path.display(), "saved config");
    Ok(())
}

/// Save configuration asynchronously, off the async runtime's worker threads.
pub async fn save_async(config: Config) -> std::result::Result<(), ConfigError> {
    tokio::task::spawn_blocking(move || save(&config))
        .await
        .map_err(|e| ConfigError::TaskJoin(e.to_string()))?
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration file I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),

    #[error("task join error: {0}")]
    TaskJoin(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[monitor]"));
        assert!(toml.contains("[acoustid]"));
        assert!(toml.contains("[musicbrainz]"));
        assert!(toml.contains("[file]"));
        assert!(toml.contains("[logging]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[proxy]"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.acoustid.api_key = Some("test-key-123".to_string());
        config.monitor.directory = Some(PathBuf::from("/music/incoming"));
        config.monitor.output_directory = Some(PathBuf::from("/music/library"));

        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed.acoustid.api_key, Some("test-key-123".to_string()));
        assert_eq!(
            parsed.monitor.directory,
            Some(PathBuf::from("/music/incoming"))
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[acoustid]
apiKey = "my-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.acoustid.api_key, Some("my-key".to_string()));
        assert_eq!(config.monitor.scan_interval_secs, 30);
        assert_eq!(config.max_retries_or_default(), 3);
        assert!(config.monitor.directory.is_none());
    }

    #[test]
    fn test_validate_requires_api_key_and_directories() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.acoustid.api_key = Some("key".to_string());
        config.monitor.directory = Some(PathBuf::from("/in"));
        config.monitor.output_directory = Some(PathBuf::from("/out"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_db_config_tagged_enum() {
        let toml = r#"
[db]
type = "mysql"

[db.mysql]
host = "db.example.com"
port = 3307
database = "minder"
username = "u"
password = "p"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        match config.db {
            DbConfig::Mysql { mysql } => {
                assert_eq!(mysql.host, "db.example.com");
                assert_eq!(mysql.port, 3307);
            }
            DbConfig::File { .. } => panic!("expected mysql variant"),
        }
    }
}
