//! Startup recursive scan (§4.1): enumerate existing files under the monitor
//! root, group by immediate parent folder, and hand the groups to the
//! dispatcher folder-by-folder so every file of one folder is queued before
//! the next folder starts.

pub mod watcher;

use std::collections::BTreeMap;
use std::path::PathBuf;

use walkdir::WalkDir;

use crate::db::ProcessedStore;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a"];

fn is_audio_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Walk `root`, grouping every audio file by its parent directory. Folders
/// are returned in path order so processing one folder's files together
/// stays deterministic across runs.
fn group_by_folder(root: &std::path::Path) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() || !is_audio_file(entry.path()) {
            continue;
        }
        let folder = entry.path().parent().unwrap_or(root).to_path_buf();
        groups.entry(folder).or_default().push(entry.path().to_path_buf());
    }
    for files in groups.values_mut() {
        files.sort();
    }
    groups
}

/// Enumerate `root`'s existing backlog, skip anything the store already
/// knows about, and return the remaining files ordered folder-by-folder.
pub async fn backlog(root: &std::path::Path, store: &dyn ProcessedStore) -> Vec<PathBuf> {
    let root_owned = root.to_path_buf();
    let groups = tokio::task::spawn_blocking(move || group_by_folder(&root_owned)).await.unwrap_or_default();

    let mut queue = Vec::new();
    for (_folder, files) in groups {
        for file in files {
            match store.is_processed(&file.to_string_lossy()).await {
                Ok(true) => continue,
                _ => queue.push(file),
            }
        }
    }
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FileProcessedStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn backlog_skips_already_processed_and_groups_by_folder() {
        let temp = TempDir::new().unwrap();
        let album_a = temp.path().join("Album A");
        let album_b = temp.path().join("Album B");
        std::fs::create_dir_all(&album_a).unwrap();
        std::fs::create_dir_all(&album_b).unwrap();
        std::fs::write(album_a.join("01.mp3"), b"a1").unwrap();
        std::fs::write(album_a.join("02.mp3"), b"a2").unwrap();
        std::fs::write(album_b.join("01.mp3"), b"b1").unwrap();
        std::fs::write(temp.path().join("notes.txt"), b"ignored").unwrap();

        let store = FileProcessedStore::new(temp.path().join("processed.log"));
        store
            .mark_processed(crate::model::ProcessedRecord {
                absolute_path: album_a.join("01.mp3").to_string_lossy().into_owned(),
                file_hash: "x".to_string(),
                file_name: "01.mp3".to_string(),
                file_size: 2,
                processed_time: "2026-01-01T00:00:00Z".to_string(),
                recording_id: Some("rec".to_string()),
                artist: None,
                title: None,
                album: None,
            })
            .await
            .unwrap();

        let queue = backlog(temp.path(), &store).await;
        assert_eq!(queue.len(), 2);
        assert!(queue.iter().any(|p| p == &album_a.join("02.mp3")));
        assert!(queue.iter().any(|p| p == &album_b.join("01.mp3")));
        assert!(!queue.iter().any(|p| p == &album_a.join("01.mp3")));
    }
}
