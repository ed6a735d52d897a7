//! JSON snapshot file for scope records

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::Mutex};
use tracing::{debug, info, warn};

use crate::{
    error::{AppError, AppResult},
    timer::Scope,
};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopeFileContents {
    version: u32,
    scopes: Vec<Scope>,
}

/// Whole-table snapshot written after every mutation
#[derive(Debug)]
pub struct ScopeFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ScopeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records. A missing file is an empty table.
    pub async fn load(&self) -> AppResult<Vec<Scope>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No data file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let contents: ScopeFileContents = serde_json::from_slice(&raw)
            .map_err(|e| AppError::Persistence(format!("Failed to parse {}: {}", self.path.display(), e)))?;

        if contents.version != FORMAT_VERSION {
            warn!(
                "Data file version {} differs from expected {}",
                contents.version, FORMAT_VERSION
            );
        }

        for scope in &contents.scopes {
            if scope.is_timer_running && scope.timer_last_updated.is_none() {
                warn!("Scope {} is running without a last-updated stamp; reset it to recover", scope.id);
            }
        }

        info!("Loaded {} scopes from {}", contents.scopes.len(), self.path.display());
        Ok(contents.scopes)
    }

    /// Replace the file with `scopes`, via a temp file and rename
    pub async fn save(&self, scopes: &[Scope]) -> AppResult<()> {
        self.save_with(|| Ok(scopes.to_vec())).await
    }

    /// Take the write lock, then read the records to write from `snapshot`.
    ///
    /// Reading under the lock keeps file order equal to snapshot order, so a
    /// slower writer can never replace a newer table with an older one.
    pub async fn save_with<F>(&self, snapshot: F) -> AppResult<()>
    where
        F: FnOnce() -> AppResult<Vec<Scope>>,
    {
        let _guard = self.write_lock.lock().await;

        let contents = ScopeFileContents {
            version: FORMAT_VERSION,
            scopes: snapshot()?,
        };
        let json = serde_json::to_vec_pretty(&contents)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize scopes: {}", e)))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to replace {}: {}", self.path.display(), e)))?;

        debug!("Saved {} scopes to {}", contents.scopes.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = ScopeFile::new(dir.path().join("scopes.json"));
        assert!(file.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_timer_fields_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let file = ScopeFile::new(dir.path().join("scopes.json"));

        let now = Utc.with_ymd_and_hms(2026, 10, 12, 4, 0, 0).unwrap();
        let mut scope = Scope::new(3, "Mini Project 2026", 2.0, now).unwrap();
        scope.start(now).unwrap();

        file.save(&[scope.clone()]).await.unwrap();
        let loaded = file.load().await.unwrap();

        assert_eq!(loaded, vec![scope]);
        assert!(!dir.path().join("scopes.tmp").exists());
    }

    #[tokio::test]
    async fn garbage_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scopes.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let err = ScopeFile::new(path).load().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
    }
}
