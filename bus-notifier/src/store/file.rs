//! JSON-file subscription store.
//!
//! One `<user>_preferences.json` file per user. Writes go to a temporary
//! file that is then renamed over the record, so readers see either the old
//! or the new list and never a partial one.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::{Subscription, UserId};

use super::SubscriptionStore;
use super::error::StoreError;

const SUFFIX: &str = "_preferences.json";

/// File-per-user subscription store rooted at a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a user's record.
    pub fn path_for(&self, user: &UserId) -> PathBuf {
        self.dir.join(format!("{user}{SUFFIX}"))
    }
}

impl SubscriptionStore for JsonFileStore {
    async fn list_users(&self) -> Result<Vec<UserId>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir)(e)),
        };

        let mut users = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io(&self.dir))?
        {
            let file_name = entry.file_name();
            let Some(stem) = file_name.to_str().and_then(|n| n.strip_suffix(SUFFIX)) else {
                continue;
            };
            match UserId::parse(stem) {
                Ok(user) => users.push(user),
                Err(e) => warn!(file = ?file_name, error = %e, "Ignoring preferences file"),
            }
        }

        users.sort();
        Ok(users)
    }

    async fn load(&self, user: &UserId) -> Result<Vec<Subscription>, StoreError> {
        let path = self.path_for(user);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(path)(e)),
        };

        serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
            path,
            message: e.to_string(),
        })
    }

    async fn save(&self, user: &UserId, subscriptions: &[Subscription]) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(StoreError::io(&self.dir))?;

        let json = serde_json::to_string_pretty(subscriptions)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        let path = self.path_for(user);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(StoreError::io(&tmp))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(StoreError::io(&path))?;

        Ok(())
    }
}
