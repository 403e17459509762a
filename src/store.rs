use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::assignment::Assignments;
use crate::error::{Error, Result};
use crate::sources::ThreadKey;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
struct AssignmentFile {
    #[serde(default)]
    assignments: Assignments,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
struct RosterFile {
    #[serde(default)]
    handles: Vec<String>,
}

/// Persists owner assignments and per-review participant rosters as TOML
/// under the data directory.
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn assignments_file(&self) -> PathBuf {
        self.data_dir.join("assignments.toml")
    }

    /// `rosters/{owner}/{repo}/{n}.toml`. Nesting keeps keys distinct, since
    /// `/` cannot appear in an owner or repository name.
    fn roster_file(&self, key: &ThreadKey) -> PathBuf {
        self.data_dir
            .join("rosters")
            .join(&key.owner)
            .join(&key.repo)
            .join(format!("{}.toml", key.number))
    }

    /// Load a TOML file. Returns the default if the file is missing or corrupted.
    fn load_file<T: DeserializeOwned + Default>(&self, path: &Path) -> T {
        if !path.exists() {
            return T::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<T>(&content) {
                Ok(value) => value,
                Err(e) => {
                    warn!("corrupted store file {}: {e}, ignoring", path.display());
                    T::default()
                }
            },
            Err(e) => {
                warn!("failed to read store file {}: {e}, ignoring", path.display());
                T::default()
            }
        }
    }

    fn save_file<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let dir = path.parent().unwrap_or(self.data_dir.as_path());
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Store(format!("failed to create {}: {e}", dir.display())))?;

        let content = toml::to_string_pretty(value)
            .map_err(|e| Error::Store(format!("failed to serialize {}: {e}", path.display())))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Store(format!("failed to write {}: {e}", path.display())))?;

        Ok(())
    }

    pub fn load_assignments(&self) -> Assignments {
        self.load_file::<AssignmentFile>(&self.assignments_file())
            .assignments
    }

    pub fn save_assignments(&self, assignments: &Assignments) -> Result<()> {
        let file = AssignmentFile {
            assignments: assignments.clone(),
        };
        self.save_file(&self.assignments_file(), &file)
    }

    pub fn load_roster(&self, key: &ThreadKey) -> Vec<String> {
        self.load_file::<RosterFile>(&self.roster_file(key)).handles
    }

    /// Store the roster for a review. Duplicate handles are dropped, first one kept.
    pub fn save_roster(&self, key: &ThreadKey, handles: &[String]) -> Result<()> {
        let mut unique: Vec<String> = Vec::with_capacity(handles.len());
        for handle in handles {
            if !unique.contains(handle) {
                unique.push(handle.clone());
            }
        }
        self.save_file(&self.roster_file(key), &RosterFile { handles: unique })
    }
}
