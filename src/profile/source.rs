//! Where fault profiles come from.
//!
//! Every decision asks its source for the profile by name, so a source that
//! re-reads its backing store picks up edits without a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::FaultProfile;

/// Looks up a fault profile by its dotted name (`drsquid.<client>.<profile>`)
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Fetch and parse the named profile, `None` if it does not exist or is unreadable
    async fn get_config(&self, name: &str) -> Option<FaultProfile>;
}

/// Reads profiles from YAML files in a directory.
///
/// `name` is tried as-is, then with `.yaml` and `.yml` appended.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    directory: PathBuf,
}

impl FileSystemSource {
    /// Source rooted at `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Directory profiles are read from
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn candidates(&self, name: &str) -> [PathBuf; 3] {
        [
            self.directory.join(name),
            self.directory.join(format!("{name}.yaml")),
            self.directory.join(format!("{name}.yml")),
        ]
    }
}

#[async_trait]
impl ProfileSource for FileSystemSource {
    async fn get_config(&self, name: &str) -> Option<FaultProfile> {
        // Names come from tokens on the responder side
        if name.contains(['/', '\\']) || name.contains("..") {
            crate::gated_error!(profile = %name, "Refusing profile name with path components");
            return None;
        }

        for path in self.candidates(name) {
            let text = match tokio::fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    crate::gated_error!(path = %path.display(), error = %e, "Failed to read profile");
                    return None;
                }
            };

            return match FaultProfile::from_yaml(&text) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    crate::gated_error!(path = %path.display(), error = %e, "Failed to parse profile");
                    None
                }
            };
        }

        crate::gated_error!(
            profile = %name,
            directory = %self.directory.display(),
            "The profile could not be found"
        );
        None
    }
}

/// In-memory profiles, for hosts that fetch profiles themselves and for tests
#[derive(Debug, Default)]
pub struct StaticSource {
    profiles: RwLock<HashMap<String, FaultProfile>>,
}

impl StaticSource {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(self, name: impl Into<String>, profile: FaultProfile) -> Self {
        self.insert(name, profile);
        self
    }

    /// Add or replace a profile
    pub fn insert(&self, name: impl Into<String>, profile: FaultProfile) {
        self.profiles.write().insert(name.into(), profile);
    }

    /// Drop a profile
    pub fn remove(&self, name: &str) -> Option<FaultProfile> {
        self.profiles.write().remove(name)
    }
}

#[async_trait]
impl ProfileSource for StaticSource {
    async fn get_config(&self, name: &str) -> Option<FaultProfile> {
        self.profiles.read().get(name).cloned()
    }
}
