use serde::{Deserialize, Serialize};
use std::time::Duration;

/// SQLite pool settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// How long a writer waits on a locked database before failing.
    /// TOML: `storage.busy_timeout_secs`. Default: `5`.
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,

    /// TOML: `storage.max_connections`. Default: `5`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl StorageConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_secs(self.busy_timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            busy_timeout_secs: default_busy_timeout_secs(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_busy_timeout_secs() -> u64 {
    5
}

fn default_max_connections() -> u32 {
    5
}
