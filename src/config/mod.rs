mod basic;
mod storage;

pub use basic::BasicConfig;
pub use storage::StorageConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core settings (see `basic` table in config.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Database pool settings (see `storage` table in config.toml).
    #[serde(default)]
    pub storage: StorageConfig,
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "GABINETE_";

impl Config {
    /// Builds a Figment that merges defaults, a config TOML file if present, then
    /// `GABINETE_`-prefixed environment variables (`__` separates tables).
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration from defaults, optional `config.toml` and the environment.
    ///
    /// Panics on malformed input; only the binary calls this.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml + env): {err}")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .extract()
            .unwrap();
        assert_eq!(cfg.basic.database_url, "sqlite://gabinete.db");
        assert_eq!(cfg.basic.loglevel, "info");
        assert_eq!(cfg.storage.busy_timeout_secs, 5);
        assert_eq!(cfg.storage.max_connections, 5);
    }

    #[test]
    fn toml_overrides_single_keys() {
        let cfg: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                loglevel = "debug"

                [storage]
                max_connections = 1
                "#,
            ))
            .extract()
            .unwrap();
        assert_eq!(cfg.basic.loglevel, "debug");
        assert_eq!(cfg.basic.database_url, "sqlite://gabinete.db");
        assert_eq!(cfg.storage.max_connections, 1);
        assert_eq!(cfg.storage.busy_timeout_secs, 5);
    }
}
