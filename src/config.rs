use std::env;

use serde::Deserialize;

use crate::db::DbConfig;
use crate::error::{storage_error, StoreError};

/// Whether ACL checks apply. Injected into every component at construction
/// time instead of being read from the environment at call time.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Restricted,
    /// Every design is readable and writable by everyone; ACL rows are
    /// still maintained but never consulted.
    Unrestricted,
}

impl Visibility {
    pub fn is_unrestricted(self) -> bool {
        self == Visibility::Unrestricted
    }
}

fn default_reaper_interval() -> u64 {
    60
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubConfig {
    pub db: DbConfig,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_reaper_interval")]
    pub session_reaper_interval_secs: u64,
}

impl HubConfig {
    /// Reads the config as JSON from the `DESIGNHUB_CONFIG` env variable.
    pub fn from_env() -> Result<Self, StoreError> {
        let raw = env::var("DESIGNHUB_CONFIG").map_err(|_| {
            StoreError::storage(
                "Config not found, set env variable \"DESIGNHUB_CONFIG\"",
            )
        })?;
        serde_json::from_str(&raw).map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_defaults_to_restricted() {
        let config: HubConfig = serde_json::from_str(
            r#"{
                "db": {
                    "host": "localhost",
                    "port": 5432,
                    "user": "designhub",
                    "password": "designhub",
                    "database": "designhub"
                }
            }"#,
        )
        .unwrap();
        assert_eq!(config.visibility, Visibility::Restricted);
        assert_eq!(config.session_reaper_interval_secs, 60);
    }

    #[test]
    fn unrestricted_visibility_is_parsed() {
        let config: HubConfig = serde_json::from_str(
            r#"{
                "db": {
                    "host": "localhost",
                    "port": 5432,
                    "user": "designhub",
                    "password": "designhub",
                    "database": "designhub"
                },
                "visibility": "unrestricted",
                "sessionReaperIntervalSecs": 5
            }"#,
        )
        .unwrap();
        assert!(config.visibility.is_unrestricted());
        assert_eq!(config.session_reaper_interval_secs, 5);
    }
}
