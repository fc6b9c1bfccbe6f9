use std::fs;

use serde::{Deserialize, Serialize};

use crate::db::connection;
use crate::error::PomoError;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// Client-side preferences kept next to the database in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub active_account_id: Option<String>,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            active_account_id: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl AppConfig {
    /// Read `config.json`; a missing file yields the defaults.
    pub fn load() -> Result<Self, PomoError> {
        let path = connection::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| {
            PomoError::validation(format!("Invalid config at {}: {e}", path.display()))
        })
    }

    pub fn save(&self) -> Result<(), PomoError> {
        let path = connection::config_path()?;
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PomoError::database(format!("Cannot encode config: {e}")))?;
        fs::write(&path, content)?;
        tracing::debug!(path = %path.display(), "saved config");
        Ok(())
    }
}
