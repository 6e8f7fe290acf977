use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{
    DEFAULT_OBS_HOST, DEFAULT_OBS_PORT, DEFAULT_SAVE_DELAY_SECS, DEFAULT_UDP_LISTEN_ADDR,
    OBS_REQUEST_TIMEOUT_SECS, clamp_save_delay,
};
use crate::error::{HighlightError, Result};

const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings persisted between runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub obs_host: String,
    pub obs_port: u16,
    pub udp_listen_addr: String,
    pub save_delay_secs: u64,
    /// Deadline for the OBS handshake and for each request.
    pub obs_request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            obs_host: DEFAULT_OBS_HOST.to_string(),
            obs_port: DEFAULT_OBS_PORT,
            udp_listen_addr: DEFAULT_UDP_LISTEN_ADDR.to_string(),
            save_delay_secs: DEFAULT_SAVE_DELAY_SECS,
            obs_request_timeout_secs: OBS_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Loads the config from the platform config directory, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let path = match config_path() {
            Ok(path) => path,
            Err(err) => {
                warn!(error = %err, "No config directory available, using defaults");
                return Self::default();
            }
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = ?path, error = %err, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = ?path, "No config found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let mut config: AppConfig = toml::from_str(&contents)
            .map_err(|err| HighlightError::Config(format!("Failed to parse config: {err}")))?;
        config.save_delay_secs = clamp_save_delay(config.save_delay_secs);
        info!(path = ?path, "Configuration loaded");
        Ok(config)
    }

    /// Writes to a sibling temp file and renames it over the target.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                debug!(dir = ?parent, "Created config directory");
            }
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|err| HighlightError::Config(format!("Failed to serialize config: {err}")))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(contents.as_bytes())?;
        temp_file.sync_all()?;
        fs::rename(&temp_path, path)?;

        debug!(path = ?path, "Configuration saved");
        Ok(())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "rl-highlight", "RLHighlight")
        .ok_or_else(|| HighlightError::Config("Failed to resolve config directory".to_string()))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join(CONFIG_FILE_NAME))
}

pub fn log_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().join("logs"))
}
