use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use colored::Colorize;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::store::FileStore;

/// Global configuration values
///
/// Lapse's configuration is stored in a TOML file in the current user's
/// config directory, which is `~/.config/lapse/config.toml` by default.
///
/// A config can be loaded from a file with [`Config::load`], or use
/// [`Config::init`] to create a default config file if one does not exist
/// at the given path. To save a config to the filesystem, use
/// [`Config::save`].
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Directory to find hook executables
    ///
    /// Default is a directory called `hooks` inside the config directory.
    /// Serialized as an absolute path.
    #[serde(default = "default_hooks_directory")]
    pub hooks_directory: PathBuf,
    /// Directory holding the persisted widget state, one file per record
    ///
    /// Default location is the user's state directory,
    /// which is usually `~/.local/state/lapse`.
    /// Serialized as an absolute path.
    #[serde(default = "default_state_directory")]
    pub state_directory: PathBuf,
    /// Default duration for countdown timers started without one
    ///
    /// Default is 5 minutes (300 seconds).
    /// Serialized as an integer count of seconds.
    #[serde(default = "default_timer_duration", with = "crate::time::seconds")]
    pub timer_duration: TimeDelta,
}

impl Config {
    /// Returns the current config, creating a default config file if one does not exist
    pub fn init(config_path: &Path) -> Result<Self> {
        if let Some(conf) = Config::load(config_path)? {
            Ok(conf)
        } else {
            let conf = Config::default();

            println!(
                "Creating config file at {}",
                config_path.display().to_string().cyan()
            );

            conf.save(config_path)?;

            Ok(conf)
        }
    }

    /// Reads a TOML config file
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            let config_str = read_to_string(path)?;

            toml::from_str(&config_str).with_context(|| "Failed to parse config from TOML")
        } else {
            Ok(None)
        }
    }

    /// Write this config file to the filesystem
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string(&self).with_context(|| "Unable to format config as TOML")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create config directory {}", parent.display())
            })?;
        }

        std::fs::write(path, toml)
            .with_context(|| format!("Unable to write config TOML to path {}", path.display()))
    }

    /// The key-value store holding the persisted widget state
    pub fn store(&self) -> FileStore {
        FileStore::new(self.state_directory.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hooks_directory: default_hooks_directory(),
            state_directory: default_state_directory(),
            timer_duration: default_timer_duration(),
        }
    }
}

/// Get the default location of the config file
pub fn default_config_path() -> Result<PathBuf> {
    let conf_path = ProjectDirs::from("dev", "Tickhouse", "Lapse")
        .with_context(|| "Unable to determine XDG directories")?
        .config_dir()
        .join("config.toml");

    Ok(conf_path)
}

fn default_hooks_directory() -> PathBuf {
    let project_dirs = ProjectDirs::from("dev", "Tickhouse", "Lapse")
        .with_context(|| "Unable to determine XDG directories")
        .unwrap();

    project_dirs.config_dir().join("hooks")
}

fn default_state_directory() -> PathBuf {
    let project_dirs = ProjectDirs::from("dev", "Tickhouse", "Lapse")
        .with_context(|| "Unable to determine XDG directories")
        .unwrap();

    project_dirs
        .state_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_dirs.data_dir().join("state"))
}

fn default_timer_duration() -> TimeDelta {
    TimeDelta::new(5 * 60, 0).unwrap()
}
