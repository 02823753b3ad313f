//! Command line and optional TOML configuration.
//!
//! The three positionals are the whole required interface; the config file
//! only overrides paths that differ between images.

use crate::error::{Result, VoicedError};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const USAGE: &str = "usage: q6voiced CARD_NUM DEVICE_NUM CALLBACK_SCRIPT";
pub const CONFIG_ENV: &str = "Q6VOICED_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "/etc/q6voiced.toml";
const DEFAULT_LOOPBACK_PROGRAM: &str = "/bin/pw-loopback";

#[derive(Debug, Parser)]
#[command(name = "q6voiced")]
#[command(about = "Routes modem voice calls to the audio codec")]
#[command(version)]
pub struct Cli {
    /// ALSA card index of the voice codec
    #[arg(value_name = "CARD_NUM")]
    pub card: u32,

    /// ALSA device index of the voice codec
    #[arg(value_name = "DEVICE_NUM")]
    pub device: u32,

    /// Hook script invoked with voice-start, voice-stop or call-added
    #[arg(value_name = "CALLBACK_SCRIPT")]
    pub script: PathBuf,

    /// Path to the TOML config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub loopback: LoopbackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopbackConfig {
    #[serde(default = "default_loopback_program")]
    pub program: PathBuf,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            program: default_loopback_program(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_loopback_program() -> PathBuf {
    PathBuf::from(DEFAULT_LOOPBACK_PROGRAM)
}

/// `--config`, then `Q6VOICED_CONFIG`, then the system default.
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    match env::var_os(CONFIG_ENV) {
        Some(value) if !value.is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_PATH),
    }
}

/// A missing file yields defaults; an unreadable or malformed one is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = match fs_err::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(VoicedError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str::<Config>(&content).map_err(|source| VoicedError::ConfigMalformed {
        path: path.to_path_buf(),
        source,
    })
}
