//! Configuration loading and data folder layout
//!
//! Resolution priority (highest first):
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! Tiers 1 and 2 are applied by the binary on top of the value returned by
//! [`StemsplitConfig::load`]. A missing TOML file is not an error: the service
//! starts on compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "STEMSPLIT_CONFIG";

/// Staged uploads, relative to the data folder
pub const UPLOAD_DIR_NAME: &str = "uploads";
/// Separation output root, relative to the data folder
pub const OUTPUT_DIR_NAME: &str = "output";
/// Separation model cache, relative to the data folder
pub const MODEL_DIR_NAME: &str = "spleeter_models";

/// Service configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StemsplitConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Folder holding `uploads/`, `output/` and `spleeter_models/`
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Largest accepted request body for `POST /upload`
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Prebuilt frontend bundle (production variant)
    ///
    /// When unset or missing on disk, only the API routes are served.
    #[serde(default)]
    pub frontend_dir: Option<PathBuf>,

    /// External separation tool settings
    #[serde(default)]
    pub separation: SeparationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External separation tool settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SeparationConfig {
    /// Executable base name, without platform suffix
    #[serde(default = "default_tool_name")]
    pub tool_name: String,

    /// Explicit executable path; skips lookup when set
    #[serde(default)]
    pub tool_path: Option<PathBuf>,

    /// Separation preset passed as `-p`
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Environment variable that points the tool at the model cache
    #[serde(default = "default_model_env_var")]
    pub model_env_var: String,

    /// Upper bound on one tool run, in seconds (0 = unbounded)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_upload_bytes() -> usize {
    200 * 1024 * 1024
}

fn default_tool_name() -> String {
    "spleeter".to_string()
}

fn default_preset() -> String {
    "spleeter:2stems".to_string()
}

fn default_model_env_var() -> String {
    "SPLEETER_MODEL_PATH".to_string()
}

fn default_timeout_secs() -> u64 {
    900
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StemsplitConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            frontend_dir: None,
            separation: SeparationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            tool_name: default_tool_name(),
            tool_path: None,
            preset: default_preset(),
            model_env_var: default_model_env_var(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl StemsplitConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration from an optional TOML file
    ///
    /// `None` or a nonexistent file yields compiled defaults. A file that
    /// exists but does not parse is an error.
    ///
    /// Runs before logging is initialized, so reporting which source was
    /// used is left to the caller.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path.filter(|p| p.exists()) else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        if self.separation.tool_name.trim().is_empty() && self.separation.tool_path.is_none() {
            return Err(Error::Config(
                "separation.tool_name must not be empty unless tool_path is set".to_string(),
            ));
        }
        if self.separation.preset.trim().is_empty() {
            return Err(Error::Config("separation.preset must not be empty".to_string()));
        }
        if self.separation.model_env_var.trim().is_empty() {
            return Err(Error::Config(
                "separation.model_env_var must not be empty".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }

    /// Staging area for uploaded files
    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOAD_DIR_NAME)
    }

    /// Output root for separated stems
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join(OUTPUT_DIR_NAME)
    }

    /// Local model cache handed to the separation tool
    pub fn model_dir(&self) -> PathBuf {
        self.data_dir.join(MODEL_DIR_NAME)
    }
}

/// Locate the TOML config file
///
/// Priority: explicit argument, then `STEMSPLIT_CONFIG`, then
/// `<config_dir>/stemsplit/config.toml` if it exists. An explicit path is
/// returned even when it does not exist so the caller can warn about it.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Platform config location: `~/.config/stemsplit/config.toml` on Linux,
/// the equivalent application support / AppData folder elsewhere
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("stemsplit").join("config.toml"))
}
