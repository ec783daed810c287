use crate::error::LookupError;
use crate::error::ResultMessage;
use crate::lookup::MatchPolicy;
use crate::lookup::DEFAULT_KEY_COLUMN;
use crate::lookup::DEFAULT_SUGGESTION_LIMIT;
use log::debug;
use serde::Deserialize;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Directory name used under the platform config and cache directories
const APP_DIR: &str = "coil-lookup";

pub const DEFAULT_REMOTE_URL: &str = "https://raw.githubusercontent.com/gmanand23/Coil_Info/main/coil-data.xlsx";
pub const DEFAULT_FILE_NAME: &str = "coil-data.xlsx";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "downloaded_coil_data.xlsx";
pub const DEFAULT_EXPORT_SHEET_NAME: &str = "Coil Data";

/// Runtime settings, read from a TOML file. Every field is optional.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Spreadsheet fetched on startup and on reload
    pub remote_url: String,
    /// Logical name of the key column
    pub key_column: String,
    pub match_policy: MatchPolicy,
    pub suggestion_limit: usize,
    /// Label used when a URL or file name yields none
    pub default_file_name: String,
    /// Export file name used when the dataset has no label
    pub export_file_name: String,
    pub export_sheet_name: String,
    /// Cache database location; defaults to the user cache directory
    pub cache_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_url: DEFAULT_REMOTE_URL.to_owned(),
            key_column: DEFAULT_KEY_COLUMN.to_owned(),
            match_policy: MatchPolicy::default(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            default_file_name: DEFAULT_FILE_NAME.to_owned(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_owned(),
            export_sheet_name: DEFAULT_EXPORT_SHEET_NAME.to_owned(),
            cache_path: None,
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads settings from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, LookupError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|path| path.exists()) {
                Some(path) => path,
                None => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        debug!("Reading configuration from '{}'", path.display());
        let text = std::fs::read_to_string(&path).map_err(|e| LookupError::io(path.display(), e))?;
        Self::from_toml(&text).with_prefix(&format!("Invalid configuration '{}'", path.display()))
    }

    /// Parses and validates TOML settings
    pub fn from_toml(text: &str) -> Result<Self, LookupError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LookupError> {
        if self.key_column.trim().is_empty() {
            Err(LookupError::ConfigError("key_column must not be empty".to_owned()))?;
        }
        if self.suggestion_limit == 0 {
            Err(LookupError::ConfigError("suggestion_limit must be at least 1".to_owned()))?;
        }
        if self.timeout_secs == 0 {
            Err(LookupError::ConfigError("timeout_secs must be at least 1".to_owned()))?;
        }
        let url = Url::parse(&self.remote_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            Err(LookupError::ConfigError(format!("remote_url must be http(s): '{}'", self.remote_url)))?;
        }
        Ok(())
    }

    /// `<config dir>/coil-lookup/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }

    /// Cache database location, falling back to `<cache dir>/coil-lookup/cache.duckdb`
    pub fn cache_file(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("cache.duckdb")
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
