//! Configuration loaded from `config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variables checked for the joke API key, in order.
const API_KEY_VARS: &[&str] = &["JESTCALC_API_KEY", "GEMINI_API_KEY"];

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub joke: JokeConfig,
    pub speech: SpeechConfig,
    pub display: DisplayConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct JokeConfig {
    pub enabled: bool,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for JokeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            timeout_secs: 20,
        }
    }
}

impl JokeConfig {
    /// The API key from the environment, falling back to the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        API_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok())
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    /// Text-to-speech program; the text is passed as its last argument.
    pub command: String,
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "spd-say".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub thousands_separators: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            thousands_separators: true,
        }
    }
}

impl Config {
    /// Default location: `$XDG_CONFIG_HOME/jestcalc/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("jestcalc").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => path,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
