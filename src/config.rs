use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::views::ghost::TieBreak;
use crate::views::warmup::DEFAULT_WARMUP_FRACTIONS;

/// Engine tunables loaded from a TOML file. Every field has a default, so a
/// missing file means a fully default config, not an error.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Ascending fractions of the top-set weight used for warm-up hints.
    pub warmup_fractions: Vec<f64>,
    /// Which session wins ghost lookup when two share a start timestamp.
    pub ghost_tie_break: TieBreak,
    /// Gym suggested alongside the rotation's current plan. When unset, the
    /// gym of the most recently started workout is used instead.
    pub default_gym: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warmup_fractions: DEFAULT_WARMUP_FRACTIONS.to_vec(),
            ghost_tie_break: TieBreak::default(),
            default_gym: None,
        }
    }
}

impl Config {
    /// Reads the config at `path`, falling back to defaults when the file
    /// does not exist. A file that exists but does not parse, or that
    /// carries an unusable fraction table, is an error.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Config::default());
            }
            Err(err) => return Err(ConfigError::Io(err)),
        };
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.warmup_fractions.is_empty() {
            return Err(ConfigError::Invalid(
                "warmup_fractions must list at least one fraction".to_string(),
            ));
        }
        if let Some(bad) = self
            .warmup_fractions
            .iter()
            .find(|f| !f.is_finite() || **f <= 0.0 || **f >= 1.0)
        {
            return Err(ConfigError::Invalid(format!(
                "warmup fraction {bad} is outside (0, 1)"
            )));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse config file: {err}"),
            ConfigError::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err)
    }
}
