//! Engine configuration.
//!
//! # Responsibility
//! - Carry tree-wide constants (digit width, gesture thresholds, artifact
//!   naming, probe timeout) explicitly into the engine.
//! - Load overrides from TOML with defaults for every missing key.
//!
//! # Invariants
//! - A validated config has `1 <= digit_width <= MAX_DIGIT_WIDTH`.
//! - `max_candidates` is within `1..=MAX_CANDIDATES`.

use crate::model::identifier::MAX_DIGIT_WIDTH;
use crate::model::relation::MAX_CANDIDATES;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_DIGIT_WIDTH: usize = 6;
pub const DEFAULT_SWIPE_THRESHOLD: f64 = 40.0;
pub const DEFAULT_LONG_PRESS_MS: u64 = 520;
pub const DEFAULT_JITTER_TOLERANCE: f64 = 10.0;
pub const DEFAULT_ARTIFACT_EXTENSION: &str = "jpg";
pub const DEFAULT_PLACEHOLDER_ARTIFACT: &str = "placeholder.jpg";
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 4_000;
pub const DEFAULT_META_NAMESPACE: &str = "swipetree";

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Explicit engine configuration passed at construction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Digit width shared by every base id in the tree.
    pub digit_width: usize,
    /// Minimum travel (in input units) before a motion counts as a swipe.
    pub swipe_threshold: f64,
    /// Hold time before a stationary press becomes a long press.
    pub long_press_ms: u64,
    /// Motion allowed during a pending long press.
    pub jitter_tolerance: f64,
    /// Slots proposed per generation, at most 9.
    pub max_candidates: usize,
    /// Extension (without dot) appended to ids to name artifacts.
    pub artifact_extension: String,
    /// Artifact shown when an anchor or tile has no photo.
    pub placeholder_artifact: String,
    /// Upper bound on a single existence probe.
    pub probe_timeout_ms: u64,
    /// Prefix for local metadata keys (`<namespace>.meta.<id>`).
    pub meta_namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            digit_width: DEFAULT_DIGIT_WIDTH,
            swipe_threshold: DEFAULT_SWIPE_THRESHOLD,
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            jitter_tolerance: DEFAULT_JITTER_TOLERANCE,
            max_candidates: MAX_CANDIDATES,
            artifact_extension: DEFAULT_ARTIFACT_EXTENSION.to_string(),
            placeholder_artifact: DEFAULT_PLACEHOLDER_ARTIFACT.to_string(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            meta_namespace: DEFAULT_META_NAMESPACE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses TOML overrides on top of defaults and validates the result.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML config file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Validates declaration-level invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.digit_width == 0 || self.digit_width > MAX_DIGIT_WIDTH {
            return Err(ConfigError::Invalid(format!(
                "digit_width must be within 1..={MAX_DIGIT_WIDTH}, got {}",
                self.digit_width
            )));
        }
        if self.max_candidates == 0 || self.max_candidates > MAX_CANDIDATES {
            return Err(ConfigError::Invalid(format!(
                "max_candidates must be within 1..={MAX_CANDIDATES}, got {}",
                self.max_candidates
            )));
        }
        if !(self.swipe_threshold.is_finite() && self.swipe_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "swipe_threshold must be a positive number".to_string(),
            ));
        }
        if !(self.jitter_tolerance.is_finite() && self.jitter_tolerance >= 0.0) {
            return Err(ConfigError::Invalid(
                "jitter_tolerance must be a non-negative number".to_string(),
            ));
        }
        let extension = self.artifact_extension.trim();
        if extension.is_empty() || extension.starts_with('.') {
            return Err(ConfigError::Invalid(
                "artifact_extension must be non-empty and have no leading dot".to_string(),
            ));
        }
        if self.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.meta_namespace.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "meta_namespace must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
