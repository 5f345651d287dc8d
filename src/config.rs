//! Session configuration via TOML files.
//!
//! Every key has a default, so an empty file (or a file without the relevant
//! section) yields a usable configuration. Values are clamped into their
//! valid ranges during parsing.

use std::fs;
use std::path::Path;

use serde::Serialize;
use toml::Value;

/// Trial-engine configuration, from the `[trial]` section.
#[derive(Debug, Clone, Serialize)]
pub struct TrialConfig {
    /// Starting classifier tolerance, clamped to [0, 100].
    pub initial_tolerance: i32,
    /// Tolerance decrement applied after every yes/no verdict.
    pub tolerance_decay: i32,
    /// Dominance-ratio threshold fed to the classifier.
    pub ratio_threshold: f32,
    /// Cosmetic progress ceiling shown by the presentation layer. Never
    /// enforced by the engine.
    pub epoch_cap: u32,
    /// Optional seed for the color generator; absent means OS entropy.
    pub seed: Option<u64>,
}

impl TrialConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let table = value
            .get("trial")
            .and_then(|v| v.as_table())
            .cloned()
            .unwrap_or_default();

        let initial_tolerance = table
            .get("initial_tolerance")
            .and_then(|v| v.as_integer())
            .map(|v| (v as i32).clamp(0, 100))
            .unwrap_or(100);

        let tolerance_decay = table
            .get("tolerance_decay")
            .and_then(|v| v.as_integer())
            .map(|v| (v as i32).max(0))
            .unwrap_or(5);

        let ratio_threshold = table
            .get("ratio_threshold")
            .and_then(|v| v.as_float())
            .map(|v| v as f32)
            .unwrap_or(1.2);
        if !ratio_threshold.is_finite() || ratio_threshold <= 0.0 {
            return Err(ConfigError::Parse(
                "trial.ratio_threshold must be positive".into(),
            ));
        }

        let epoch_cap = table
            .get("epoch_cap")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(1) as u32)
            .unwrap_or(1000);

        let seed = table
            .get("seed")
            .and_then(|v| v.as_integer())
            .map(|v| v as u64);

        Ok(Self {
            initial_tolerance,
            tolerance_decay,
            ratio_threshold,
            epoch_cap,
            seed,
        })
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            initial_tolerance: 100,
            tolerance_decay: 5,
            ratio_threshold: 1.2,
            epoch_cap: 1000,
            seed: None,
        }
    }
}

/// Help-pipeline configuration, from the `[assistant]` section.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantConfig {
    /// Recording window in seconds.
    pub record_seconds: u64,
    /// Recording sample rate in hertz.
    pub sample_rate: u32,
    /// Chat-completion model name.
    pub chat_model: String,
    /// Text-to-speech voice name.
    pub voice: String,
    /// BCP-47 language code for speech services.
    pub language_code: String,
}

impl AssistantConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path)?;
        Self::from_str(&contents)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let value: Value =
            toml::from_str(toml_str).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let table = value
            .get("assistant")
            .and_then(|v| v.as_table())
            .cloned()
            .unwrap_or_default();

        let record_seconds = table
            .get("record_seconds")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(1) as u64)
            .unwrap_or(5);

        let sample_rate = table
            .get("sample_rate")
            .and_then(|v| v.as_integer())
            .map(|v| v.max(8_000) as u32)
            .unwrap_or(48_000);

        let chat_model = table
            .get("chat_model")
            .and_then(|v| v.as_str())
            .unwrap_or("gpt-4")
            .to_string();

        let voice = table
            .get("voice")
            .and_then(|v| v.as_str())
            .unwrap_or("en-US-Wavenet-D")
            .to_string();

        let language_code = table
            .get("language_code")
            .and_then(|v| v.as_str())
            .unwrap_or("en-US")
            .to_string();

        Ok(Self {
            record_seconds,
            sample_rate,
            chat_model,
            voice,
            language_code,
        })
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            record_seconds: 5,
            sample_rate: 48_000,
            chat_model: "gpt-4".to_string(),
            voice: "en-US-Wavenet-D".to_string(),
            language_code: "en-US".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "IO error: {}", err),
            ConfigError::Parse(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}
