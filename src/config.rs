use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::session::AnalysisParams;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_sma_short() -> usize {
    20
}

fn default_sma_long() -> usize {
    50
}

fn default_ema_window() -> usize {
    20
}

fn default_rsi_period() -> usize {
    14
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Indicator windows applied by the default analysis pipeline.
#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sma_short")]
    pub sma_short: usize,
    #[serde(default = "default_sma_long")]
    pub sma_long: usize,
    #[serde(default = "default_ema_window")]
    pub ema_window: usize,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,
    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,
    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sma_short: default_sma_short(),
            sma_long: default_sma_long(),
            ema_window: default_ema_window(),
            rsi_period: default_rsi_period(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
        }
    }
}

impl AnalysisConfig {
    pub fn to_params(&self) -> AnalysisParams {
        AnalysisParams {
            sma_short: self.sma_short,
            sma_long: self.sma_long,
            ema_window: self.ema_window,
            rsi_period: self.rsi_period,
            macd_fast: self.macd_fast,
            macd_slow: self.macd_slow,
            macd_signal: self.macd_signal,
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

/// Load from `path` when given; otherwise use built-in defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<AppConfig, Report<ConfigError>> {
    match path {
        Some(path) => load(path),
        None => Ok(AppConfig::default()),
    }
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not valid",
                config.general.log_format
            ),
        }));
    }

    let windows = [
        ("analysis.sma_short", config.analysis.sma_short),
        ("analysis.sma_long", config.analysis.sma_long),
        ("analysis.ema_window", config.analysis.ema_window),
        ("analysis.rsi_period", config.analysis.rsi_period),
        ("analysis.macd_fast", config.analysis.macd_fast),
        ("analysis.macd_slow", config.analysis.macd_slow),
        ("analysis.macd_signal", config.analysis.macd_signal),
    ];
    for (field, window) in windows {
        if window == 0 {
            return Err(Report::new(ConfigError::Validation {
                field: format!("{field} must be > 0"),
            }));
        }
    }

    Ok(())
}
