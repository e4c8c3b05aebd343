use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::predictor::{ForecastModel, ModelSpec};
use crate::session::SessionConfig;
use crate::twelvedata::{DEFAULT_BASE_URL, DEFAULT_RAPIDAPI_HOST};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub model: ModelSpec,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub symbol: String,
    pub interval: String,
    #[serde(default = "default_outputsize")]
    pub outputsize: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub api_host: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_outputsize() -> usize {
    5_000
}

fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub poll_interval_secs: u64,
    pub duration_mins: Option<u64>,
    pub retry_delay_ms: u64,
    pub retrain_every: u64,
    pub max_window: usize,
    pub max_consecutive_skips: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            duration_mins: None,
            retry_delay_ms: 0,
            retrain_every: 0,
            max_window: 5_000,
            max_consecutive_skips: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub archive_bars: bool,
    pub write_summary: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
            archive_bars: true,
            write_summary: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Parse a Twelve Data interval string ("1min", "4h", "1day", "1week",
/// "1month") into seconds.
pub fn parse_interval_secs(s: &str) -> Result<u64> {
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .with_context(|| format!("invalid interval '{}': expected format like '1min'", s))?;
    let (num_str, unit) = s.split_at(split);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }
    let unit_secs = match unit {
        "min" => 60,
        "h" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        "month" => 30 * 86_400,
        _ => bail!(
            "invalid interval '{}': unsupported unit '{}', expected one of min/h/day/week/month",
            s,
            unit
        ),
    };
    n.checked_mul(unit_secs)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl FeedConfig {
    pub fn interval_secs(&self) -> Result<u64> {
        parse_interval_secs(&self.interval)
    }
}

impl Config {
    /// Read the TOML file named by `ARMA_QUOTE_CONFIG` (default
    /// `config/default.toml`) and the RapidAPI credentials from `.env` or the
    /// environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("ARMA_QUOTE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::load_from_path(&config_path)?;

        config.feed.api_key = std::env::var("RAPIDAPI_KEY")
            .context("RAPIDAPI_KEY not set in .env or environment")?;
        config.feed.api_host =
            std::env::var("RAPIDAPI_HOST").unwrap_or_else(|_| DEFAULT_RAPIDAPI_HOST.to_string());
        Ok(config)
    }

    /// Parse and validate a config file without touching credentials.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed.symbol.trim().is_empty() {
            bail!("feed.symbol must not be empty");
        }
        self.feed
            .interval_secs()
            .context("feed.interval is invalid")?;
        if self.session.poll_interval_secs == 0 {
            bail!("session.poll_interval_secs must be > 0");
        }

        let model = self.build_model()?;
        let needed = model.min_fit_len() + 1;
        if self.feed.outputsize < needed {
            bail!(
                "feed.outputsize ({}) is below the {} bars {} needs",
                self.feed.outputsize,
                needed,
                model.label()
            );
        }
        if self.session.max_window < needed {
            bail!(
                "session.max_window ({}) is below the {} bars {} needs",
                self.session.max_window,
                needed,
                model.label()
            );
        }
        Ok(())
    }

    pub fn build_model(&self) -> Result<ForecastModel> {
        ForecastModel::from_spec(&self.model).context("model section is invalid")
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            symbol: self.feed.symbol.clone(),
            interval: self.feed.interval.clone(),
            refresh_count: self.feed.outputsize,
            poll_interval: Duration::from_secs(self.session.poll_interval_secs),
            retry_delay: Duration::from_millis(self.session.retry_delay_ms),
            duration: self
                .session
                .duration_mins
                .map(|m| Duration::from_secs(m.saturating_mul(60))),
            retrain_every: self.session.retrain_every,
            max_window: self.session.max_window,
            max_consecutive_skips: self.session.max_consecutive_skips,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::ModelKind;
    use crate::regression::RegressorKind;

    #[test]
    fn parse_default_toml() {
        let toml_str = r#"
[feed]
symbol = "MSFT"
interval = "1min"
outputsize = 5000

[model]
kind = "arma"
p = 2
q = 1
estimator_lags = 3
regressor = "svd"

[session]
poll_interval_secs = 10
duration_mins = 390

[logging]
level = "debug"
"#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert_eq!(config.feed.symbol, "MSFT");
        assert_eq!(config.feed.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model.kind, ModelKind::Arma);
        assert_eq!(config.model.regressor, RegressorKind::Svd);
        assert_eq!(config.session.retry_delay_ms, 0);
        assert!(config.storage.archive_bars);
        let session = config.session_config();
        assert_eq!(session.duration, Some(Duration::from_secs(390 * 60)));
        assert_eq!(session.refresh_count, 5000);
    }

    #[test]
    fn parse_interval_valid() {
        assert_eq!(parse_interval_secs("1min").unwrap(), 60);
        assert_eq!(parse_interval_secs("45min").unwrap(), 2_700);
        assert_eq!(parse_interval_secs("4h").unwrap(), 14_400);
        assert_eq!(parse_interval_secs("1day").unwrap(), 86_400);
        assert_eq!(parse_interval_secs("1month").unwrap(), 2_592_000);
    }

    #[test]
    fn parse_interval_rejects_invalid_inputs() {
        assert!(parse_interval_secs("").is_err());
        assert!(parse_interval_secs("min").is_err());
        assert!(parse_interval_secs("0min").is_err());
        assert!(parse_interval_secs("1m").is_err());
        assert!(parse_interval_secs("15").is_err());
    }
}
