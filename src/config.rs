//! Application-level configuration loading: gameplay limits, round budgets and the admin token.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GUESSR_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured admin token.
const ADMIN_TOKEN_ENV: &str = "GUESSR_ADMIN_TOKEN";

const DEFAULT_DAILY_ROUND_LIMIT: u8 = 5;
const DEFAULT_DAILY_ROUND_BUDGET: Duration = Duration::from_secs(90);
const DEFAULT_MATCH_ROUND_BUDGET: Duration = Duration::from_secs(30);
const DEFAULT_GEO_MAX_ATTEMPTS: u32 = 20;
const DEFAULT_AVERAGE_RANKING_MIN_ROUNDS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Free-play rounds available per game day.
    pub daily_round_limit: u8,
    /// Time budget of a free-play round.
    pub daily_round_budget: Duration,
    /// Time budget of a tournament round.
    pub match_round_budget: Duration,
    /// Sampling attempts before a target is reported unavailable.
    pub geo_max_attempts: u32,
    /// Rounds a player needs before appearing in the average ranking.
    pub average_ranking_min_rounds: usize,
    /// Token expected in `X-Admin-Token`; admin routes are closed when unset.
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        daily_round_limit = config.daily_round_limit,
                        "loaded gameplay settings from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_env_admin_token()
    }

    /// Parse a JSON document; missing keys keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    fn with_env_admin_token(mut self) -> Self {
        if let Some(token) = env::var(ADMIN_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
        {
            self.admin_token = Some(token);
        }
        if self.admin_token.is_none() {
            warn!("no admin token configured; admin routes will reject every request");
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            daily_round_limit: DEFAULT_DAILY_ROUND_LIMIT,
            daily_round_budget: DEFAULT_DAILY_ROUND_BUDGET,
            match_round_budget: DEFAULT_MATCH_ROUND_BUDGET,
            geo_max_attempts: DEFAULT_GEO_MAX_ATTEMPTS,
            average_ranking_min_rounds: DEFAULT_AVERAGE_RANKING_MIN_ROUNDS,
            admin_token: None,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    daily_round_limit: Option<u8>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    daily_round_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    match_round_secs: Option<Duration>,
    geo_max_attempts: Option<u32>,
    average_ranking_min_rounds: Option<usize>,
    admin_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            daily_round_limit: value
                .daily_round_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.daily_round_limit),
            daily_round_budget: value
                .daily_round_secs
                .filter(|budget| !budget.is_zero())
                .unwrap_or(defaults.daily_round_budget),
            match_round_budget: value
                .match_round_secs
                .filter(|budget| !budget.is_zero())
                .unwrap_or(defaults.match_round_budget),
            geo_max_attempts: value
                .geo_max_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.geo_max_attempts),
            average_ranking_min_rounds: value
                .average_ranking_min_rounds
                .unwrap_or(defaults.average_ranking_min_rounds),
            admin_token: value.admin_token.filter(|token| !token.trim().is_empty()),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
