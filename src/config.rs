use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api_fetch::{DEFAULT_BASE_URL, parse_base_url};

const DEFAULT_GAMES_POLL_SECS: u64 = 60;
const MIN_GAMES_POLL_SECS: u64 = 10;
const DEFAULT_RECENT_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_base_url: String,
    /// `None` lets requests wait on the transport indefinitely.
    pub api_timeout: Option<Duration>,
    pub games_poll: Duration,
    pub recent_games_limit: Option<u32>,
    pub log_filter: String,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            api_timeout: None,
            games_poll: Duration::from_secs(DEFAULT_GAMES_POLL_SECS),
            recent_games_limit: Some(DEFAULT_RECENT_LIMIT),
            log_filter: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let api_base_url = get("NBA_API_BASE_URL").unwrap_or(defaults.api_base_url);
        parse_base_url(&api_base_url).context("NBA_API_BASE_URL")?;

        let api_timeout = match get("NBA_API_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .with_context(|| format!("NBA_API_TIMEOUT_SECS is not a number: {raw}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let games_poll = get("GAMES_POLL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| Duration::from_secs(secs.max(MIN_GAMES_POLL_SECS)))
            .unwrap_or(defaults.games_poll);

        let recent_games_limit = match get("RECENT_GAMES_LIMIT") {
            Some(raw) => raw.parse::<u32>().ok().filter(|l| *l > 0),
            None => defaults.recent_games_limit,
        };

        let log_filter = get("NBA_LOG")
            .or_else(|| get("RUST_LOG"))
            .unwrap_or(defaults.log_filter);
        let log_dir = get("NBA_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        Ok(Self {
            api_base_url,
            api_timeout,
            games_poll,
            recent_games_limit,
            log_filter,
            log_dir,
        })
    }
}

/// Loads `.env.local` then `.env`; variables already set win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}
