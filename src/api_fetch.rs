use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::api_error::ApiError;
use crate::api_types::{
    Game, GameLog, InteractiveMatchPrediction, MatchPrediction, MissingPlayerImpact, Player,
    PlayerProjection, RosterEntry, SeasonStats, StatCategory, TrendResult, VsTeamStats,
};
use crate::http_client::http_client;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Typed access to the prediction API. Cheap to clone; all clones share one
/// connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base = parse_base_url(base_url)?;
        let http = http_client(timeout)
            .map_err(|err| ApiError::Client(format!("{err:#}")))?
            .clone();
        Ok(Self { base, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn games_today(&self) -> Result<Vec<Game>, ApiError> {
        self.get_list("games_today", games_today_url(&self.base))
    }

    pub fn games_30h(&self) -> Result<Vec<Game>, ApiError> {
        self.get_list("games_30h", games_30h_url(&self.base))
    }

    pub fn search_players(&self, query: &str) -> Result<Vec<Player>, ApiError> {
        self.get_list("search_players", search_players_url(&self.base, query))
    }

    pub fn team_roster(&self, team: &str) -> Result<Vec<RosterEntry>, ApiError> {
        self.get_list("team_roster", team_roster_url(&self.base, team))
    }

    pub fn player_season(&self, player_id: u32) -> Result<SeasonStats, ApiError> {
        self.get_json("player_season", player_season_url(&self.base, player_id))
    }

    pub fn player_recent(
        &self,
        player_id: u32,
        limit: Option<u32>,
    ) -> Result<Vec<GameLog>, ApiError> {
        self.get_list(
            "player_recent",
            player_recent_url(&self.base, player_id, limit),
        )
    }

    pub fn player_vs_team(&self, player_id: u32, team: &str) -> Result<VsTeamStats, ApiError> {
        self.get_json(
            "player_vs_team",
            player_vs_team_url(&self.base, player_id, team),
        )
    }

    pub fn player_trend(
        &self,
        player_id: u32,
        stat: StatCategory,
        threshold: f64,
    ) -> Result<TrendResult, ApiError> {
        self.get_json(
            "player_trend",
            player_trend_url(&self.base, player_id, stat, threshold),
        )
    }

    pub fn predict_match(
        &self,
        home: &str,
        away: &str,
        home_missing: Option<&[u32]>,
        away_missing: Option<&[u32]>,
    ) -> Result<InteractiveMatchPrediction, ApiError> {
        self.get_json(
            "predict_match",
            predict_match_url(&self.base, home, away, home_missing, away_missing),
        )
    }

    pub fn predict_match_legacy(
        &self,
        home: &str,
        away: &str,
        home_star_missing: bool,
        away_star_missing: bool,
    ) -> Result<MatchPrediction, ApiError> {
        self.get_json(
            "predict_match_legacy",
            predict_match_legacy_url(&self.base, home, away, home_star_missing, away_star_missing),
        )
    }

    pub fn predict_player(&self, player_id: u32, team: &str) -> Result<PlayerProjection, ApiError> {
        self.get_json(
            "predict_player",
            predict_player_url(&self.base, player_id, team),
        )
    }

    pub fn missing_player_impact(
        &self,
        team: &str,
        player_id: u32,
    ) -> Result<MissingPlayerImpact, ApiError> {
        self.get_json(
            "missing_player_impact",
            missing_player_impact_url(&self.base, team, player_id),
        )
    }

    fn fetch_body(&self, endpoint: &'static str, url: Url) -> Result<String, ApiError> {
        debug!(endpoint, %url, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .map_err(|source| ApiError::Transport { endpoint, source })?;
        let status = resp.status();
        if !status.is_success() {
            warn!(endpoint, %status, "non-success response");
            return Err(ApiError::Status { endpoint, status });
        }
        resp.text()
            .map_err(|source| ApiError::Transport { endpoint, source })
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str, url: Url) -> Result<T, ApiError> {
        let body = self.fetch_body(endpoint, url)?;
        parse_json(endpoint, &body)
    }

    fn get_list<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: Url,
    ) -> Result<Vec<T>, ApiError> {
        let body = self.fetch_body(endpoint, url)?;
        parse_list_json(endpoint, &body)
    }
}

pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|_| ApiError::InvalidBaseUrl {
        url: trimmed.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl {
            url: trimmed.to_string(),
        });
    }
    Ok(url)
}

pub fn parse_json<T: DeserializeOwned>(endpoint: &'static str, raw: &str) -> Result<T, ApiError> {
    serde_json::from_str(raw.trim()).map_err(|source| ApiError::Decode { endpoint, source })
}

/// Like [`parse_json`], but an empty body or `null` is an empty list.
pub fn parse_list_json<T: DeserializeOwned>(
    endpoint: &'static str,
    raw: &str,
) -> Result<Vec<T>, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    parse_json(endpoint, trimmed)
}

fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    // Bases are validated by `parse_base_url`, so they always have a path.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty();
        path.extend(segments.iter().map(|s| s.trim()));
    }
    url
}

pub fn games_today_url(base: &Url) -> Url {
    endpoint_url(base, &["games", "today"])
}

pub fn games_30h_url(base: &Url) -> Url {
    endpoint_url(base, &["games", "30h"])
}

pub fn search_players_url(base: &Url, query: &str) -> Url {
    let mut url = endpoint_url(base, &["players", "search"]);
    url.query_pairs_mut().append_pair("query", query.trim());
    url
}

pub fn team_roster_url(base: &Url, team: &str) -> Url {
    endpoint_url(base, &["team", team, "roster"])
}

pub fn player_season_url(base: &Url, player_id: u32) -> Url {
    endpoint_url(base, &["player", &player_id.to_string(), "season"])
}

pub fn player_recent_url(base: &Url, player_id: u32, limit: Option<u32>) -> Url {
    let mut url = endpoint_url(base, &["player", &player_id.to_string(), "recent"]);
    if let Some(limit) = limit.filter(|l| *l > 0) {
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
    }
    url
}

pub fn player_vs_team_url(base: &Url, player_id: u32, team: &str) -> Url {
    endpoint_url(base, &["player", &player_id.to_string(), "vs", team])
}

pub fn player_trend_url(base: &Url, player_id: u32, stat: StatCategory, threshold: f64) -> Url {
    let mut url = endpoint_url(base, &["player", &player_id.to_string(), "trend"]);
    url.query_pairs_mut()
        .append_pair("stat", stat.as_param())
        .append_pair("threshold", &threshold.to_string());
    url
}

pub fn predict_match_url(
    base: &Url,
    home: &str,
    away: &str,
    home_missing: Option<&[u32]>,
    away_missing: Option<&[u32]>,
) -> Url {
    let mut url = endpoint_url(base, &["predict", "match", home, away]);
    let home_missing = home_missing.filter(|ids| !ids.is_empty());
    let away_missing = away_missing.filter(|ids| !ids.is_empty());
    if home_missing.is_some() || away_missing.is_some() {
        let mut query = url.query_pairs_mut();
        for id in home_missing.unwrap_or_default() {
            query.append_pair("home_missing_players", &id.to_string());
        }
        for id in away_missing.unwrap_or_default() {
            query.append_pair("away_missing_players", &id.to_string());
        }
    }
    url
}

pub fn predict_match_legacy_url(
    base: &Url,
    home: &str,
    away: &str,
    home_star_missing: bool,
    away_star_missing: bool,
) -> Url {
    let mut url = endpoint_url(base, &["predict", "match", home, away]);
    if home_star_missing || away_star_missing {
        let mut query = url.query_pairs_mut();
        if home_star_missing {
            query.append_pair("home_star_missing", "true");
        }
        if away_star_missing {
            query.append_pair("away_star_missing", "true");
        }
    }
    url
}

pub fn predict_player_url(base: &Url, player_id: u32, team: &str) -> Url {
    endpoint_url(base, &["predict", "player", &player_id.to_string(), "vs", team])
}

pub fn missing_player_impact_url(base: &Url, team: &str, player_id: u32) -> Url {
    endpoint_url(
        base,
        &["analytics", "team", team, "missing-player", &player_id.to_string()],
    )
}
