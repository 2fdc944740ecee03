use crate::api_error::ApiError;
use crate::api_fetch::ApiClient;
use crate::api_types::{
    Game, GameLog, InteractiveMatchPrediction, MatchPrediction, MissingPlayerImpact, Player,
    PlayerProjection, RosterEntry, SeasonStats, StatCategory, TrendResult, VsTeamStats,
};
use crate::query_cache::QueryKey;
use crate::selection::ids_key;

/// One fetchable resource of the prediction API, with all of its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    GamesToday,
    Games30h,
    SearchPlayers {
        query: String,
    },
    TeamRoster {
        team: String,
    },
    PlayerSeason {
        player_id: u32,
    },
    PlayerRecent {
        player_id: u32,
        limit: Option<u32>,
    },
    PlayerVsTeam {
        player_id: u32,
        team: String,
    },
    PlayerTrend {
        player_id: u32,
        stat: StatCategory,
        threshold: f64,
    },
    PredictMatch {
        home: String,
        away: String,
        home_missing: Vec<u32>,
        away_missing: Vec<u32>,
    },
    PredictMatchLegacy {
        home: String,
        away: String,
        home_star_missing: bool,
        away_star_missing: bool,
    },
    PredictPlayer {
        player_id: u32,
        team: String,
    },
    MissingPlayerImpact {
        team: String,
        player_id: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Games(Vec<Game>),
    Players(Vec<Player>),
    Roster(Vec<RosterEntry>),
    Season(SeasonStats),
    Recent(Vec<GameLog>),
    VsTeam(VsTeamStats),
    Trend(TrendResult),
    Prediction(InteractiveMatchPrediction),
    LegacyPrediction(MatchPrediction),
    Projection(PlayerProjection),
    Impact(MissingPlayerImpact),
}

impl Query {
    pub fn predict_match(home: &str, away: &str, home_missing: &[u32], away_missing: &[u32]) -> Self {
        let mut home_missing = home_missing.to_vec();
        let mut away_missing = away_missing.to_vec();
        home_missing.sort_unstable();
        away_missing.sort_unstable();
        Query::PredictMatch {
            home: home.to_string(),
            away: away.to_string(),
            home_missing,
            away_missing,
        }
    }

    /// Key prefix shared by every match prediction for one pairing, whatever
    /// the missing players.
    pub fn predict_prefix(home: &str, away: &str) -> String {
        format!("predict:{home}:{away}:")
    }

    /// Deterministic cache key over every parameter of the request.
    pub fn key(&self) -> QueryKey {
        let raw = match self {
            Query::GamesToday => "games:today".to_string(),
            Query::Games30h => "games:30h".to_string(),
            Query::SearchPlayers { query } => {
                format!("players:search:{}", query.trim().to_ascii_lowercase())
            }
            Query::TeamRoster { team } => format!("roster:{team}"),
            Query::PlayerSeason { player_id } => format!("player:{player_id}:season"),
            Query::PlayerRecent { player_id, limit } => match limit {
                Some(limit) => format!("player:{player_id}:recent:{limit}"),
                None => format!("player:{player_id}:recent"),
            },
            Query::PlayerVsTeam { player_id, team } => format!("player:{player_id}:vs:{team}"),
            Query::PlayerTrend {
                player_id,
                stat,
                threshold,
            } => format!("player:{player_id}:trend:{}:{threshold}", stat.as_param()),
            Query::PredictMatch {
                home,
                away,
                home_missing,
                away_missing,
            } => format!(
                "predict:{home}:{away}:h={}:a={}",
                ids_key(home_missing),
                ids_key(away_missing)
            ),
            Query::PredictMatchLegacy {
                home,
                away,
                home_star_missing,
                away_star_missing,
            } => format!("predict-legacy:{home}:{away}:{home_star_missing}:{away_star_missing}"),
            Query::PredictPlayer { player_id, team } => format!("predict-player:{player_id}:{team}"),
            Query::MissingPlayerImpact { team, player_id } => format!("impact:{team}:{player_id}"),
        };
        QueryKey::new(raw)
    }

    pub fn execute(&self, api: &ApiClient) -> Result<Payload, ApiError> {
        let payload = match self {
            Query::GamesToday => Payload::Games(api.games_today()?),
            Query::Games30h => Payload::Games(api.games_30h()?),
            Query::SearchPlayers { query } => Payload::Players(api.search_players(query)?),
            Query::TeamRoster { team } => Payload::Roster(api.team_roster(team)?),
            Query::PlayerSeason { player_id } => Payload::Season(api.player_season(*player_id)?),
            Query::PlayerRecent { player_id, limit } => {
                Payload::Recent(api.player_recent(*player_id, *limit)?)
            }
            Query::PlayerVsTeam { player_id, team } => {
                Payload::VsTeam(api.player_vs_team(*player_id, team)?)
            }
            Query::PlayerTrend {
                player_id,
                stat,
                threshold,
            } => Payload::Trend(api.player_trend(*player_id, *stat, *threshold)?),
            Query::PredictMatch {
                home,
                away,
                home_missing,
                away_missing,
            } => Payload::Prediction(api.predict_match(
                home,
                away,
                Some(home_missing.as_slice()),
                Some(away_missing.as_slice()),
            )?),
            Query::PredictMatchLegacy {
                home,
                away,
                home_star_missing,
                away_star_missing,
            } => Payload::LegacyPrediction(api.predict_match_legacy(
                home,
                away,
                *home_star_missing,
                *away_star_missing,
            )?),
            Query::PredictPlayer { player_id, team } => {
                Payload::Projection(api.predict_player(*player_id, team)?)
            }
            Query::MissingPlayerImpact { team, player_id } => {
                Payload::Impact(api.missing_player_impact(team, *player_id)?)
            }
        };
        Ok(payload)
    }
}

impl Payload {
    pub fn as_games(&self) -> Option<&[Game]> {
        match self {
            Payload::Games(games) => Some(games.as_slice()),
            _ => None,
        }
    }

    pub fn as_players(&self) -> Option<&[Player]> {
        match self {
            Payload::Players(players) => Some(players.as_slice()),
            _ => None,
        }
    }

    pub fn as_roster(&self) -> Option<&[RosterEntry]> {
        match self {
            Payload::Roster(roster) => Some(roster.as_slice()),
            _ => None,
        }
    }

    pub fn as_season(&self) -> Option<&SeasonStats> {
        match self {
            Payload::Season(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_recent(&self) -> Option<&[GameLog]> {
        match self {
            Payload::Recent(logs) => Some(logs.as_slice()),
            _ => None,
        }
    }

    pub fn as_vs_team(&self) -> Option<&VsTeamStats> {
        match self {
            Payload::VsTeam(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn as_trend(&self) -> Option<&TrendResult> {
        match self {
            Payload::Trend(trend) => Some(trend),
            _ => None,
        }
    }

    pub fn as_prediction(&self) -> Option<&InteractiveMatchPrediction> {
        match self {
            Payload::Prediction(prediction) => Some(prediction),
            _ => None,
        }
    }

    pub fn as_legacy_prediction(&self) -> Option<&MatchPrediction> {
        match self {
            Payload::LegacyPrediction(prediction) => Some(prediction),
            _ => None,
        }
    }

    pub fn as_projection(&self) -> Option<&PlayerProjection> {
        match self {
            Payload::Projection(projection) => Some(projection),
            _ => None,
        }
    }

    pub fn as_impact(&self) -> Option<&MissingPlayerImpact> {
        match self {
            Payload::Impact(impact) => Some(impact),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_key_ignores_click_order() {
        let a = Query::predict_match("LAL", "BOS", &[3, 1], &[]);
        let b = Query::predict_match("LAL", "BOS", &[1, 3], &[]);
        assert_eq!(a.key(), b.key());
        assert_eq!(a.key().as_str(), "predict:LAL:BOS:h=1,3:a=");
    }

    #[test]
    fn predict_key_separates_sides() {
        let home = Query::predict_match("LAL", "BOS", &[7], &[]);
        let away = Query::predict_match("LAL", "BOS", &[], &[7]);
        assert_ne!(home.key(), away.key());
    }

    #[test]
    fn search_key_normalizes_case() {
        let a = Query::SearchPlayers {
            query: " LeBron ".to_string(),
        };
        let b = Query::SearchPlayers {
            query: "lebron".to_string(),
        };
        assert_eq!(a.key(), b.key());
    }
}
