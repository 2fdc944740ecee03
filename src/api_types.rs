use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Response shapes of the prediction API. Fields the server may omit default
// to zero/blank so a partial payload still renders.

/// Scheduled or live game. `/games/30h` answers in camelCase, `/games/today`
/// in snake_case; both land here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(alias = "game_id")]
    pub game_id: String,
    #[serde(alias = "home_team")]
    pub home_team: String,
    #[serde(alias = "away_team")]
    pub away_team: String,
    #[serde(default, alias = "home_team_id")]
    pub home_team_id: Option<String>,
    #[serde(default, alias = "away_team_id")]
    pub away_team_id: Option<String>,
    #[serde(default, alias = "game_date")]
    pub game_date: String,
    #[serde(default, alias = "game_time")]
    pub time: String,
    #[serde(default, alias = "is_live")]
    pub is_live: bool,
    #[serde(default, alias = "home_score")]
    pub home_score: Option<u32>,
    #[serde(default, alias = "away_score")]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub full_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub team: Option<String>,
}

/// One selectable player of a team roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(alias = "player_id")]
    pub id: u32,
    #[serde(alias = "full_name", alias = "player")]
    pub name: String,
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SeasonStats {
    pub player_id: u32,
    pub gp: f64,
    pub min: f64,
    pub pts: f64,
    pub ast: f64,
    pub reb: f64,
    pub stl: f64,
    pub blk: f64,
    pub fg3m: f64,
    pub pra: f64,
    pub pa: f64,
    pub pr: f64,
    pub ar: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct GameLog {
    pub game_date: String,
    pub matchup: String,
    pub wl: String,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
    pub min: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VsTeamStats {
    pub games_played: u32,
    pub avg_pts: f64,
    pub avg_reb: f64,
    pub avg_ast: f64,
    pub total_wins: u32,
    pub total_losses: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendResult {
    pub current_active_streak: u32,
    pub total_hits: u32,
    pub hit_rate_percent: f64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlowoutAnalysis {
    pub risk_level: RiskLevel,
}

/// Match prediction from the legacy star-missing flag convention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchPrediction {
    pub predicted_winner: String,
    pub win_probability_home: f64,
    pub predicted_margin: f64,
    pub predicted_total_points: f64,
    pub confidence_level: String,
    pub details: PredictionDetails,
    pub blowout_analysis: Option<BlowoutAnalysis>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionDetails {
    pub home_net_rtg: f64,
    pub away_net_rtg: f64,
    pub spread_raw: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictedStats {
    #[serde(rename = "MIN")]
    pub min: f64,
    #[serde(rename = "PTS")]
    pub pts: f64,
    #[serde(rename = "REB")]
    pub reb: f64,
    #[serde(rename = "AST")]
    pub ast: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedMetrics {
    #[serde(rename = "PRA")]
    pub pra: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerContext {
    pub boost_applied: Option<String>,
}

/// Per-player projection inside a match prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerFullPrediction {
    pub player_id: u32,
    #[serde(default)]
    pub player: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub predicted_stats: PredictedStats,
    #[serde(default)]
    pub advanced_metrics_projected: AdvancedMetrics,
    #[serde(default)]
    pub blowout_analysis: BlowoutAnalysis,
    #[serde(default)]
    pub context: Option<PlayerContext>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchContext {
    pub home_usage_boost: f64,
    pub away_usage_boost: f64,
    #[serde(alias = "home_penalty")]
    pub home_missing_penalty: f64,
    #[serde(alias = "away_penalty")]
    pub away_missing_penalty: f64,
}

/// Match prediction keyed by the missing-player sets it was computed for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveMatchPrediction {
    pub home_players: Vec<PlayerFullPrediction>,
    pub away_players: Vec<PlayerFullPrediction>,
    pub match_context: MatchContext,
    pub predicted_winner: Option<String>,
    pub predicted_margin: f64,
}

impl InteractiveMatchPrediction {
    pub fn all_players(&self) -> impl Iterator<Item = &PlayerFullPrediction> {
        self.home_players.iter().chain(self.away_players.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryGame {
    pub date: String,
    pub min: f64,
    pub pts: f64,
    pub reb: f64,
    pub ast: f64,
}

/// `/predict/player/{id}/vs/{team}`: the projection plus the history it was
/// derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProjection {
    #[serde(flatten)]
    pub prediction: PlayerFullPrediction,
    #[serde(default)]
    pub recent_form: Vec<HistoryGame>,
    #[serde(default)]
    pub h2h_history: Vec<HistoryGame>,
}

/// Absence impact report. Only the identifying fields are typed; the rest
/// of the analysis is kept as-is for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingPlayerImpact {
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub player_id: Option<u32>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Value>,
}

/// Stat column a trend or betting line refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatCategory {
    #[default]
    Pts,
    Reb,
    Ast,
    Fg3m,
    Pra,
    Pr,
    Pa,
    Ar,
}

impl StatCategory {
    pub const ALL: [StatCategory; 8] = [
        StatCategory::Pts,
        StatCategory::Reb,
        StatCategory::Ast,
        StatCategory::Fg3m,
        StatCategory::Pra,
        StatCategory::Pr,
        StatCategory::Pa,
        StatCategory::Ar,
    ];

    pub fn as_param(self) -> &'static str {
        match self {
            StatCategory::Pts => "PTS",
            StatCategory::Reb => "REB",
            StatCategory::Ast => "AST",
            StatCategory::Fg3m => "FG3M",
            StatCategory::Pra => "PRA",
            StatCategory::Pr => "PR",
            StatCategory::Pa => "PA",
            StatCategory::Ar => "AR",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Projected value of this stat, when the projection carries it.
    pub fn projection(self, player: &PlayerFullPrediction) -> Option<f64> {
        let stats = &player.predicted_stats;
        match self {
            StatCategory::Pts => Some(stats.pts),
            StatCategory::Reb => Some(stats.reb),
            StatCategory::Ast => Some(stats.ast),
            StatCategory::Pra => Some(player.advanced_metrics_projected.pra),
            StatCategory::Pr => Some(stats.pts + stats.reb),
            StatCategory::Pa => Some(stats.pts + stats.ast),
            StatCategory::Ar => Some(stats.ast + stats.reb),
            StatCategory::Fg3m => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLean {
    Over,
    Under,
    Push,
}

/// Difference between a projection and a bookmaker line, and which side of
/// the line it leans to.
pub fn line_edge(projection: f64, line: f64) -> (f64, LineLean) {
    let edge = projection - line;
    let lean = if edge.abs() < 0.05 {
        LineLean::Push
    } else if edge > 0.0 {
        LineLean::Over
    } else {
        LineLean::Under
    };
    (edge, lean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_risk_level_falls_back() {
        let parsed: BlowoutAnalysis =
            serde_json::from_str(r#"{"risk_level":"EXTREME"}"#).expect("valid json");
        assert_eq!(parsed.risk_level, RiskLevel::Unknown);
        let parsed: BlowoutAnalysis =
            serde_json::from_str(r#"{"risk_level":"HIGH"}"#).expect("valid json");
        assert_eq!(parsed.risk_level, RiskLevel::High);
    }

    #[test]
    fn line_edge_leans() {
        let (edge, lean) = line_edge(24.6, 22.5);
        assert!((edge - 2.1).abs() < 1e-9);
        assert_eq!(lean, LineLean::Over);
        assert_eq!(line_edge(20.0, 22.5).1, LineLean::Under);
        assert_eq!(line_edge(22.5, 22.5).1, LineLean::Push);
    }

    #[test]
    fn stat_cycle_wraps() {
        let mut stat = StatCategory::Pts;
        for _ in 0..StatCategory::ALL.len() {
            stat = stat.next();
        }
        assert_eq!(stat, StatCategory::Pts);
    }
}
