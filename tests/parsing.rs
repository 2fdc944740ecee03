use std::fs;
use std::path::PathBuf;

use nba_insights::api_fetch::{parse_json, parse_list_json};
use nba_insights::api_types::{
    Game, InteractiveMatchPrediction, MatchPrediction, MissingPlayerImpact, PlayerProjection,
    RiskLevel, StatCategory,
};
use nba_insights::selection::Side;
use nba_insights::simulator::{
    has_high_blowout_risk, missing_penalty, usage_boost, usage_boost_label,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_camel_case_games_fixture() {
    let raw = read_fixture("games_30h.json");
    let games: Vec<Game> = parse_list_json("games_30h", &raw).expect("fixture should parse");
    assert_eq!(games.len(), 3);
    assert_eq!(games[0].game_id, "0022500123");
    assert_eq!(games[0].home_team_id.as_deref(), Some("LAL"));
    assert!(games[0].is_live);
    assert_eq!(games[0].home_score, Some(54));
    assert!(!games[2].is_live);
    assert_eq!(games[1].home_team_id, None);
}

#[test]
fn parses_snake_case_games_fixture() {
    let raw = read_fixture("games_today.json");
    let games: Vec<Game> = parse_list_json("games_today", &raw).expect("fixture should parse");
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].home_team, "Phoenix Suns");
    assert_eq!(games[0].time, "21:00");
    assert_eq!(games[0].home_score, None);
}

#[test]
fn parses_interactive_prediction_fixture() {
    let raw = read_fixture("predict_gsw_lal.json");
    let pred: InteractiveMatchPrediction =
        parse_json("predict_match", &raw).expect("fixture should parse");
    assert_eq!(pred.home_players.len(), 2);
    assert_eq!(pred.home_players[0].predicted_stats.pts, 27.4);
    assert_eq!(pred.home_players[0].advanced_metrics_projected.pra, 37.9);
    assert_eq!(pred.away_players[0].blowout_analysis.risk_level, RiskLevel::Unknown);
    assert_eq!(pred.predicted_winner.as_deref(), Some("GSW"));

    assert!(has_high_blowout_risk(&pred));
    assert_eq!(usage_boost(&pred, Side::Home), None);
    assert_eq!(usage_boost(&pred, Side::Away), Some(6.0));
    assert_eq!(usage_boost_label(6.0), "+6.0%");
    assert_eq!(usage_boost_label(12.5), "+12.5%");
    assert_eq!(missing_penalty(&pred, Side::Away), 2.5);
}

#[test]
fn prediction_with_missing_sections_defaults() {
    let pred: InteractiveMatchPrediction =
        parse_json("predict_match", "{}").expect("empty object should parse");
    assert!(pred.home_players.is_empty());
    assert!(pred.predicted_winner.is_none());
    assert!(!has_high_blowout_risk(&pred));
    assert_eq!(usage_boost(&pred, Side::Home), None);
}

#[test]
fn parses_legacy_prediction_fixture() {
    let raw = read_fixture("predict_legacy.json");
    let pred: MatchPrediction = parse_json("predict_match", &raw).expect("fixture should parse");
    assert_eq!(pred.predicted_winner, "BOS");
    assert_eq!(pred.details.away_net_rtg, 6.4);
    assert_eq!(
        pred.blowout_analysis.map(|b| b.risk_level),
        Some(RiskLevel::Medium)
    );
}

#[test]
fn parses_player_projection_fixture() {
    let raw = read_fixture("player_projection.json");
    let proj: PlayerProjection = parse_json("predict_player", &raw).expect("fixture should parse");
    assert_eq!(proj.prediction.player_id, 1628369);
    assert_eq!(proj.recent_form.len(), 2);
    assert_eq!(proj.h2h_history[0].pts, 29.0);
    assert_eq!(StatCategory::Pr.projection(&proj.prediction), Some(36.0));
}

#[test]
fn impact_keeps_untyped_metrics() {
    let raw = read_fixture("missing_player_impact.json");
    let impact: MissingPlayerImpact =
        parse_json("missing_player_impact", &raw).expect("fixture should parse");
    assert_eq!(impact.team, "LAL");
    assert_eq!(impact.player_id, Some(2544));
    assert_eq!(impact.metrics.len(), 3);
    assert!(impact.metrics.contains_key("net_rating_delta"));
    assert!(!impact.metrics.contains_key("team"));
}

#[test]
fn malformed_body_is_a_decode_error() {
    let err = parse_json::<InteractiveMatchPrediction>("predict_match", "<html>502</html>")
        .unwrap_err();
    assert_eq!(err.endpoint(), Some("predict_match"));
    assert!(err.status().is_none());
}
