use std::time::Duration;

use nba_insights::api_types::{Game, InteractiveMatchPrediction, Player, RosterEntry};
use nba_insights::query::{Payload, Query};
use nba_insights::query_cache::{QueryKey, QueryStatus};
use nba_insights::selection::Side;
use nba_insights::state::{
    AppState, Delta, GamesFeed, InputTarget, PlayerTab, ProviderCommand, Screen, age_label,
    apply_delta, games_by_date,
};

fn game(id: &str, home: &str, away: &str, date: &str) -> Game {
    Game {
        game_id: id.to_string(),
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_team_id: None,
        away_team_id: None,
        game_date: date.to_string(),
        time: "19:30".to_string(),
        is_live: false,
        home_score: None,
        away_score: None,
        status: "Scheduled".to_string(),
    }
}

fn fetches(commands: Vec<ProviderCommand>) -> Vec<(String, ProviderCommand)> {
    commands
        .into_iter()
        .map(|cmd| {
            let ProviderCommand::Fetch { ticket, .. } = &cmd;
            (ticket.key.as_str().to_string(), cmd)
        })
        .collect()
}

fn respond(state: &mut AppState, cmd: ProviderCommand, result: Result<Payload, String>) {
    let ProviderCommand::Fetch { ticket, .. } = cmd;
    apply_delta(state, Delta::QueryResolved { ticket, result });
}

fn take(list: &mut Vec<(String, ProviderCommand)>, key: &str) -> ProviderCommand {
    let idx = list
        .iter()
        .position(|(k, _)| k == key)
        .unwrap_or_else(|| panic!("no fetch for {key}"));
    list.remove(idx).1
}

fn loaded_games_state() -> AppState {
    let mut state = AppState::new();
    let mut cmds = fetches(state.sync_queries());
    let games = vec![
        game("1", "Los Angeles Lakers", "Boston Celtics", "2025-11-02"),
        game("2", "Golden State Warriors", "Denver Nuggets", "2025-11-02"),
        game("3", "Miami Heat", "New York Knicks", "2025-11-03"),
    ];
    respond(&mut state, take(&mut cmds, "games:30h"), Ok(Payload::Games(games)));
    state
}

#[test]
fn games_list_is_requested_on_start() {
    let mut state = AppState::new();
    let cmds = fetches(state.sync_queries());
    assert_eq!(cmds.len(), 1);
    assert_eq!(cmds[0].0, "games:30h");
    assert!(state.sync_queries().is_empty());
}

#[test]
fn games_group_by_date_in_order() {
    let state = loaded_games_state();
    let groups = games_by_date(state.games());
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, "2025-11-02");
    assert_eq!(groups[0].1.len(), 2);
    assert_eq!(groups[1].1[0].game_id, "3");
}

#[test]
fn toggling_feed_requests_today() {
    let mut state = loaded_games_state();
    state.toggle_games_feed();
    assert_eq!(state.games_feed, GamesFeed::Today);
    assert!(state.games().is_empty());
    let cmds = fetches(state.sync_queries());
    assert_eq!(cmds[0].0, "games:today");
}

#[test]
fn stale_games_response_is_ignored() {
    let mut state = loaded_games_state();
    let first = state.refresh_games().expect("refresh should start");
    // Already loading: no second request.
    assert!(state.refresh_games().is_none());

    let ProviderCommand::Fetch { ticket, .. } = &first;
    let mut stale = ticket.clone();
    stale.fetch_id = 0;
    apply_delta(
        &mut state,
        Delta::QueryResolved {
            ticket: stale,
            result: Ok(Payload::Games(Vec::new())),
        },
    );
    assert_eq!(state.games().len(), 3);

    respond(
        &mut state,
        first,
        Ok(Payload::Games(vec![game("9", "Utah Jazz", "Phoenix Suns", "2025-11-04")])),
    );
    assert_eq!(state.games().len(), 1);
}

#[test]
fn failed_refresh_keeps_games_and_logs() {
    let mut state = loaded_games_state();
    let cmd = state.refresh_games().expect("refresh should start");
    respond(&mut state, cmd, Err("games_30h request failed".to_string()));
    assert_eq!(state.games().len(), 3);
    assert_eq!(state.query_status(&Query::Games30h), Some(QueryStatus::Error));
    assert!(state.logs.back().is_some_and(|l| l.starts_with("[WARN]")));
}

#[test]
fn open_simulator_uses_team_codes() {
    let mut state = loaded_games_state();
    assert!(state.open_simulator());
    assert_eq!(state.screen, Screen::Simulator);
    let matchup = state.simulator.matchup().expect("matchup should be set");
    assert_eq!(matchup.home, "LAL");
    assert_eq!(matchup.away, "BOS");

    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["predict:LAL:BOS:h=:a=", "roster:LAL", "roster:BOS"]);
}

#[test]
fn simulator_rows_merge_roster_and_projection() {
    let mut state = loaded_games_state();
    state.open_simulator();
    let mut cmds = fetches(state.sync_queries());
    let baseline: InteractiveMatchPrediction = serde_json::from_value(serde_json::json!({
        "home_players": [{"player_id": 2544, "player": "LeBron James",
                          "predicted_stats": {"PTS": 25.0}}],
        "predicted_margin": 2.0
    }))
    .expect("valid prediction");
    respond(
        &mut state,
        take(&mut cmds, "predict:LAL:BOS:h=:a="),
        Ok(Payload::Prediction(baseline)),
    );
    respond(
        &mut state,
        take(&mut cmds, "roster:LAL"),
        Ok(Payload::Roster(vec![
            RosterEntry {
                id: 2544,
                name: "LeBron James".to_string(),
                team: "LAL".to_string(),
            },
            RosterEntry {
                id: 1630559,
                name: "Austin Reaves".to_string(),
                team: "LAL".to_string(),
            },
        ])),
    );

    let rows = state.sim_rows(Side::Home);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].projection.as_ref().map(|p| p.predicted_stats.pts), Some(25.0));
    assert!(rows[1].projection.is_none());

    state.start_input(InputTarget::RosterFilter);
    for ch in "reav".chars() {
        state.input_push(ch);
    }
    let rows = state.sim_rows(Side::Home);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entry.id, 1630559);

    assert!(state.sim_toggle_current());
    assert!(state.sim_rows(Side::Home)[0].absent);
    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["predict:LAL:BOS:h=1630559:a="]);

    state.input_push('z');
    assert!(state.sim_rows(Side::Home).is_empty());
    assert!(!state.sim_toggle_current());
}

#[test]
fn retry_refetches_only_failed_requests() {
    let mut state = loaded_games_state();
    state.open_simulator();
    let mut cmds = fetches(state.sync_queries());
    respond(
        &mut state,
        take(&mut cmds, "predict:LAL:BOS:h=:a="),
        Err("predict_match request failed (HTTP 503 Service Unavailable)".to_string()),
    );
    assert!(state.sync_queries().is_empty());

    let retried = fetches(state.retry());
    assert_eq!(retried.len(), 1);
    assert_eq!(retried[0].0, "predict:LAL:BOS:h=:a=");

    // The roster fetches are still in flight, nothing else to retry.
    assert!(state.retry().is_empty());
}

#[test]
fn quick_prediction_uses_legacy_flags() {
    let mut state = loaded_games_state();
    state.open_quick_prediction();
    state.toggle_quick_flag(Side::Away);
    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["predict-legacy:LAL:BOS:false:true"]);
}

#[test]
fn player_screen_requests_follow_inputs() {
    let mut state = AppState::new();
    let mut cmds = fetches(state.sync_queries());
    take(&mut cmds, "games:30h");

    state.start_input(InputTarget::PlayerSearch);
    for ch in "Tatum".chars() {
        state.input_push(ch);
    }
    state.input_submit();
    assert_eq!(state.screen, Screen::Player);
    let mut cmds = fetches(state.sync_queries());
    let search = take(&mut cmds, "players:search:tatum");
    respond(
        &mut state,
        search,
        Ok(Payload::Players(vec![Player {
            id: 1628369,
            full_name: "Jayson Tatum".to_string(),
            first_name: "Jayson".to_string(),
            last_name: "Tatum".to_string(),
            is_active: true,
            team: Some("BOS".to_string()),
        }])),
    );

    assert!(state.open_selected_player());
    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["player:1628369:season", "player:1628369:recent:5"]);

    state.start_input(InputTarget::VsTeam);
    for ch in "knicks".chars() {
        state.input_push(ch);
    }
    state.input_submit();
    state.start_input(InputTarget::TrendThreshold);
    for ch in "24.5".chars() {
        state.input_push(ch);
    }
    state.input_submit();
    let view = state.player.as_ref().expect("player view");
    assert_eq!(view.vs_team.as_deref(), Some("NYK"));
    assert_eq!(view.tab, PlayerTab::Trend);

    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(
        keys,
        vec![
            "player:1628369:vs:NYK",
            "player:1628369:trend:PTS:24.5",
            "predict-player:1628369:NYK",
        ]
    );
}

#[test]
fn invalid_threshold_is_rejected() {
    let mut state = AppState::new();
    state.start_input(InputTarget::TrendThreshold);
    state.input_push('x');
    state.input_submit();
    assert!(state.input.is_none());
    assert!(state.logs.back().is_some_and(|l| l.contains("Invalid threshold")));
}

#[test]
fn log_is_capped() {
    let mut state = AppState::new();
    for i in 0..250 {
        apply_delta(&mut state, Delta::Log(format!("[INFO] {i}")));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.front().map(String::as_str), Some("[INFO] 50"));
}

#[test]
fn switching_matchup_forgets_previous_predictions() {
    let mut state = loaded_games_state();
    state.open_matchup("LAL", "BOS");
    let mut cmds = fetches(state.sync_queries());
    let baseline = take(&mut cmds, "predict:LAL:BOS:h=:a=");

    state.open_matchup("GSW", "DEN");
    let baseline_key = QueryKey::new("predict:LAL:BOS:h=:a=");
    assert!(state.cache.get(&baseline_key).is_none());
    assert!(state.cache.get(&QueryKey::new("roster:LAL")).is_some());

    // The old pairing's answer arrives late and is not stored.
    respond(
        &mut state,
        baseline,
        Ok(Payload::Prediction(InteractiveMatchPrediction::default())),
    );
    assert!(state.cache.get(&baseline_key).is_none());

    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert!(keys.contains(&"predict:GSW:DEN:h=:a=".to_string()));

    state.open_matchup("LAL", "BOS");
    let keys: Vec<String> = fetches(state.sync_queries())
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec!["predict:LAL:BOS:h=:a="]);
}

#[test]
fn reopening_same_matchup_keeps_cache() {
    let mut state = loaded_games_state();
    state.open_matchup("LAL", "BOS");
    let mut cmds = fetches(state.sync_queries());
    respond(
        &mut state,
        take(&mut cmds, "predict:LAL:BOS:h=:a="),
        Ok(Payload::Prediction(InteractiveMatchPrediction::default())),
    );
    state.open_matchup("lal", "bos");
    assert!(state.sim_display().is_some());
    assert!(state.sync_queries().is_empty());
}

#[test]
fn games_header_age() {
    assert!(AppState::new().games_updated_at().is_none());
    assert!(loaded_games_state().games_updated_at().is_some());
    assert_eq!(age_label(Duration::from_secs(12)), "updated 12s ago");
    assert_eq!(age_label(Duration::from_secs(125)), "updated 2m ago");
    assert_eq!(age_label(Duration::from_secs(7300)), "updated 2h ago");
}
