use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use nba_insights::api_fetch::{parse_json, parse_list_json};
use nba_insights::api_types::{Game, InteractiveMatchPrediction, RosterEntry};
use nba_insights::query::{Payload, Query};
use nba_insights::query_cache::QueryCache;
use nba_insights::selection::{Side, filter_roster};
use nba_insights::simulator::MatchSimulator;
use nba_insights::state::games_by_date;

fn sample_roster(team: &str, size: u32) -> Vec<RosterEntry> {
    (0..size)
        .map(|i| RosterEntry {
            id: 1_600_000 + i,
            name: format!("Player {i} {team}"),
            team: team.to_string(),
        })
        .collect()
}

fn bench_prediction_parse(c: &mut Criterion) {
    c.bench_function("prediction_parse", |b| {
        b.iter(|| {
            let pred: InteractiveMatchPrediction =
                parse_json("predict_match", black_box(PREDICTION_JSON)).unwrap();
            black_box(pred.home_players.len());
        })
    });
}

fn bench_games_parse_and_group(c: &mut Criterion) {
    c.bench_function("games_parse_and_group", |b| {
        b.iter(|| {
            let games: Vec<Game> = parse_list_json("games_30h", black_box(GAMES_JSON)).unwrap();
            black_box(games_by_date(&games).len());
        })
    });
}

fn bench_adjusted_key(c: &mut Criterion) {
    let missing: Vec<u32> = (0..8).rev().map(|i| 1_600_000 + i).collect();
    c.bench_function("adjusted_key", |b| {
        b.iter(|| {
            let query = Query::predict_match("GSW", "LAL", black_box(&missing), &[2544]);
            black_box(query.key());
        })
    });
}

fn bench_simulator_sync(c: &mut Criterion) {
    let mut sim = MatchSimulator::new();
    let mut cache: QueryCache<Payload> = QueryCache::new();
    sim.open("GSW", "LAL");
    for (ticket, query) in sim.sync(&mut cache) {
        let payload = match query {
            Query::TeamRoster { team } => Payload::Roster(sample_roster(&team, 17)),
            _ => Payload::Prediction(InteractiveMatchPrediction::default()),
        };
        cache.resolve(&ticket, Ok::<_, String>(payload));
    }
    for id in [1_600_003, 1_600_007, 1_600_011] {
        sim.mark_absent(Side::Home, id, &cache);
    }

    c.bench_function("simulator_sync", |b| {
        b.iter(|| {
            let fetches = sim.sync(&mut cache);
            black_box(fetches.len());
            black_box(sim.display(&cache).is_some());
        })
    });
}

fn bench_roster_filter(c: &mut Criterion) {
    let roster = sample_roster("BOS", 400);
    c.bench_function("roster_filter", |b| {
        b.iter(|| black_box(filter_roster(&roster, black_box("er 3")).len()))
    });
}

criterion_group!(
    perf,
    bench_prediction_parse,
    bench_games_parse_and_group,
    bench_adjusted_key,
    bench_simulator_sync,
    bench_roster_filter
);
criterion_main!(perf);

static PREDICTION_JSON: &str = include_str!("../tests/fixtures/predict_gsw_lal.json");
static GAMES_JSON: &str = include_str!("../tests/fixtures/games_30h.json");
