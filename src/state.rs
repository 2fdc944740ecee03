use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::api_types::{
    Game, GameLog, InteractiveMatchPrediction, MatchPrediction, MissingPlayerImpact, Player,
    PlayerFullPrediction, PlayerProjection, RosterEntry, SeasonStats, StatCategory, TrendResult,
    VsTeamStats,
};
use crate::query::{Payload, Query};
use crate::query_cache::{FetchTicket, QueryCache, QueryKey, QueryStatus};
use crate::selection::{Side, filter_roster};
use crate::simulator::MatchSimulator;
use crate::teams::resolve_team_code;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Games,
    Simulator,
    Player,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamesFeed {
    Next30h,
    Today,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerTab {
    Recent,
    VsTeam,
    Trend,
    Projection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    PlayerSearch,
    RosterFilter,
    VsTeam,
    TrendThreshold,
    BettingLine,
}

/// Legacy quick prediction: one star-missing flag per side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickPrediction {
    pub home: String,
    pub away: String,
    pub home_star_missing: bool,
    pub away_star_missing: bool,
}

impl QuickPrediction {
    pub fn query(&self) -> Query {
        Query::PredictMatchLegacy {
            home: self.home.clone(),
            away: self.away.clone(),
            home_star_missing: self.home_star_missing,
            away_star_missing: self.away_star_missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub player: Player,
    pub tab: PlayerTab,
    pub vs_team: Option<String>,
    pub trend_stat: StatCategory,
    pub trend_threshold: Option<f64>,
    pub line: Option<f64>,
}

/// One row of a simulator roster table.
#[derive(Debug, Clone, PartialEq)]
pub struct SimRow {
    pub entry: RosterEntry,
    pub absent: bool,
    pub projection: Option<PlayerFullPrediction>,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
    pub cache: QueryCache<Payload>,
    pub games_feed: GamesFeed,
    pub games_selected: usize,
    pub simulator: MatchSimulator,
    pub sim_side: Side,
    pub sim_cursor: [usize; 2],
    pub roster_filter: String,
    pub impact_target: Option<(String, u32)>,
    pub quick: Option<QuickPrediction>,
    pub search_query: Option<String>,
    pub search_selected: usize,
    pub player: Option<PlayerView>,
    pub input: Option<InputTarget>,
    pub input_buffer: String,
    pub recent_limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum Delta {
    QueryResolved {
        ticket: FetchTicket,
        result: Result<Payload, String>,
    },
    Log(String),
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    Fetch { ticket: FetchTicket, query: Query },
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Games,
            help_overlay: false,
            logs: VecDeque::with_capacity(200),
            cache: QueryCache::new(),
            games_feed: GamesFeed::Next30h,
            games_selected: 0,
            simulator: MatchSimulator::new(),
            sim_side: Side::Home,
            sim_cursor: [0; 2],
            roster_filter: String::new(),
            impact_target: None,
            quick: None,
            search_query: None,
            search_selected: 0,
            player: None,
            input: None,
            input_buffer: String::new(),
            recent_limit: Some(5),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    fn payload(&self, query: &Query) -> Option<&Payload> {
        self.cache.data(&query.key()).map(|p| p.as_ref())
    }

    pub fn query_status(&self, query: &Query) -> Option<QueryStatus> {
        self.cache.status(&query.key())
    }

    pub fn query_error(&self, query: &Query) -> Option<&str> {
        self.cache
            .get(&query.key())
            .and_then(|e| e.error.as_deref())
    }

    // Scoreboard

    pub fn games_query(&self) -> Query {
        match self.games_feed {
            GamesFeed::Next30h => Query::Games30h,
            GamesFeed::Today => Query::GamesToday,
        }
    }

    pub fn games(&self) -> &[Game] {
        self.payload(&self.games_query())
            .and_then(Payload::as_games)
            .unwrap_or_default()
    }

    /// When the current feed last came back from the API.
    pub fn games_updated_at(&self) -> Option<Instant> {
        self.cache.updated_at(&self.games_query().key())
    }

    pub fn selected_game(&self) -> Option<&Game> {
        self.games().get(self.games_selected)
    }

    pub fn toggle_games_feed(&mut self) {
        self.games_feed = match self.games_feed {
            GamesFeed::Next30h => GamesFeed::Today,
            GamesFeed::Today => GamesFeed::Next30h,
        };
        self.games_selected = 0;
    }

    pub fn select_next_game(&mut self) {
        let total = self.games().len();
        if total == 0 {
            self.games_selected = 0;
            return;
        }
        self.games_selected = (self.games_selected + 1) % total;
    }

    pub fn select_prev_game(&mut self) {
        let total = self.games().len();
        if total == 0 {
            self.games_selected = 0;
            return;
        }
        if self.games_selected == 0 {
            self.games_selected = total - 1;
        } else {
            self.games_selected -= 1;
        }
    }

    /// Re-requests the game list unless a request is already running.
    pub fn refresh_games(&mut self) -> Option<ProviderCommand> {
        let query = self.games_query();
        let key = query.key();
        if self.cache.is_loading(&key) {
            return None;
        }
        let ticket = self.cache.refetch(&key);
        Some(ProviderCommand::Fetch { ticket, query })
    }

    // Simulator

    pub fn open_simulator(&mut self) -> bool {
        let Some(game) = self.selected_game() else {
            self.push_log("[INFO] No game selected");
            return false;
        };
        let home = resolve_team_code(game.home_team_id.as_deref(), &game.home_team);
        let away = resolve_team_code(game.away_team_id.as_deref(), &game.away_team);
        self.open_matchup(&home, &away);
        true
    }

    pub fn open_matchup(&mut self, home: &str, away: &str) {
        let previous = self.simulator.matchup().cloned();
        if self.simulator.open(home, away) {
            if let Some(old) = previous {
                self.prune_matchup(&old.home, &old.away);
            }
            self.sim_side = Side::Home;
            self.sim_cursor = [0; 2];
            self.roster_filter.clear();
            self.impact_target = None;
        }
        self.screen = Screen::Simulator;
        info!(home, away, "simulator opened");
    }

    /// Forgets the predictions and absence impacts of a pairing the
    /// simulator has left. Rosters stay, they are shared across games.
    fn prune_matchup(&mut self, home: &str, away: &str) {
        let mut pruned = self.cache.prune_prefix(&Query::predict_prefix(home, away));
        let current = self.simulator.matchup().cloned();
        for team in [home, away] {
            let still_open = current
                .as_ref()
                .is_some_and(|m| m.home == team || m.away == team);
            if !still_open {
                pruned += self.cache.prune_prefix(&format!("impact:{team}:"));
            }
        }
        debug!(home, away, pruned, "previous matchup pruned");
    }

    pub fn sim_display(&self) -> Option<&InteractiveMatchPrediction> {
        self.simulator.display(&self.cache)
    }

    pub fn sim_rows(&self, side: Side) -> Vec<SimRow> {
        let roster = self.simulator.roster(side, &self.cache);
        let display = self.sim_display();
        let selection = self.simulator.selections().side(side);
        filter_roster(&roster, &self.roster_filter)
            .into_iter()
            .map(|entry| {
                let projection = display.and_then(|p| {
                    let players = match side {
                        Side::Home => &p.home_players,
                        Side::Away => &p.away_players,
                    };
                    players.iter().find(|pl| pl.player_id == entry.id).cloned()
                });
                SimRow {
                    entry: entry.clone(),
                    absent: selection.contains(entry.id),
                    projection,
                }
            })
            .collect()
    }

    fn side_index(side: Side) -> usize {
        match side {
            Side::Home => 0,
            Side::Away => 1,
        }
    }

    pub fn sim_cursor(&self, side: Side) -> usize {
        self.sim_cursor[Self::side_index(side)]
    }

    pub fn sim_switch_side(&mut self) {
        self.sim_side = self.sim_side.other();
    }

    pub fn sim_move(&mut self, down: bool) {
        let side = self.sim_side;
        let total = self.sim_rows(side).len();
        let cursor = &mut self.sim_cursor[Self::side_index(side)];
        if total == 0 {
            *cursor = 0;
            return;
        }
        *cursor = if down {
            (*cursor + 1) % total
        } else if *cursor == 0 {
            total - 1
        } else {
            (*cursor - 1).min(total - 1)
        };
    }

    fn sim_current_row(&self) -> Option<SimRow> {
        let rows = self.sim_rows(self.sim_side);
        let cursor = self.sim_cursor(self.sim_side).min(rows.len().saturating_sub(1));
        rows.into_iter().nth(cursor)
    }

    /// Toggles the missing flag of the highlighted player.
    pub fn sim_toggle_current(&mut self) -> bool {
        let Some(row) = self.sim_current_row() else {
            self.push_log("[INFO] No players found");
            return false;
        };
        let side = self.sim_side;
        let absent = self.simulator.toggle_absent(side, row.entry.id, &self.cache);
        debug!(player_id = row.entry.id, absent, "toggled missing player");
        if !row.absent && !absent {
            self.push_log(format!("[WARN] {} is not on this roster", row.entry.name));
            return false;
        }
        let verb = if absent { "marked absent" } else { "back in lineup" };
        self.push_log(format!("[INFO] {} {verb}", row.entry.name));
        absent
    }

    pub fn sim_clear(&mut self) {
        self.simulator.clear_selections(&self.cache);
        self.push_log("[INFO] Selections cleared");
    }

    pub fn sim_request_impact(&mut self) {
        let Some(row) = self.sim_current_row() else {
            return;
        };
        let team = self
            .simulator
            .matchup()
            .map(|m| match self.sim_side {
                Side::Home => m.home.clone(),
                Side::Away => m.away.clone(),
            })
            .unwrap_or_default();
        self.impact_target = Some((team, row.entry.id));
    }

    pub fn impact_query(&self) -> Option<Query> {
        let (team, player_id) = self.impact_target.as_ref()?;
        Some(Query::MissingPlayerImpact {
            team: team.clone(),
            player_id: *player_id,
        })
    }

    pub fn impact(&self) -> Option<&MissingPlayerImpact> {
        self.payload(&self.impact_query()?)
            .and_then(Payload::as_impact)
    }

    // Quick prediction (legacy flags)

    pub fn open_quick_prediction(&mut self) {
        let Some(game) = self.selected_game() else {
            self.push_log("[INFO] No game selected");
            return;
        };
        let home = resolve_team_code(game.home_team_id.as_deref(), &game.home_team);
        let away = resolve_team_code(game.away_team_id.as_deref(), &game.away_team);
        self.quick = Some(QuickPrediction {
            home,
            away,
            home_star_missing: false,
            away_star_missing: false,
        });
    }

    pub fn toggle_quick_flag(&mut self, side: Side) {
        if let Some(quick) = &mut self.quick {
            match side {
                Side::Home => quick.home_star_missing = !quick.home_star_missing,
                Side::Away => quick.away_star_missing = !quick.away_star_missing,
            }
        }
    }

    pub fn quick_prediction(&self) -> Option<&MatchPrediction> {
        let quick = self.quick.as_ref()?;
        self.payload(&quick.query())
            .and_then(Payload::as_legacy_prediction)
    }

    // Player dashboard

    pub fn search_query_obj(&self) -> Option<Query> {
        let query = self.search_query.as_ref()?;
        Some(Query::SearchPlayers {
            query: query.clone(),
        })
    }

    pub fn search_results(&self) -> &[Player] {
        self.search_query_obj()
            .and_then(|q| self.payload(&q))
            .and_then(Payload::as_players)
            .unwrap_or_default()
    }

    pub fn select_next_result(&mut self) {
        let total = self.search_results().len();
        self.search_selected = if total == 0 {
            0
        } else {
            (self.search_selected + 1) % total
        };
    }

    pub fn select_prev_result(&mut self) {
        let total = self.search_results().len();
        self.search_selected = if total == 0 {
            0
        } else if self.search_selected == 0 {
            total - 1
        } else {
            self.search_selected - 1
        };
    }

    pub fn open_selected_player(&mut self) -> bool {
        let Some(player) = self.search_results().get(self.search_selected).cloned() else {
            return false;
        };
        info!(player_id = player.id, "player opened");
        self.player = Some(PlayerView {
            player,
            tab: PlayerTab::Recent,
            vs_team: None,
            trend_stat: StatCategory::Pts,
            trend_threshold: None,
            line: None,
        });
        true
    }

    pub fn cycle_player_tab(&mut self) {
        if let Some(view) = &mut self.player {
            view.tab = match view.tab {
                PlayerTab::Recent => PlayerTab::VsTeam,
                PlayerTab::VsTeam => PlayerTab::Trend,
                PlayerTab::Trend => PlayerTab::Projection,
                PlayerTab::Projection => PlayerTab::Recent,
            };
        }
    }

    pub fn cycle_trend_stat(&mut self) {
        if let Some(view) = &mut self.player {
            view.trend_stat = view.trend_stat.next();
        }
    }

    pub fn season_query(&self) -> Option<Query> {
        let view = self.player.as_ref()?;
        Some(Query::PlayerSeason {
            player_id: view.player.id,
        })
    }

    pub fn recent_query(&self) -> Option<Query> {
        let view = self.player.as_ref()?;
        Some(Query::PlayerRecent {
            player_id: view.player.id,
            limit: self.recent_limit,
        })
    }

    pub fn vs_team_query(&self) -> Option<Query> {
        let view = self.player.as_ref()?;
        Some(Query::PlayerVsTeam {
            player_id: view.player.id,
            team: view.vs_team.clone()?,
        })
    }

    pub fn trend_query(&self) -> Option<Query> {
        let view = self.player.as_ref()?;
        Some(Query::PlayerTrend {
            player_id: view.player.id,
            stat: view.trend_stat,
            threshold: view.trend_threshold?,
        })
    }

    pub fn projection_query(&self) -> Option<Query> {
        let view = self.player.as_ref()?;
        Some(Query::PredictPlayer {
            player_id: view.player.id,
            team: view.vs_team.clone()?,
        })
    }

    pub fn season(&self) -> Option<&SeasonStats> {
        self.payload(&self.season_query()?)
            .and_then(Payload::as_season)
    }

    pub fn recent(&self) -> Option<&[GameLog]> {
        self.payload(&self.recent_query()?)
            .and_then(Payload::as_recent)
    }

    pub fn vs_team(&self) -> Option<&VsTeamStats> {
        self.payload(&self.vs_team_query()?)
            .and_then(Payload::as_vs_team)
    }

    pub fn trend(&self) -> Option<&TrendResult> {
        self.payload(&self.trend_query()?)
            .and_then(Payload::as_trend)
    }

    pub fn projection(&self) -> Option<&PlayerProjection> {
        self.payload(&self.projection_query()?)
            .and_then(Payload::as_projection)
    }

    // Text input

    pub fn start_input(&mut self, target: InputTarget) {
        self.input = Some(target);
        self.input_buffer = match target {
            InputTarget::RosterFilter => self.roster_filter.clone(),
            _ => String::new(),
        };
    }

    pub fn input_push(&mut self, ch: char) {
        self.input_buffer.push(ch);
        if self.input == Some(InputTarget::RosterFilter) {
            self.roster_filter = self.input_buffer.clone();
            self.sim_cursor = [0; 2];
        }
    }

    pub fn input_pop(&mut self) {
        self.input_buffer.pop();
        if self.input == Some(InputTarget::RosterFilter) {
            self.roster_filter = self.input_buffer.clone();
        }
    }

    pub fn input_cancel(&mut self) {
        if self.input == Some(InputTarget::RosterFilter) {
            self.roster_filter.clear();
        }
        self.input = None;
        self.input_buffer.clear();
    }

    pub fn input_submit(&mut self) {
        let Some(target) = self.input.take() else {
            return;
        };
        let raw = std::mem::take(&mut self.input_buffer);
        let value = raw.trim();
        match target {
            InputTarget::PlayerSearch => {
                if value.is_empty() {
                    return;
                }
                self.search_query = Some(value.to_string());
                self.search_selected = 0;
                self.screen = Screen::Player;
            }
            InputTarget::RosterFilter => {
                self.roster_filter = value.to_string();
            }
            InputTarget::VsTeam => {
                if value.is_empty() {
                    return;
                }
                let team = resolve_team_code(None, value);
                if let Some(view) = &mut self.player {
                    view.vs_team = Some(team);
                }
            }
            InputTarget::TrendThreshold => match parse_positive(value) {
                Some(threshold) => {
                    if let Some(view) = &mut self.player {
                        view.trend_threshold = Some(threshold);
                        view.tab = PlayerTab::Trend;
                    }
                }
                None => self.push_log(format!("[WARN] Invalid threshold: {value}")),
            },
            InputTarget::BettingLine => match parse_positive(value) {
                Some(line) => {
                    if let Some(view) = &mut self.player {
                        view.line = Some(line);
                    }
                }
                None => self.push_log(format!("[WARN] Invalid line: {value}")),
            },
        }
    }

    // Fetch coordination

    /// Queries the current screen wants, claimed in the cache. Each returned
    /// command must be sent to the provider.
    pub fn sync_queries(&mut self) -> Vec<ProviderCommand> {
        let mut wanted = vec![self.games_query()];
        let mut commands = Vec::new();

        if self.screen == Screen::Simulator {
            for (ticket, query) in self.simulator.sync(&mut self.cache) {
                commands.push(ProviderCommand::Fetch { ticket, query });
            }
            wanted.extend(self.impact_query());
        }
        if let Some(quick) = &self.quick {
            wanted.push(quick.query());
        }
        if self.screen == Screen::Player {
            wanted.extend(self.player_queries());
        }

        for query in wanted {
            if let Some(ticket) = self.cache.begin(&query.key()) {
                commands.push(ProviderCommand::Fetch { ticket, query });
            }
        }
        commands
    }

    fn player_queries(&self) -> Vec<Query> {
        let mut out = Vec::new();
        out.extend(self.search_query_obj());
        out.extend(self.season_query());
        out.extend(self.recent_query());
        out.extend(self.vs_team_query());
        out.extend(self.trend_query());
        out.extend(self.projection_query());
        out
    }

    /// Re-issues the failed requests of the current screen.
    pub fn retry(&mut self) -> Vec<ProviderCommand> {
        let mut failed: Vec<Query> = Vec::new();
        match self.screen {
            Screen::Games => failed.push(self.games_query()),
            Screen::Simulator => {
                failed.extend(self.simulator.failed_query(&self.cache));
                failed.extend(self.simulator.roster_query(Side::Home));
                failed.extend(self.simulator.roster_query(Side::Away));
                failed.extend(self.impact_query());
            }
            Screen::Player => failed.extend(self.player_queries()),
        }
        if let Some(quick) = &self.quick {
            failed.push(quick.query());
        }

        let mut commands = Vec::new();
        for query in failed {
            let key: QueryKey = query.key();
            if self.cache.status(&key) != Some(QueryStatus::Error) {
                continue;
            }
            let ticket = self.cache.refetch(&key);
            commands.push(ProviderCommand::Fetch { ticket, query });
        }
        if commands.is_empty() {
            self.push_log("[INFO] Nothing to retry");
        } else {
            self.push_log(format!("[INFO] Retrying {} request(s)", commands.len()));
        }
        commands
    }

    /// Forces a fresh quick prediction (its manual refresh action).
    pub fn refresh_quick(&mut self) -> Option<ProviderCommand> {
        let query = self.quick.as_ref()?.query();
        let ticket = self.cache.refetch(&query.key());
        Some(ProviderCommand::Fetch { ticket, query })
    }
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::QueryResolved { ticket, result } => {
            let failure = result.as_ref().err().cloned();
            let accepted = state.cache.resolve(&ticket, result);
            if !accepted {
                return;
            }
            if let Some(err) = failure {
                state.push_log(format!("[WARN] {err}"));
            }
            let total = state.games().len();
            if state.games_selected >= total {
                state.games_selected = total.saturating_sub(1);
            }
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

/// Header text for how long ago a feed refreshed.
pub fn age_label(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    match secs {
        0..=59 => format!("updated {secs}s ago"),
        60..=3599 => format!("updated {}m ago", secs / 60),
        _ => format!("updated {}h ago", secs / 3600),
    }
}

/// Groups games by date, keeping the order dates first appear in.
pub fn games_by_date(games: &[Game]) -> Vec<(&str, Vec<&Game>)> {
    let mut groups: Vec<(&str, Vec<&Game>)> = Vec::new();
    for game in games {
        match groups.iter().position(|(date, _)| *date == game.game_date) {
            Some(idx) => groups[idx].1.push(game),
            None => groups.push((game.game_date.as_str(), vec![game])),
        }
    }
    groups
}

fn parse_positive(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

pub fn screen_label(screen: Screen) -> &'static str {
    match screen {
        Screen::Games => "GAMES",
        Screen::Simulator => "SIMULATOR",
        Screen::Player => "PLAYER",
    }
}

pub fn feed_label(feed: GamesFeed) -> &'static str {
    match feed {
        GamesFeed::Next30h => "NEXT 30H",
        GamesFeed::Today => "TODAY",
    }
}

pub fn tab_label(tab: PlayerTab) -> &'static str {
    match tab {
        PlayerTab::Recent => "Recent",
        PlayerTab::VsTeam => "Vs Team",
        PlayerTab::Trend => "Streaks",
        PlayerTab::Projection => "Projection",
    }
}
