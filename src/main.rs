use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use tracing::{error, info, warn};

use nba_insights::api_fetch::ApiClient;
use nba_insights::api_types::{LineLean, line_edge};
use nba_insights::config::{Config, load_dotenv};
use nba_insights::logging::init_logging;
use nba_insights::provider::spawn_provider;
use nba_insights::query_cache::QueryStatus;
use nba_insights::selection::{NO_PLAYERS_FOUND, Side, side_label};
use nba_insights::simulator::{SimPhase, missing_penalty, phase_label, usage_boost_label};
use nba_insights::state::{
    AppState, Delta, InputTarget, PlayerTab, ProviderCommand, Screen, age_label, apply_delta,
    feed_label, games_by_date, screen_label, tab_label,
};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    games_poll: Duration,
    last_games_refresh: Instant,
}

impl App {
    fn new(cmd_tx: Option<mpsc::Sender<ProviderCommand>>, config: &Config) -> Self {
        let mut state = AppState::new();
        state.recent_limit = config.recent_games_limit;
        Self {
            state,
            should_quit: false,
            cmd_tx,
            games_poll: config.games_poll,
            last_games_refresh: Instant::now(),
        }
    }

    fn dispatch(&mut self, commands: Vec<ProviderCommand>) {
        if commands.is_empty() {
            return;
        }
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log("[INFO] Fetching unavailable");
            return;
        };
        let mut failed = false;
        for cmd in commands {
            if tx.send(cmd).is_err() {
                failed = true;
            }
        }
        if failed {
            warn!("provider channel closed");
            self.state.push_log("[WARN] Request failed: provider stopped");
            self.cmd_tx = None;
        }
    }

    fn sync(&mut self) {
        let commands = self.state.sync_queries();
        self.dispatch(commands);
    }

    fn refresh_games(&mut self, announce: bool) {
        if let Some(cmd) = self.state.refresh_games() {
            self.dispatch(vec![cmd]);
            if announce {
                self.state.push_log("[INFO] Games refresh sent");
            }
        }
        self.last_games_refresh = Instant::now();
    }

    fn maybe_refresh_games(&mut self) {
        if self.last_games_refresh.elapsed() >= self.games_poll {
            self.refresh_games(false);
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.input.is_some() {
            self.on_input_key(key);
            return;
        }
        if self.state.quick.is_some() && self.on_quick_key(key) {
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char('1') => self.state.screen = Screen::Games,
            KeyCode::Char('2') => {
                if self.state.simulator.matchup().is_some() {
                    self.state.screen = Screen::Simulator;
                } else {
                    self.state.push_log("[INFO] Pick a game to simulate first");
                }
            }
            KeyCode::Char('3') => self.state.screen = Screen::Player,
            KeyCode::Char('/') => self.state.start_input(InputTarget::PlayerSearch),
            KeyCode::Char('r') => {
                let commands = self.state.retry();
                self.dispatch(commands);
            }
            KeyCode::Esc | KeyCode::Char('b') => {
                if self.state.help_overlay {
                    self.state.help_overlay = false;
                } else {
                    self.state.screen = Screen::Games;
                }
            }
            _ => match self.state.screen {
                Screen::Games => self.on_games_key(key),
                Screen::Simulator => self.on_simulator_key(key),
                Screen::Player => self.on_player_key(key),
            },
        }
    }

    fn on_input_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.state.input_submit(),
            KeyCode::Esc => self.state.input_cancel(),
            KeyCode::Backspace => self.state.input_pop(),
            KeyCode::Char(ch) => self.state.input_push(ch),
            _ => {}
        }
    }

    fn on_quick_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('h') => self.state.toggle_quick_flag(Side::Home),
            KeyCode::Char('a') => self.state.toggle_quick_flag(Side::Away),
            KeyCode::Char('R') => {
                let cmd = self.state.refresh_quick();
                self.dispatch(cmd.into_iter().collect());
            }
            KeyCode::Esc | KeyCode::Char('p') => self.state.quick = None,
            _ => return false,
        }
        true
    }

    fn on_games_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next_game(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev_game(),
            KeyCode::Char('t') => self.state.toggle_games_feed(),
            KeyCode::Char('R') => self.refresh_games(true),
            KeyCode::Char('p') => self.state.open_quick_prediction(),
            KeyCode::Enter | KeyCode::Char('d') => {
                self.state.open_simulator();
            }
            _ => {}
        }
    }

    fn on_simulator_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => self.state.sim_switch_side(),
            KeyCode::Char('j') | KeyCode::Down => self.state.sim_move(true),
            KeyCode::Char('k') | KeyCode::Up => self.state.sim_move(false),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.state.sim_toggle_current();
            }
            KeyCode::Char('c') => self.state.sim_clear(),
            KeyCode::Char('f') => self.state.start_input(InputTarget::RosterFilter),
            KeyCode::Char('i') => self.state.sim_request_impact(),
            _ => {}
        }
    }

    fn on_player_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next_result(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev_result(),
            KeyCode::Enter => {
                self.state.open_selected_player();
            }
            KeyCode::Tab => self.state.cycle_player_tab(),
            KeyCode::Char('v') => self.state.start_input(InputTarget::VsTeam),
            KeyCode::Char('t') => self.state.start_input(InputTarget::TrendThreshold),
            KeyCode::Char('s') => self.state.cycle_trend_stat(),
            KeyCode::Char('l') => self.state.start_input(InputTarget::BettingLine),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    load_dotenv();
    let config = Config::from_env()?;
    let _log_guard = init_logging(&config)?;
    info!(base_url = %config.api_base_url, "starting");

    let api = ApiClient::new(&config.api_base_url, config.api_timeout)
        .context("create API client")?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _provider = spawn_provider(api, tx, cmd_rx);

    let mut app = App::new(Some(cmd_tx), &config);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "ui loop failed");
        eprintln!("error: {err}");
    }
    info!("stopped");
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.maybe_refresh_games();
        app.sync();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Games => render_games(frame, chunks[1], &app.state),
        Screen::Simulator => render_simulator(frame, chunks[1], &app.state),
        Screen::Player => render_player(frame, chunks[1], &app.state),
    }

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.quick.is_some() {
        render_quick_overlay(frame, frame.size(), &app.state);
    }
    if app.state.input.is_some() {
        render_input_overlay(frame, frame.size(), &app.state);
    }
    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let title = match state.screen {
        Screen::Games => match state.games_updated_at() {
            Some(at) => format!(
                "NBA INSIGHTS | {} | {} | {}",
                screen_label(state.screen),
                feed_label(state.games_feed),
                age_label(at.elapsed())
            ),
            None => format!(
                "NBA INSIGHTS | {} | {}",
                screen_label(state.screen),
                feed_label(state.games_feed)
            ),
        },
        Screen::Simulator => match state.simulator.matchup() {
            Some(m) => format!(
                "NBA INSIGHTS | {} | {} vs {} | {}",
                screen_label(state.screen),
                m.home,
                m.away,
                phase_label(state.simulator.phase(&state.cache))
            ),
            None => format!("NBA INSIGHTS | {}", screen_label(state.screen)),
        },
        Screen::Player => match &state.player {
            Some(view) => format!(
                "NBA INSIGHTS | {} | {}",
                screen_label(state.screen),
                view.player.full_name
            ),
            None => format!("NBA INSIGHTS | {}", screen_label(state.screen)),
        },
    };
    let line1 = format!("  (o)  {title}");
    let line2 = "  /|\\".to_string();
    format!("{line1}\n{line2}")
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Games => {
            "j/k Move | Enter Simulate | p Quick pick | t Today/30h | R Refresh | / Search | r Retry | ? Help | q Quit".to_string()
        }
        Screen::Simulator => {
            "Tab Side | j/k Move | Space Missing | c Clear | f Filter | i Impact | r Retry | b Back | q Quit".to_string()
        }
        Screen::Player => {
            "/ Search | j/k Move | Enter Open | Tab View | v Opponent | t Threshold | s Stat | l Line | b Back".to_string()
        }
    }
}

fn render_games(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default()
        .title(format!("Games ({})", feed_label(state.games_feed)))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let query = state.games_query();
    let games = state.games();
    if games.is_empty() {
        let text = match state.query_status(&query) {
            Some(QueryStatus::Error) => format!(
                "Games unavailable: {} (press r to retry)",
                state.query_error(&query).unwrap_or("unknown error")
            ),
            Some(QueryStatus::Success) => "No games scheduled".to_string(),
            _ => "Loading games...".to_string(),
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let mut lines: Vec<Line> = Vec::new();
    let mut selected_line = 0usize;
    let mut idx = 0usize;
    for (date, group) in games_by_date(games) {
        lines.push(Line::styled(
            format_game_date(date),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        for game in group {
            let selected = idx == state.games_selected;
            if selected {
                selected_line = lines.len();
            }
            let style = if selected {
                Style::default().fg(Color::White).bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let score = match (game.home_score, game.away_score) {
                (Some(h), Some(a)) => format!("{h}-{a}"),
                _ => "-".to_string(),
            };
            let mut spans = vec![Span::styled(
                format!(
                    "  {:<6} {:>24} vs {:<24} {:>7}  {}",
                    game.time, game.home_team, game.away_team, score, game.status
                ),
                style,
            )];
            if game.is_live {
                spans.push(Span::styled(
                    " LIVE",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ));
            }
            lines.push(Line::from(spans));
            idx += 1;
        }
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(selected_line, lines.len(), visible);
    let text: Vec<Line> = lines.drain(start..end).collect();
    frame.render_widget(Paragraph::new(text), inner);
}

fn render_simulator(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(matchup) = state.simulator.matchup() else {
        let empty = Paragraph::new("Pick a game on the games screen to simulate")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);

    let summary = Paragraph::new(simulator_summary(state))
        .block(Block::default().title("Prediction").borders(Borders::ALL));
    frame.render_widget(summary, rows[0]);

    let impact_width = if state.impact_target.is_some() { 30 } else { 0 };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(50),
            Constraint::Percentage(50),
            Constraint::Length(impact_width),
        ])
        .split(rows[1]);

    render_side_table(frame, columns[0], state, Side::Home, &matchup.home);
    render_side_table(frame, columns[1], state, Side::Away, &matchup.away);
    if state.impact_target.is_some() {
        let impact = Paragraph::new(impact_text(state))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Absence impact").borders(Borders::ALL));
        frame.render_widget(impact, columns[2]);
    }
}

fn simulator_summary(state: &AppState) -> Vec<Line<'static>> {
    let sim = &state.simulator;
    let phase = sim.phase(&state.cache);
    let mut lines = Vec::new();

    let Some(pred) = state.sim_display() else {
        let text = match phase {
            SimPhase::Failed => format!(
                "Prediction data unavailable: {} (press r to retry)",
                sim.error(&state.cache).unwrap_or("unknown error")
            ),
            _ => "Loading prediction...".to_string(),
        };
        lines.push(Line::raw(text));
        return lines;
    };

    let winner = pred.predicted_winner.clone().unwrap_or_else(|| "-".to_string());
    let mut head = vec![Span::raw(format!(
        "Winner: {winner}  Margin: {:+.1}  ",
        pred.predicted_margin
    ))];
    match phase {
        SimPhase::Recalculating => head.push(Span::styled(
            "Recalculating...",
            Style::default().fg(Color::Yellow),
        )),
        SimPhase::Failed => head.push(Span::styled(
            format!(
                "Update failed: {} (r to retry)",
                sim.error(&state.cache).unwrap_or("unknown error")
            ),
            Style::default().fg(Color::Red),
        )),
        SimPhase::Adjusted => head.push(Span::styled(
            "Adjusted",
            Style::default().fg(Color::Green),
        )),
        _ => {}
    }
    lines.push(Line::from(head));

    let mut ctx = Vec::new();
    for side in [Side::Home, Side::Away] {
        let penalty = missing_penalty(pred, side);
        ctx.push(Span::raw(format!("{} penalty {penalty:+.1}  ", side_label(side))));
        if let Some(boost) = sim.usage_boost(side, &state.cache) {
            ctx.push(Span::styled(
                format!("[{} usage {}] ", side_label(side), usage_boost_label(boost)),
                Style::default().fg(Color::Cyan),
            ));
        }
    }
    lines.push(Line::from(ctx));

    if sim.has_high_blowout_risk(&state.cache) {
        lines.push(Line::styled(
            "BLOWOUT ALERT: starters may sit late",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }
    lines
}

fn render_side_table(frame: &mut Frame, area: Rect, state: &AppState, side: Side, team: &str) {
    let active = state.sim_side == side;
    let missing = state.simulator.selections().side(side).len();
    let mut title = format!("{} {team}", side_label(side));
    if missing > 0 {
        title.push_str(&format!(" ({missing} out)"));
    }
    let border_style = if active {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = state.sim_rows(side);
    if rows.is_empty() {
        let text = if state.roster_filter.is_empty()
            && state.simulator.phase(&state.cache) == SimPhase::Loading
        {
            "Loading roster..."
        } else {
            NO_PLAYERS_FOUND
        };
        let empty = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let mut lines = vec![Line::styled(
        format!("  {:<22} {:>5} {:>5} {:>5} {:>5}", "Player", "MIN", "PTS", "REB", "AST"),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    let cursor = state.sim_cursor(side);
    let boost = state.simulator.usage_boost(side, &state.cache);
    for (idx, row) in rows.iter().enumerate() {
        let marker = if row.absent { "x" } else { " " };
        let stats = match &row.projection {
            Some(p) => format!(
                "{:>5.1} {:>5.1} {:>5.1} {:>5.1}",
                p.predicted_stats.min, p.predicted_stats.pts, p.predicted_stats.reb, p.predicted_stats.ast
            ),
            None if row.absent => format!("{:>23}", "OUT"),
            None => format!("{:>23}", "-"),
        };
        let mut style = Style::default();
        if row.absent {
            style = style.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
        }
        if active && idx == cursor {
            style = style.bg(Color::DarkGray).fg(Color::White);
        }
        let name: String = row.entry.name.chars().take(22).collect();
        let mut spans = vec![Span::styled(format!("{marker} {name:<22} {stats}"), style)];
        if let Some(boost) = boost
            && row.projection.is_some()
        {
            spans.push(Span::styled(
                format!(" {}", usage_boost_label(boost)),
                Style::default().fg(Color::Cyan),
            ));
        }
        lines.push(Line::from(spans));
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(cursor + 1, lines.len(), visible);
    let text: Vec<Line> = lines.drain(start..end).collect();
    frame.render_widget(Paragraph::new(text), inner);
}

fn impact_text(state: &AppState) -> String {
    let Some(query) = state.impact_query() else {
        return String::new();
    };
    match state.impact() {
        Some(impact) => {
            let mut lines = vec![format!(
                "{} without {}",
                impact.team,
                impact.player_name.as_deref().unwrap_or("player")
            )];
            for (name, value) in &impact.metrics {
                lines.push(format!("{name}: {value}"));
            }
            lines.join("\n")
        }
        None => match state.query_status(&query) {
            Some(QueryStatus::Error) => format!(
                "Unavailable: {}",
                state.query_error(&query).unwrap_or("unknown error")
            ),
            _ => "Loading...".to_string(),
        },
    }
}

fn render_player(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(32), Constraint::Min(30)])
        .split(area);

    let results = Paragraph::new(search_results_text(state))
        .block(Block::default().title("Search").borders(Borders::ALL));
    frame.render_widget(results, columns[0]);

    let Some(view) = &state.player else {
        let empty = Paragraph::new("Press / to search for a player")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Player").borders(Borders::ALL));
        frame.render_widget(empty, columns[1]);
        return;
    };

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(columns[1]);

    let season = Paragraph::new(season_text(state)).block(
        Block::default()
            .title(format!("{} season", view.player.full_name))
            .borders(Borders::ALL),
    );
    frame.render_widget(season, right[0]);

    let body = match view.tab {
        PlayerTab::Recent => recent_text(state),
        PlayerTab::VsTeam => vs_team_text(state),
        PlayerTab::Trend => trend_text(state),
        PlayerTab::Projection => projection_text(state),
    };
    let detail = Paragraph::new(body)
        .wrap(Wrap { trim: true })
        .block(Block::default().title(tab_label(view.tab)).borders(Borders::ALL));
    frame.render_widget(detail, right[1]);
}

fn search_results_text(state: &AppState) -> String {
    let Some(query) = state.search_query_obj() else {
        return "Press / to search".to_string();
    };
    let results = state.search_results();
    if results.is_empty() {
        return match state.query_status(&query) {
            Some(QueryStatus::Success) => NO_PLAYERS_FOUND.to_string(),
            Some(QueryStatus::Error) => "Search failed (r to retry)".to_string(),
            _ => "Searching...".to_string(),
        };
    }
    results
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let prefix = if idx == state.search_selected { "> " } else { "  " };
            let active = if p.is_active { "" } else { " (ret.)" };
            format!("{prefix}{}{active}", p.full_name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn pending_text(state: &AppState, query: Option<nba_insights::query::Query>) -> String {
    let Some(query) = query else {
        return String::new();
    };
    match state.query_status(&query) {
        Some(QueryStatus::Error) => format!(
            "Unavailable: {} (r to retry)",
            state.query_error(&query).unwrap_or("unknown error")
        ),
        _ => "Loading...".to_string(),
    }
}

fn season_text(state: &AppState) -> String {
    match state.season() {
        Some(s) => format!(
            "GP {:.0}  MIN {:.1}  PTS {:.1}  REB {:.1}  AST {:.1}\nSTL {:.1}  BLK {:.1}  PRA {:.1}  PR {:.1}  PA {:.1}  AR {:.1}",
            s.gp, s.min, s.pts, s.reb, s.ast, s.stl, s.blk, s.pra, s.pr, s.pa, s.ar
        ),
        None => pending_text(state, state.season_query()),
    }
}

fn recent_text(state: &AppState) -> String {
    match state.recent() {
        Some([]) => "No recent games".to_string(),
        Some(logs) => logs
            .iter()
            .map(|g| {
                format!(
                    "{:<12} {:<14} {:<2} {:>4.0} PTS {:>4.0} REB {:>4.0} AST",
                    g.game_date, g.matchup, g.wl, g.pts, g.reb, g.ast
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => pending_text(state, state.recent_query()),
    }
}

fn vs_team_text(state: &AppState) -> String {
    if state.vs_team_query().is_none() {
        return "Press v to pick an opponent".to_string();
    }
    match state.vs_team() {
        Some(v) => format!(
            "Games: {}  Record: {}-{}\nPTS {:.1}  REB {:.1}  AST {:.1}",
            v.games_played, v.total_wins, v.total_losses, v.avg_pts, v.avg_reb, v.avg_ast
        ),
        None => pending_text(state, state.vs_team_query()),
    }
}

fn trend_text(state: &AppState) -> String {
    let Some(view) = &state.player else {
        return String::new();
    };
    if state.trend_query().is_none() {
        return format!(
            "Stat: {}  Press t to set a threshold, s to change stat",
            view.trend_stat.as_param()
        );
    }
    match state.trend() {
        Some(t) => format!(
            "{} over {:.1}\nActive streak: {}  Hits: {}  Hit rate: {:.1}%\n{}",
            view.trend_stat.as_param(),
            view.trend_threshold.unwrap_or_default(),
            t.current_active_streak,
            t.total_hits,
            t.hit_rate_percent,
            t.message
        ),
        None => pending_text(state, state.trend_query()),
    }
}

fn projection_text(state: &AppState) -> String {
    let Some(view) = &state.player else {
        return String::new();
    };
    if state.projection_query().is_none() {
        return "Press v to pick an opponent".to_string();
    }
    let Some(proj) = state.projection() else {
        return pending_text(state, state.projection_query());
    };
    let p = &proj.prediction;
    let mut lines = vec![format!(
        "MIN {:.1}  PTS {:.1}  REB {:.1}  AST {:.1}  PRA {:.1}",
        p.predicted_stats.min,
        p.predicted_stats.pts,
        p.predicted_stats.reb,
        p.predicted_stats.ast,
        p.advanced_metrics_projected.pra
    )];
    if let Some(boost) = p.context.as_ref().and_then(|c| c.boost_applied.as_deref()) {
        lines.push(format!("Boost: {boost}"));
    }
    if let Some(line) = view.line
        && let Some(projected) = view.trend_stat.projection(p)
    {
        let (edge, lean) = line_edge(projected, line);
        let lean = match lean {
            LineLean::Over => "OVER",
            LineLean::Under => "UNDER",
            LineLean::Push => "PUSH",
        };
        lines.push(format!(
            "{} line {line:.1}: projected {projected:.1}, edge {edge:+.1} -> {lean}",
            view.trend_stat.as_param()
        ));
    }
    if !proj.recent_form.is_empty() {
        lines.push("Recent form:".to_string());
        for g in &proj.recent_form {
            lines.push(format!(
                "  {:<12} {:>4.0} MIN {:>4.0} PTS {:>4.0} REB {:>4.0} AST",
                g.date, g.min, g.pts, g.reb, g.ast
            ));
        }
    }
    if !proj.h2h_history.is_empty() {
        lines.push("Head to head:".to_string());
        for g in &proj.h2h_history {
            lines.push(format!(
                "  {:<12} {:>4.0} PTS {:>4.0} REB {:>4.0} AST",
                g.date, g.pts, g.reb, g.ast
            ));
        }
    }
    lines.join("\n")
}

fn render_quick_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(quick) = &state.quick else {
        return;
    };
    let popup_area = centered_rect(50, 40, area);
    frame.render_widget(Clear, popup_area);

    let flag = |missing: bool| if missing { "star OUT" } else { "full strength" };
    let mut lines = vec![
        format!("{} ({})  vs  {} ({})", quick.home, flag(quick.home_star_missing), quick.away, flag(quick.away_star_missing)),
        String::new(),
    ];
    match state.quick_prediction() {
        Some(p) => {
            lines.push(format!(
                "Winner: {}  Home win: {:.0}%",
                p.predicted_winner,
                p.win_probability_home * 100.0
            ));
            lines.push(format!(
                "Margin: {:+.1}  Total: {:.1}  Confidence: {}",
                p.predicted_margin, p.predicted_total_points, p.confidence_level
            ));
            lines.push(format!(
                "Net rating: {:.1} / {:.1}",
                p.details.home_net_rtg, p.details.away_net_rtg
            ));
        }
        None => lines.push(pending_text(state, Some(quick.query()))),
    }
    lines.push(String::new());
    lines.push("h Home star | a Away star | R Refresh | Esc Close".to_string());

    let popup = Paragraph::new(lines.join("\n"))
        .block(Block::default().title("Quick prediction").borders(Borders::ALL));
    frame.render_widget(popup, popup_area);
}

fn render_input_overlay(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(target) = state.input else {
        return;
    };
    let title = match target {
        InputTarget::PlayerSearch => "Search player",
        InputTarget::RosterFilter => "Filter roster",
        InputTarget::VsTeam => "Opponent (code or name)",
        InputTarget::TrendThreshold => "Threshold",
        InputTarget::BettingLine => "Betting line",
    };
    let popup_area = centered_rect(40, 20, area);
    frame.render_widget(Clear, popup_area);
    let input = Paragraph::new(format!("{}_", state.input_buffer))
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(input, popup_area);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let start = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(start)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_game_date(raw: &str) -> String {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return "TBD".to_string();
    }
    let day = cleaned.get(..10).unwrap_or(cleaned);
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => date.format("%a %b %-d, %Y").to_string(),
        Err(_) => cleaned.to_string(),
    }
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "NBA Insights - Help",
        "",
        "Global:",
        "  1 / 2 / 3    Games / Simulator / Player",
        "  /            Search players",
        "  r            Retry failed requests",
        "  b / Esc      Back",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Games:",
        "  j/k or ↑/↓   Move",
        "  Enter        Open simulator",
        "  p            Quick prediction (h/a star flags)",
        "  t            Today / next 30h",
        "  R            Refresh now",
        "",
        "Simulator:",
        "  Tab          Switch team",
        "  Space        Mark / unmark missing",
        "  c            Clear all missing",
        "  f            Filter roster",
        "  i            Absence impact",
        "",
        "Player:",
        "  Tab          Recent / Vs team / Streaks / Projection",
        "  v t s l      Opponent / threshold / stat / line",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
