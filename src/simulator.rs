//! What-if match simulator.
//!
//! Holds the missing-player selections for one home/away pairing and decides
//! which prediction to request and which one to show:
//!
//! * the baseline (nobody missing) is requested as soon as the pairing is
//!   known;
//! * the adjusted prediction is requested only once the baseline has loaded
//!   and at least one confirmed player is marked missing;
//! * while an adjusted prediction is in flight the previously shown snapshot
//!   stays on screen.
//!
//! All fetched data lives in the shared [`QueryCache`]; the simulator only
//! derives keys from its selection state, so a response can only ever be
//! shown for the exact tuple it was requested with.

use tracing::debug;

use crate::api_types::{InteractiveMatchPrediction, RiskLevel, RosterEntry};
use crate::query::{Payload, Query};
use crate::query_cache::{FetchTicket, QueryCache, QueryKey, QueryStatus};
use crate::selection::{Selections, Side};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matchup {
    pub home: String,
    pub away: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimPhase {
    /// Baseline not loaded yet.
    Loading,
    /// No usable selection; showing the baseline.
    BaselineOnly,
    /// Adjusted prediction pending; showing the previous snapshot.
    Recalculating,
    /// Showing the prediction for the current selection.
    Adjusted,
    /// The last request failed; the previous snapshot (if any) stays visible.
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct MatchSimulator {
    matchup: Option<Matchup>,
    selections: Selections,
    fallback: Option<QueryKey>,
    requested_adjusted: Option<QueryKey>,
}

impl MatchSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matchup(&self) -> Option<&Matchup> {
        self.matchup.as_ref()
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Points the simulator at a pairing. A different pairing resets the
    /// selections; reopening the same one keeps them.
    pub fn open(&mut self, home: &str, away: &str) -> bool {
        let next = Matchup {
            home: home.trim().to_ascii_uppercase(),
            away: away.trim().to_ascii_uppercase(),
        };
        if self.matchup.as_ref() == Some(&next) {
            return false;
        }
        debug!(home = %next.home, away = %next.away, "simulator matchup changed");
        self.matchup = Some(next);
        self.selections.clear();
        self.fallback = None;
        true
    }

    pub fn baseline_query(&self) -> Option<Query> {
        let m = self.matchup.as_ref()?;
        Some(Query::predict_match(&m.home, &m.away, &[], &[]))
    }

    pub fn roster_query(&self, side: Side) -> Option<Query> {
        let m = self.matchup.as_ref()?;
        let team = match side {
            Side::Home => &m.home,
            Side::Away => &m.away,
        };
        Some(Query::TeamRoster { team: team.clone() })
    }

    pub fn baseline<'a>(&self, cache: &'a QueryCache<Payload>) -> Option<&'a InteractiveMatchPrediction> {
        let key = self.baseline_query()?.key();
        cache.data(&key).and_then(|p| p.as_prediction())
    }

    /// Players that can be marked missing on `side`: the team roster when it
    /// loaded, otherwise the players of the baseline prediction.
    pub fn roster(&self, side: Side, cache: &QueryCache<Payload>) -> Vec<RosterEntry> {
        if let Some(query) = self.roster_query(side) {
            let key = query.key();
            if cache.status(&key) == Some(QueryStatus::Success)
                && let Some(roster) = cache.data(&key).and_then(|p| p.as_roster())
            {
                return roster.to_vec();
            }
        }
        let team = self
            .matchup
            .as_ref()
            .map(|m| match side {
                Side::Home => m.home.clone(),
                Side::Away => m.away.clone(),
            })
            .unwrap_or_default();
        let Some(baseline) = self.baseline(cache) else {
            return Vec::new();
        };
        let players = match side {
            Side::Home => &baseline.home_players,
            Side::Away => &baseline.away_players,
        };
        players
            .iter()
            .map(|p| RosterEntry {
                id: p.player_id,
                name: p.player.clone(),
                team: team.clone(),
            })
            .collect()
    }

    pub fn known_ids(&self, side: Side, cache: &QueryCache<Payload>) -> Vec<u32> {
        self.roster(side, cache).into_iter().map(|e| e.id).collect()
    }

    /// Selected ids confirmed by the loaded roster, in selection order.
    pub fn derived_ids(&self, side: Side, cache: &QueryCache<Payload>) -> Vec<u32> {
        self.selections
            .side(side)
            .resolved_ids(&self.known_ids(side, cache))
    }

    pub fn adjusted_query(&self, cache: &QueryCache<Payload>) -> Option<Query> {
        let m = self.matchup.as_ref()?;
        let home = self.derived_ids(Side::Home, cache);
        let away = self.derived_ids(Side::Away, cache);
        if home.is_empty() && away.is_empty() {
            return None;
        }
        Some(Query::predict_match(&m.home, &m.away, &home, &away))
    }

    /// Marks a player missing. Ids outside the loaded roster are refused.
    pub fn mark_absent(&mut self, side: Side, id: u32, cache: &QueryCache<Payload>) -> bool {
        if !self.known_ids(side, cache).contains(&id) {
            return false;
        }
        if self.selections.side(side).contains(id) {
            return false;
        }
        self.remember_display(cache);
        self.selections.add(side, id)
    }

    pub fn unmark_absent(&mut self, side: Side, id: u32, cache: &QueryCache<Payload>) -> bool {
        if !self.selections.side(side).contains(id) {
            return false;
        }
        self.remember_display(cache);
        self.selections.remove(side, id)
    }

    /// Flips a player's missing flag. Returns whether the player is now
    /// marked missing.
    pub fn toggle_absent(&mut self, side: Side, id: u32, cache: &QueryCache<Payload>) -> bool {
        if self.selections.side(side).contains(id) {
            self.unmark_absent(side, id, cache);
            false
        } else {
            self.mark_absent(side, id, cache)
        }
    }

    pub fn clear_selections(&mut self, cache: &QueryCache<Payload>) {
        if self.selections.is_empty() {
            return;
        }
        self.remember_display(cache);
        self.selections.clear();
    }

    /// Claims the fetches the current state needs and cancels an adjusted
    /// fetch that the selection has moved away from.
    pub fn sync(&mut self, cache: &mut QueryCache<Payload>) -> Vec<(FetchTicket, Query)> {
        let mut out = Vec::new();
        let Some(baseline) = self.baseline_query() else {
            return out;
        };
        let baseline_key = baseline.key();
        if let Some(ticket) = cache.begin(&baseline_key) {
            out.push((ticket, baseline));
        }
        for side in [Side::Home, Side::Away] {
            if let Some(query) = self.roster_query(side)
                && let Some(ticket) = cache.begin(&query.key())
            {
                out.push((ticket, query));
            }
        }

        let adjusted = self.adjusted_query(cache);
        let adjusted_key = adjusted.as_ref().map(Query::key);
        if self.requested_adjusted != adjusted_key {
            if let Some(stale) = self.requested_adjusted.take()
                && cache.is_loading(&stale)
            {
                cache.cancel(&stale);
            }
            self.requested_adjusted = adjusted_key.clone();
        }

        let baseline_ready = cache.status(&baseline_key) == Some(QueryStatus::Success);
        if baseline_ready
            && let Some(query) = adjusted
            && let Some(ticket) = cache.begin(&query.key())
        {
            debug!(key = %ticket.key, "requesting adjusted prediction");
            out.push((ticket, query));
        }
        out
    }

    /// Key of the prediction currently on screen.
    pub fn displayed_key(&self, cache: &QueryCache<Payload>) -> Option<QueryKey> {
        let baseline_key = self.baseline_query()?.key();
        let has_data = |key: &QueryKey| cache.data(key).is_some_and(|p| p.as_prediction().is_some());
        if !has_data(&baseline_key) {
            return None;
        }
        let Some(adjusted) = self.adjusted_query(cache) else {
            return Some(baseline_key);
        };
        let adjusted_key = adjusted.key();
        if has_data(&adjusted_key) {
            return Some(adjusted_key);
        }
        match &self.fallback {
            Some(key) if has_data(key) => Some(key.clone()),
            _ => Some(baseline_key),
        }
    }

    pub fn display<'a>(&self, cache: &'a QueryCache<Payload>) -> Option<&'a InteractiveMatchPrediction> {
        let key = self.displayed_key(cache)?;
        cache.data(&key).and_then(|p| p.as_prediction())
    }

    pub fn phase(&self, cache: &QueryCache<Payload>) -> SimPhase {
        let Some(baseline) = self.baseline_query() else {
            return SimPhase::Loading;
        };
        let baseline_key = baseline.key();
        match cache.status(&baseline_key) {
            Some(QueryStatus::Error) if cache.data(&baseline_key).is_none() => {
                return SimPhase::Failed;
            }
            None | Some(QueryStatus::Loading) if cache.data(&baseline_key).is_none() => {
                return SimPhase::Loading;
            }
            _ => {}
        }
        let Some(adjusted) = self.adjusted_query(cache) else {
            return SimPhase::BaselineOnly;
        };
        let key = adjusted.key();
        match cache.status(&key) {
            Some(QueryStatus::Success) => SimPhase::Adjusted,
            Some(QueryStatus::Error) => SimPhase::Failed,
            Some(QueryStatus::Loading) | None => SimPhase::Recalculating,
        }
    }

    pub fn is_recalculating(&self, cache: &QueryCache<Payload>) -> bool {
        self.phase(cache) == SimPhase::Recalculating
    }

    /// Error of the request the view is waiting on, if it failed.
    pub fn error<'a>(&self, cache: &'a QueryCache<Payload>) -> Option<&'a str> {
        let key = self.failed_query(cache)?.key();
        cache.get(&key).and_then(|e| e.error.as_deref())
    }

    /// The failed request to re-issue on a manual retry.
    pub fn failed_query(&self, cache: &QueryCache<Payload>) -> Option<Query> {
        let baseline = self.baseline_query()?;
        if cache.status(&baseline.key()) == Some(QueryStatus::Error) {
            return Some(baseline);
        }
        let adjusted = self.adjusted_query(cache)?;
        (cache.status(&adjusted.key()) == Some(QueryStatus::Error)).then_some(adjusted)
    }

    pub fn has_high_blowout_risk(&self, cache: &QueryCache<Payload>) -> bool {
        self.display(cache).is_some_and(has_high_blowout_risk)
    }

    pub fn usage_boost(&self, side: Side, cache: &QueryCache<Payload>) -> Option<f64> {
        self.display(cache).and_then(|p| usage_boost(p, side))
    }

    fn remember_display(&mut self, cache: &QueryCache<Payload>) {
        if let Some(key) = self.displayed_key(cache) {
            self.fallback = Some(key);
        }
    }
}

pub fn has_high_blowout_risk(prediction: &InteractiveMatchPrediction) -> bool {
    prediction
        .all_players()
        .any(|p| p.blowout_analysis.risk_level == RiskLevel::High)
}

/// Usage boost for `side` when there is one to badge.
pub fn usage_boost(prediction: &InteractiveMatchPrediction, side: Side) -> Option<f64> {
    let boost = match side {
        Side::Home => prediction.match_context.home_usage_boost,
        Side::Away => prediction.match_context.away_usage_boost,
    };
    (boost > 0.0).then_some(boost)
}

/// Badge text for a usage boost. The API reports the boost in percent.
pub fn usage_boost_label(boost: f64) -> String {
    format!("+{boost:.1}%")
}

pub fn missing_penalty(prediction: &InteractiveMatchPrediction, side: Side) -> f64 {
    match side {
        Side::Home => prediction.match_context.home_missing_penalty,
        Side::Away => prediction.match_context.away_missing_penalty,
    }
}

pub fn phase_label(phase: SimPhase) -> &'static str {
    match phase {
        SimPhase::Loading => "LOADING",
        SimPhase::BaselineOnly => "BASELINE",
        SimPhase::Recalculating => "RECALCULATING",
        SimPhase::Adjusted => "ADJUSTED",
        SimPhase::Failed => "UNAVAILABLE",
    }
}
