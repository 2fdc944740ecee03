use crate::api_types::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

pub fn side_label(side: Side) -> &'static str {
    match side {
        Side::Home => "Home",
        Side::Away => "Away",
    }
}

/// Unique player ids in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<u32>,
}

impl SelectionSet {
    pub fn add(&mut self, id: u32) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.ids.len();
        self.ids.retain(|existing| *existing != id);
        self.ids.len() != before
    }

    pub fn toggle(&mut self, id: u32) -> bool {
        if !self.remove(id) {
            self.ids.push(id);
        }
        self.contains(id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.contains(&id)
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Ids confirmed by `known`, in insertion order. Ids not (or not yet)
    /// present in the loaded roster are dropped.
    pub fn resolved_ids(&self, known: &[u32]) -> Vec<u32> {
        self.ids
            .iter()
            .copied()
            .filter(|id| known.contains(id))
            .collect()
    }
}

/// Missing-player selections for both sides of a matchup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selections {
    pub home: SelectionSet,
    pub away: SelectionSet,
}

impl Selections {
    pub fn side(&self, side: Side) -> &SelectionSet {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SelectionSet {
        match side {
            Side::Home => &mut self.home,
            Side::Away => &mut self.away,
        }
    }

    pub fn add(&mut self, side: Side, id: u32) -> bool {
        self.side_mut(side).add(id)
    }

    pub fn remove(&mut self, side: Side, id: u32) -> bool {
        self.side_mut(side).remove(id)
    }

    pub fn clear(&mut self) {
        self.home.clear();
        self.away.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.home.is_empty() && self.away.is_empty()
    }
}

/// Request-key fragment for an id list: sorted and comma-joined, so the same
/// set always encodes the same way regardless of click order.
pub fn ids_key(ids: &[u32]) -> String {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Roster entries whose name contains `query` (ASCII case-insensitive). An
/// empty query matches everything.
pub fn filter_roster<'a>(roster: &'a [RosterEntry], query: &str) -> Vec<&'a RosterEntry> {
    let needle = query.trim();
    roster
        .iter()
        .filter(|entry| contains_ascii_ci(&entry.name, needle))
        .collect()
}

pub const NO_PLAYERS_FOUND: &str = "No players found";

fn contains_ascii_ci(haystack: &str, needle: &str) -> bool {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.len() > h.len() {
        return false;
    }
    if n.is_empty() {
        return true;
    }
    h.windows(n.len())
        .any(|window| window.iter().zip(n).all(|(a, b)| a.eq_ignore_ascii_case(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, name: &str) -> RosterEntry {
        RosterEntry {
            id,
            name: name.to_string(),
            team: "GSW".to_string(),
        }
    }

    #[test]
    fn toggle_flips_membership() {
        let mut set = SelectionSet::default();
        assert!(set.toggle(7));
        assert!(!set.toggle(7));
        assert!(set.is_empty());
    }

    #[test]
    fn ids_key_is_order_independent() {
        assert_eq!(ids_key(&[3, 1, 2]), "1,2,3");
        assert_eq!(ids_key(&[2, 3, 1]), ids_key(&[1, 2, 3]));
        assert_eq!(ids_key(&[]), "");
    }

    #[test]
    fn roster_filter_is_case_insensitive() {
        let roster = vec![entry(201939, "Stephen Curry"), entry(1, "Draymond Green")];
        let hits = filter_roster(&roster, "curry");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 201939);
        assert_eq!(filter_roster(&roster, "").len(), 2);
        assert!(filter_roster(&roster, "zzz").is_empty());
    }
}
