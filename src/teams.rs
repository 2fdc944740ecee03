/// Full franchise names (and a few common short forms) to three-letter codes.
const TEAM_CODES: &[(&str, &str)] = &[
    ("Atlanta Hawks", "ATL"),
    ("Boston Celtics", "BOS"),
    ("Brooklyn Nets", "BKN"),
    ("Charlotte Hornets", "CHA"),
    ("Chicago Bulls", "CHI"),
    ("Cleveland Cavaliers", "CLE"),
    ("Dallas Mavericks", "DAL"),
    ("Denver Nuggets", "DEN"),
    ("Detroit Pistons", "DET"),
    ("Golden State Warriors", "GSW"),
    ("Houston Rockets", "HOU"),
    ("Indiana Pacers", "IND"),
    ("LA Clippers", "LAC"),
    ("Los Angeles Clippers", "LAC"),
    ("Los Angeles Lakers", "LAL"),
    ("LA Lakers", "LAL"),
    ("Memphis Grizzlies", "MEM"),
    ("Miami Heat", "MIA"),
    ("Milwaukee Bucks", "MIL"),
    ("Minnesota Timberwolves", "MIN"),
    ("New Orleans Pelicans", "NOP"),
    ("New York Knicks", "NYK"),
    ("Oklahoma City Thunder", "OKC"),
    ("Orlando Magic", "ORL"),
    ("Philadelphia 76ers", "PHI"),
    ("Phoenix Suns", "PHX"),
    ("Portland Trail Blazers", "POR"),
    ("Sacramento Kings", "SAC"),
    ("San Antonio Spurs", "SAS"),
    ("Toronto Raptors", "TOR"),
    ("Utah Jazz", "UTA"),
    ("Washington Wizards", "WAS"),
];

/// Code for a team given as a full name, a nickname ("Lakers") or already
/// as a code. Unknown names yield `None`.
pub fn team_code(name: &str) -> Option<&'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some((_, code)) = TEAM_CODES
        .iter()
        .find(|(_, code)| code.eq_ignore_ascii_case(trimmed))
    {
        return Some(*code);
    }
    if let Some((_, code)) = TEAM_CODES
        .iter()
        .find(|(full, _)| full.eq_ignore_ascii_case(trimmed))
    {
        return Some(*code);
    }
    TEAM_CODES
        .iter()
        .find(|(full, _)| {
            full.rsplit(' ')
                .next()
                .is_some_and(|nick| nick.eq_ignore_ascii_case(trimmed))
        })
        .map(|(_, code)| *code)
}

/// Resolves the code to request a team by: an explicit id from the API wins,
/// then the name lookup, then the upper-cased name as given.
pub fn resolve_team_code(explicit: Option<&str>, name: &str) -> String {
    if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_ascii_uppercase();
    }
    team_code(name)
        .map(str::to_string)
        .unwrap_or_else(|| name.trim().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_names_nicknames_and_codes() {
        assert_eq!(team_code("Los Angeles Lakers"), Some("LAL"));
        assert_eq!(team_code("celtics"), Some("BOS"));
        assert_eq!(team_code("gsw"), Some("GSW"));
        assert_eq!(team_code("Trail Blazers"), None);
        assert_eq!(team_code("Blazers"), Some("POR"));
        assert_eq!(team_code(""), None);
    }

    #[test]
    fn explicit_id_wins() {
        assert_eq!(resolve_team_code(Some("lal"), "Boston Celtics"), "LAL");
        assert_eq!(resolve_team_code(Some("  "), "Boston Celtics"), "BOS");
        assert_eq!(resolve_team_code(None, "Seattle"), "SEATTLE");
    }
}
