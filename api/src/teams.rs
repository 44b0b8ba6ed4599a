/// NBA destination teams as printed on mock draft boards, mapped to ESPN CDN
/// logos. Boards abbreviate inconsistently ("Golden St.", "Oklahoma Cty"), so
/// both spellings are listed.
const NBA_TEAM_LOGOS: &[(&str, &str)] = &[
    ("Atlanta", "https://a.espncdn.com/i/teamlogos/nba/500/atl.png"),
    ("Boston", "https://a.espncdn.com/i/teamlogos/nba/500/bos.png"),
    ("Brooklyn", "https://a.espncdn.com/i/teamlogos/nba/500/bkn.png"),
    ("Charlotte", "https://a.espncdn.com/i/teamlogos/nba/500/cha.png"),
    ("Chicago", "https://a.espncdn.com/i/teamlogos/nba/500/chi.png"),
    ("Cleveland", "https://a.espncdn.com/i/teamlogos/nba/500/cle.png"),
    ("Dallas", "https://a.espncdn.com/i/teamlogos/nba/500/dal.png"),
    ("Denver", "https://a.espncdn.com/i/teamlogos/nba/500/den.png"),
    ("Detroit", "https://a.espncdn.com/i/teamlogos/nba/500/det.png"),
    ("Golden St.", "https://a.espncdn.com/i/teamlogos/nba/500/gs.png"),
    ("Golden State", "https://a.espncdn.com/i/teamlogos/nba/500/gs.png"),
    ("Houston", "https://a.espncdn.com/i/teamlogos/nba/500/hou.png"),
    ("Indiana", "https://a.espncdn.com/i/teamlogos/nba/500/ind.png"),
    ("LA Clippers", "https://a.espncdn.com/i/teamlogos/nba/500/lac.png"),
    ("LA Lakers", "https://a.espncdn.com/i/teamlogos/nba/500/lal.png"),
    ("Memphis", "https://a.espncdn.com/i/teamlogos/nba/500/mem.png"),
    ("Miami", "https://a.espncdn.com/i/teamlogos/nba/500/mia.png"),
    ("Milwaukee", "https://a.espncdn.com/i/teamlogos/nba/500/mil.png"),
    ("Minnesota", "https://a.espncdn.com/i/teamlogos/nba/500/min.png"),
    ("New Orleans", "https://a.espncdn.com/i/teamlogos/nba/500/no.png"),
    ("New York", "https://a.espncdn.com/i/teamlogos/nba/500/ny.png"),
    ("Oklahoma Cty", "https://a.espncdn.com/i/teamlogos/nba/500/okc.png"),
    ("Oklahoma City", "https://a.espncdn.com/i/teamlogos/nba/500/okc.png"),
    ("Orlando", "https://a.espncdn.com/i/teamlogos/nba/500/orl.png"),
    ("Philadelphia", "https://a.espncdn.com/i/teamlogos/nba/500/phi.png"),
    ("Phoenix", "https://a.espncdn.com/i/teamlogos/nba/500/phx.png"),
    ("Portland", "https://a.espncdn.com/i/teamlogos/nba/500/por.png"),
    ("Sacramento", "https://a.espncdn.com/i/teamlogos/nba/500/sac.png"),
    ("San Antonio", "https://a.espncdn.com/i/teamlogos/nba/500/sa.png"),
    ("Toronto", "https://a.espncdn.com/i/teamlogos/nba/500/tor.png"),
    ("Utah", "https://a.espncdn.com/i/teamlogos/nba/500/utah.png"),
    ("Washington", "https://a.espncdn.com/i/teamlogos/nba/500/wsh.png"),
];

/// Logo URL for a destination team label; `*` provisional markers are ignored.
pub fn logo_url(team: &str) -> Option<&'static str> {
    let name = team.trim().replace('*', "");
    if name.is_empty() {
        return None;
    }
    NBA_TEAM_LOGOS
        .iter()
        .find(|(label, _)| *label == name)
        .map(|(_, url)| *url)
}
