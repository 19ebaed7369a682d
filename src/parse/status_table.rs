//! Decoder for the human-readable table printed by `rcon status`.
//!
//! The table is meant for admins, not machines: the name column has no
//! delimiter, may embed spaces and color escapes, and its width varies per
//! server build. The layout differs between protocols and, for Call of
//! Duty, between Steam and non-Steam server variants, so a first pass
//! detects the variant before any row is decoded.

use crate::models::PlayerRecord;
use crate::parse::tokens::all_digits;

/// Identity columns between `ping` and `name`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdColumns {
    /// No identity columns (Medal of Honor).
    None,
    /// Single `guid` column (non-Steam Call of Duty).
    Guid,
    /// `playerid` + `steamid` pair (Steam Call of Duty).
    SteamPair,
}

/// Column layout of one table variant. The name-boundary heuristic takes
/// this as data so new variants are added here, not as new branching logic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableLayout {
    pub id_columns: IdColumns,
    /// When set, a `^7` before the `lastmsg` number ends the name right
    /// after the last such marker. Recovers names with a trailing color
    /// reset followed by stray characters (Call of Duty only).
    pub caret_name_rule: bool,
}

impl TableLayout {
    /// slot score ping name lastmsg address qport rate
    pub const MOH: TableLayout = TableLayout {
        id_columns: IdColumns::None,
        caret_name_rule: false,
    };
    /// slot score ping guid name lastmsg address qport rate
    pub const COD: TableLayout = TableLayout {
        id_columns: IdColumns::Guid,
        caret_name_rule: true,
    };
    /// slot score ping playerid steamid name lastmsg address qport rate
    pub const COD_STEAM: TableLayout = TableLayout {
        id_columns: IdColumns::SteamPair,
        caret_name_rule: true,
    };

    /// Whitespace-split columns before the name.
    fn leading_columns(&self) -> usize {
        3 + match self.id_columns {
            IdColumns::None => 0,
            IdColumns::Guid => 1,
            IdColumns::SteamPair => 2,
        }
    }
}

/// Pairs the layouts a protocol uses for the two server variants; the
/// variant detection pass picks between them. Medal of Honor uses the same
/// layout for both.
#[derive(Clone, Copy, Debug)]
pub struct VariantLayouts {
    pub steam: TableLayout,
    pub non_steam: TableLayout,
}

/// Banner and separator lines skipped during the row pass (substring match
/// on the trimmed line; spacing in the last four is how the servers print
/// their console banner).
const HEADER_MARKERS: [&str; 8] = [
    "map:",
    "num score ping",
    "----",
    "hostname:",
    "version :",
    "udp/ip  :",
    "os      :",
    "type    :",
];

/// Decodes all player rows from an `rcon status` body. Rows with missing
/// columns or failing the numeric invariants are dropped silently.
pub fn parse_status_table(body: &str, variants: &VariantLayouts) -> Vec<PlayerRecord> {
    let layout = if detect_steam(body) {
        variants.steam
    } else {
        variants.non_steam
    };

    let mut players = Vec::new();
    for line in body.split('\n') {
        let line = line.trim();
        if line.is_empty() || HEADER_MARKERS.iter().any(|m| line.contains(m)) {
            continue;
        }
        if let Some(player) = parse_row(line, layout) {
            if player.valid() {
                players.push(player);
            }
        }
    }
    players
}

/// Variant detection: the first trimmed line carrying a marker decides, and
/// the decision holds for the whole table. `hostname:` banners and the
/// `playerid steamid` column header mean Steam; `map:` banners and the
/// `guid` column header mean non-Steam; no marker at all means non-Steam.
fn detect_steam(body: &str) -> bool {
    for line in body.split('\n') {
        let line = line.trim().to_lowercase();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("hostname:") {
            return true;
        }
        if line.starts_with("map:") {
            return false;
        }
        if line.contains("num score ping playerid steamid name") {
            return true;
        }
        if line.contains("num score ping guid name") {
            return false;
        }
    }
    false
}

fn parse_row(line: &str, layout: TableLayout) -> Option<PlayerRecord> {
    let mut cur = Scanner::new(line);

    let mut leading = Vec::with_capacity(5);
    for _ in 0..layout.leading_columns() {
        leading.push(cur.word()?.to_string());
    }
    let name = cur.name_field(layout.caret_name_rule);
    let lastmsg = cur.word()?.to_string();
    let address = cur.word()?.to_string();
    let qport = cur.word()?.to_string();
    let rate = cur.rest()?.to_string();

    let mut player = PlayerRecord {
        slot: leading[0].clone(),
        score: leading[1].clone(),
        ping: leading[2].clone(),
        name,
        lastmsg: Some(lastmsg),
        address: Some(address),
        qport: Some(qport),
        rate: Some(rate),
        ..Default::default()
    };
    match layout.id_columns {
        IdColumns::None => {}
        IdColumns::Guid => player.guid = Some(leading[3].clone()),
        IdColumns::SteamPair => {
            player.playerid = Some(leading[3].clone());
            player.steamid = Some(leading[4].clone());
        }
    }
    Some(player)
}

/// Offset-tracking walker over one row. Needed because the name column is
/// positional: everything else splits on spaces, the name does not.
struct Scanner<'a> {
    line: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(line: &'a str) -> Self {
        Scanner { line, pos: 0 }
    }

    fn skip_spaces(&mut self) {
        let bytes = self.line.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] == b' ' {
            self.pos += 1;
        }
    }

    /// Next space-delimited word, or None at end of line.
    fn word(&mut self) -> Option<&'a str> {
        self.skip_spaces();
        if self.pos >= self.line.len() {
            return None;
        }
        let start = self.pos;
        let bytes = self.line.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] != b' ' {
            self.pos += 1;
        }
        Some(&self.line[start..self.pos])
    }

    /// Extracts the name column. The boundary is found by scanning forward
    /// for the next purely-numeric word (the `lastmsg` value); with the
    /// caret rule, a `^7` ahead of that word pulls the boundary back to
    /// just after the last such marker. A numeric word at the very start
    /// means the name itself is empty. If no numeric word exists the name
    /// takes the rest of the line and the row dies on the missing columns.
    fn name_field(&mut self, caret_rule: bool) -> String {
        self.skip_spaces();
        let start = self.pos;

        let mut probe = Scanner {
            line: self.line,
            pos: start,
        };
        loop {
            probe.skip_spaces();
            let word_start = probe.pos;
            match probe.word() {
                Some(w) if all_digits(w) => {
                    let mut end = word_start;
                    if caret_rule {
                        if let Some(r) = self.line[start..word_start].rfind("^7") {
                            end = start + r + 2;
                        }
                    }
                    let name = self.line[start..end].trim_end().to_string();
                    self.pos = end;
                    return name;
                }
                Some(_) => continue,
                None => {
                    self.pos = self.line.len();
                    return self.line[start..].trim_end().to_string();
                }
            }
        }
    }

    /// Remainder of the line, right-trimmed. None when nothing is left.
    fn rest(&mut self) -> Option<&'a str> {
        self.skip_spaces();
        if self.pos >= self.line.len() {
            return None;
        }
        let out = self.line[self.pos..].trim_end();
        self.pos = self.line.len();
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOH_LAYOUTS: VariantLayouts = VariantLayouts {
        steam: TableLayout::MOH,
        non_steam: TableLayout::MOH,
    };
    const COD_LAYOUTS: VariantLayouts = VariantLayouts {
        steam: TableLayout::COD_STEAM,
        non_steam: TableLayout::COD,
    };

    #[test]
    fn moh_table() {
        let body = "\nmap: dm/mohdm6\n\
                    num score ping name            lastmsg address               qport  rate\n\
                    --- ----- ---- --------------- ------- --------------------- ------ -----\n\
                    \x20 0     5   48 Snake Eater          0 192.168.1.17:12203    4625   9000\n\
                    \x20 2    12  110 ^2Green^7           33 10.0.0.8:12203        11111  25000\n";
        let players = parse_status_table(body, &MOH_LAYOUTS);
        assert_eq!(players.len(), 2);
        let p = &players[0];
        assert_eq!(p.slot, "0");
        assert_eq!(p.score, "5");
        assert_eq!(p.ping, "48");
        assert_eq!(p.name, "Snake Eater");
        assert_eq!(p.lastmsg.as_deref(), Some("0"));
        assert_eq!(p.address.as_deref(), Some("192.168.1.17:12203"));
        assert_eq!(p.qport.as_deref(), Some("4625"));
        assert_eq!(p.rate.as_deref(), Some("9000"));
        assert!(p.guid.is_none());
        assert_eq!(players[1].name, "^2Green^7");
    }

    #[test]
    fn cod_non_steam_table() {
        let body = "map: mp_harbor\n\
                    num score ping guid   name            lastmsg address               qport rate\n\
                    --- ----- ---- ------ --------------- ------- --------------------- ----- -----\n\
                    \x20 0     3   42 123456 Soldier^7            0 12.34.56.78:28960     1337  25000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        assert_eq!(players.len(), 1);
        let p = &players[0];
        assert_eq!(p.slot, "0");
        assert_eq!(p.guid.as_deref(), Some("123456"));
        assert_eq!(p.name, "Soldier^7");
        assert_eq!(p.lastmsg.as_deref(), Some("0"));
        assert_eq!(p.rate.as_deref(), Some("25000"));
        assert!(p.playerid.is_none());
    }

    #[test]
    fn cod_steam_table() {
        let body = "hostname: ^2Steam Server\n\
                    num score ping playerid steamid           name            lastmsg address             qport rate\n\
                    --- ----- ---- -------- ----------------- --------------- ------- ------------------- ----- -----\n\
                    \x20 4    -1  999 1234     76561198000000000 Maj. Pain^7          0 9.8.7.6:28960       100   25000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        assert_eq!(players.len(), 1);
        let p = &players[0];
        assert_eq!(p.slot, "4");
        assert_eq!(p.score, "-1");
        assert_eq!(p.playerid.as_deref(), Some("1234"));
        assert_eq!(p.steamid.as_deref(), Some("76561198000000000"));
        assert_eq!(p.name, "Maj. Pain^7");
        assert_eq!(p.qport.as_deref(), Some("100"));
    }

    #[test]
    fn guid_header_forces_non_steam_layout() {
        // No map:/hostname: banner; the column header alone fixes the layout.
        let body = "num score ping guid name lastmsg address qport rate\n\
                    \x200 0 10 9999 NoBanner 0 1.2.3.4:28960 7 5000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].guid.as_deref(), Some("9999"));
        assert!(players[0].steamid.is_none());
    }

    #[test]
    fn steam_header_forces_steam_layout() {
        let body = "num score ping playerid steamid name lastmsg address qport rate\n\
                    \x200 0 10 55 765 Someone 0 1.2.3.4:28960 7 5000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].playerid.as_deref(), Some("55"));
        assert_eq!(players[0].steamid.as_deref(), Some("765"));
    }

    #[test]
    fn first_marker_wins() {
        // map: comes first, so the later steam column header cannot flip it.
        let body = "map: mp_carentan\n\
                    num score ping playerid steamid name lastmsg address qport rate\n";
        assert!(!detect_steam(body));
    }

    #[test]
    fn name_with_embedded_spaces_before_numeric_lastmsg() {
        let body = "map: q\n 1 10 50 777 la li lu le lo 12 1.1.1.1:28960 9 25000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        assert_eq!(players.len(), 1);
        // caret rule has no ^7 to bite on; name ends before the numeric 12
        assert_eq!(players[0].name, "la li lu le lo");
        assert_eq!(players[0].lastmsg.as_deref(), Some("12"));
    }

    #[test]
    fn caret_rule_backs_off_to_last_color_reset() {
        let body = "map: q\n 1 10 50 777 Namer^7 junk 12 1.1.1.1:28960 9 25000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        // name ends right after ^7; the stray word shifts into lastmsg and
        // the remaining columns shift with it
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Namer^7");
        assert_eq!(players[0].lastmsg.as_deref(), Some("junk"));
        assert_eq!(players[0].rate.as_deref(), Some("9 25000"));

        let body = "map: q\n 1 10 50 777 A B^7 12 1.1.1.1:28960 9 25000\n";
        let players = parse_status_table(body, &COD_LAYOUTS);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "A B^7");
    }

    #[test]
    fn caret_rule_disabled_for_moh() {
        let body = "map: dm\n 1 10 50 Col^7on 12 1.1.1.1:12203 9 25000\n";
        let players = parse_status_table(body, &MOH_LAYOUTS);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Col^7on");
    }

    #[test]
    fn numeric_first_word_means_empty_name() {
        let body = "map: dm\n 3 0 20 12 1.1.1.1:12203 9 25000\n";
        let players = parse_status_table(body, &MOH_LAYOUTS);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "");
        assert_eq!(players[0].lastmsg.as_deref(), Some("12"));
    }

    #[test]
    fn short_row_is_dropped() {
        let body = "map: dm\n 3 0 20 OnlyHalf 12 1.1.1.1:12203\n";
        assert!(parse_status_table(body, &MOH_LAYOUTS).is_empty());
    }

    #[test]
    fn row_without_numeric_boundary_is_dropped() {
        let body = "map: dm\n 3 0 20 all words no numbers anywhere\n";
        assert!(parse_status_table(body, &MOH_LAYOUTS).is_empty());
    }

    #[test]
    fn invalid_ping_is_dropped() {
        let body = "map: dm\n 3 0 CNCT Joining 12 1.1.1.1:12203 9 25000\n";
        assert!(parse_status_table(body, &MOH_LAYOUTS).is_empty());
    }

    #[test]
    fn rate_takes_line_remainder() {
        let body = "map: dm\n 3 0 20 Name 12 1.1.1.1:12203 9 25000 trailing bits\n";
        let players = parse_status_table(body, &MOH_LAYOUTS);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].rate.as_deref(), Some("25000 trailing bits"));
    }
}
