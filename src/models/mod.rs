use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server metadata decoded from the `\key\value` block. Sorted map so the
/// rendered payload has a stable key order.
pub type ServerInfo = BTreeMap<String, String>;

/// One row of a player list. All values stay as the raw text the server
/// sent; names may contain embedded spaces and color escapes (`^7` etc).
///
/// Which optional fields are present depends on where the record came from:
/// the short `getstatus` list carries only the first four, the `rcon status`
/// table adds the rest according to the protocol's column layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub slot: String,
    pub score: String,
    pub ping: String,
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastmsg: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub qport: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub playerid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub steamid: Option<String>,
}

impl PlayerRecord {
    /// Numeric invariants every emitted record must satisfy: `slot` all
    /// digits, `score` empty/digits/`-digits`, `ping` empty or digits.
    /// Rows that fail are dropped by the decoders, never emitted partial.
    pub fn valid(&self) -> bool {
        crate::parse::tokens::all_digits(&self.slot)
            && crate::parse::tokens::valid_score(&self.score)
            && crate::parse::tokens::valid_ping(&self.ping)
    }
}

/// Decoded outcome of a single query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryResult {
    /// Envelope-stripped body, verbatim (`raw=true`).
    Raw(String),
    /// `getinfo`/`getstatus`: metadata block plus the short player list.
    Info {
        server: ServerInfo,
        players: Vec<PlayerRecord>,
    },
    /// `rcon status`: players only, decoded from the admin table.
    Status { players: Vec<PlayerRecord> },
    /// Any other rcon command: the console output, wrapped opaquely.
    Console(String),
    /// `rcon map <name>`: fixed acknowledgment, reply body never parsed.
    MapChange(String),
}

impl QueryResult {
    /// Renders the stable textual payload handed to callers.
    ///
    /// This is deliberately not `serde_json`: the escaping rules are the
    /// original wire contract (carriage returns dropped, control bytes
    /// passed through verbatim) and consumers depend on them byte-for-byte.
    pub fn render(&self) -> String {
        match self {
            QueryResult::Raw(body) => body.clone(),
            QueryResult::Info { server, players } => {
                let mut out = String::from("{\"server\":{");
                let mut first = true;
                for (k, v) in server {
                    if !first {
                        out.push(',');
                    }
                    out.push('"');
                    out.push_str(&escape(k));
                    out.push_str("\":\"");
                    out.push_str(&escape(v));
                    out.push('"');
                    first = false;
                }
                out.push_str("},\"players\":[");
                render_players(&mut out, players);
                out.push_str("]}");
                out
            }
            QueryResult::Status { players } => {
                let mut out = String::from("{\"players\":[");
                render_players(&mut out, players);
                out.push_str("]}");
                out
            }
            QueryResult::Console(body) => {
                format!("{{\"response\":\"{}\"}}", escape(body))
            }
            QueryResult::MapChange(map) => format!(
                "{{\"status\":\"success\",\"message\":\"Map changed to {}\"}}",
                escape(map)
            ),
        }
    }
}

fn render_players(out: &mut String, players: &[PlayerRecord]) {
    let mut first = true;
    for p in players {
        if !first {
            out.push(',');
        }
        out.push('{');
        push_field(out, "slot", &p.slot, true);
        push_field(out, "score", &p.score, false);
        push_field(out, "ping", &p.ping, false);
        push_field(out, "name", &p.name, false);
        for (key, value) in [
            ("lastmsg", &p.lastmsg),
            ("address", &p.address),
            ("qport", &p.qport),
            ("rate", &p.rate),
            ("guid", &p.guid),
            ("playerid", &p.playerid),
            ("steamid", &p.steamid),
        ] {
            if let Some(value) = value {
                push_field(out, key, value, false);
            }
        }
        out.push('}');
        first = false;
    }
}

fn push_field(out: &mut String, key: &str, value: &str, first: bool) {
    if !first {
        out.push(',');
    }
    out.push('"');
    out.push_str(key);
    out.push_str("\":\"");
    out.push_str(&escape(value));
    out.push('"');
}

/// Escapes a string for the rendered payload: `"`, `\` and newline get a
/// backslash escape, carriage returns are dropped entirely, everything else
/// passes through untouched.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_rules() {
        assert_eq!(escape(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("line1\nline2"), "line1\\nline2");
        assert_eq!(escape("strip\rme"), "stripme");
        // control bytes other than CR/LF pass through verbatim
        assert_eq!(escape("a\x01b"), "a\x01b");
        assert_eq!(escape("^1Red^7"), "^1Red^7");
    }

    #[test]
    fn info_render_shape() {
        let mut server = ServerInfo::new();
        server.insert("mapname".into(), "mp_harbor".into());
        server.insert("sv_hostname".into(), "\"quoted\"".into());
        let players = vec![PlayerRecord {
            slot: "3".into(),
            score: "0".into(),
            ping: "0".into(),
            name: "Hero".into(),
            ..Default::default()
        }];
        let rendered = QueryResult::Info { server, players }.render();
        assert_eq!(
            rendered,
            "{\"server\":{\"mapname\":\"mp_harbor\",\"sv_hostname\":\"\\\"quoted\\\"\"},\
             \"players\":[{\"slot\":\"3\",\"score\":\"0\",\"ping\":\"0\",\"name\":\"Hero\"}]}"
        );
        // also valid JSON as far as serde_json is concerned
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["server"]["mapname"], "mp_harbor");
        assert_eq!(parsed["players"][0]["name"], "Hero");
    }

    #[test]
    fn optional_fields_are_omitted_not_null() {
        let players = vec![PlayerRecord {
            slot: "0".into(),
            score: "7".into(),
            ping: "42".into(),
            name: "x".into(),
            lastmsg: Some("0".into()),
            rate: Some("25000".into()),
            ..Default::default()
        }];
        let rendered = QueryResult::Status { players }.render();
        assert_eq!(
            rendered,
            "{\"players\":[{\"slot\":\"0\",\"score\":\"7\",\"ping\":\"42\",\"name\":\"x\",\
             \"lastmsg\":\"0\",\"rate\":\"25000\"}]}"
        );
        assert!(!rendered.contains("null"));
        assert!(!rendered.contains("guid"));
    }

    #[test]
    fn map_change_ack_is_fixed() {
        assert_eq!(
            QueryResult::MapChange("mp_harbor".into()).render(),
            "{\"status\":\"success\",\"message\":\"Map changed to mp_harbor\"}"
        );
    }

    #[test]
    fn console_wrap() {
        assert_eq!(
            QueryResult::Console("Map rotation:\nmp_carentan".into()).render(),
            "{\"response\":\"Map rotation:\\nmp_carentan\"}"
        );
    }

    #[test]
    fn raw_passes_through() {
        let body = "\\k\\v\n1 2 \"n\"\n";
        assert_eq!(QueryResult::Raw(body.into()).render(), body);
    }

    #[test]
    fn record_invariants() {
        let mut p = PlayerRecord {
            slot: "3".into(),
            score: "-5".into(),
            ping: "".into(),
            name: "".into(),
            ..Default::default()
        };
        assert!(p.valid());
        p.slot = "3a".into();
        assert!(!p.valid());
        p.slot = "3".into();
        p.ping = "high".into();
        assert!(!p.valid());
    }
}
