//! Decoder for the short player list appended to a `getstatus` reply: the
//! `\key\value` header followed by one whitespace-tokenized row per player.

use crate::models::PlayerRecord;
use crate::parse::tokens::split_quoted;

/// Column layout of an info/status player row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfoRowLayout {
    /// Medal of Honor: `slot "name"`; score and ping are synthesized as 0.
    SlotName,
    /// Call of Duty: `score ping "name"`; slot is synthesized as 0.
    ScorePingName,
}

/// Decodes player rows from a `getstatus`/`getinfo` body. The body still
/// contains the key/value header; while in the header, lines starting with
/// a backslash are skipped, and either a blank line or the first
/// non-backslash line ends header mode. Rows that are too short, lack a
/// properly quoted name, or fail the numeric invariants are dropped.
pub fn parse_info_players(body: &str, layout: InfoRowLayout) -> Vec<PlayerRecord> {
    let mut players = Vec::new();
    let mut in_header = true;

    for line in body.split('\n') {
        if line.is_empty() {
            in_header = false;
            continue;
        }
        if in_header && line.starts_with('\\') {
            continue;
        }
        in_header = false;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let tokens = split_quoted(line);
        if let Some(player) = decode_row(&tokens, layout) {
            if player.valid() {
                players.push(player);
            }
        }
    }

    players
}

fn decode_row(tokens: &[String], layout: InfoRowLayout) -> Option<PlayerRecord> {
    match layout {
        InfoRowLayout::SlotName if tokens.len() >= 2 => Some(PlayerRecord {
            slot: tokens[0].clone(),
            name: unquote(&tokens[1])?,
            score: "0".into(),
            ping: "0".into(),
            ..Default::default()
        }),
        InfoRowLayout::ScorePingName if tokens.len() >= 3 => Some(PlayerRecord {
            score: tokens[0].clone(),
            ping: tokens[1].clone(),
            name: unquote(&tokens[2])?,
            slot: "0".into(),
            ..Default::default()
        }),
        _ => None,
    }
}

/// The name token must carry both its leading and trailing double quote;
/// they are stripped here. Anything else disqualifies the row.
fn unquote(token: &str) -> Option<String> {
    if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
        Some(token[1..token.len() - 1].to_string())
    } else {
        None
    }
}
