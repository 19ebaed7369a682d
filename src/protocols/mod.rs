//! The two registered protocols and the per-call orchestration shared
//! between them.
//!
//! Both games speak an id Tech 3 derivative: a four-byte `0xFF` preamble
//! (Medal of Honor adds a `0x02` direction byte), plaintext commands, and
//! plaintext replies behind an envelope marker (`infoResponse`,
//! `statusResponse` or `print`). The differences are captured entirely in
//! [`Descriptor`] data; the handler logic itself is one routine over a
//! closed set of variants.

use crate::errors::{Error, Result};
use crate::models::QueryResult;
use crate::parse::players::InfoRowLayout;
use crate::parse::status_table::{TableLayout, VariantLayouts};
use crate::parse::{parse_info_players, parse_key_values, parse_status_table};
use crate::udp::Transport;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

/// Timeout for ordinary queries.
const QUERY_TIMEOUT: Duration = Duration::from_millis(1000);
/// Map changes block the server console; give them longer.
const MAP_CHANGE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Immutable per-protocol constants.
#[derive(Clone, Copy, Debug)]
pub struct Descriptor {
    /// Wire preamble prepended to every outgoing command.
    pub prefix: &'static [u8],
    /// Whether the short `getinfo` query exists (Call of Duty only).
    pub has_getinfo: bool,
    /// Envelope markers expected in replies, per query kind.
    pub info_marker: &'static str,
    pub status_marker: &'static str,
    pub print_marker: &'static str,
    /// Column layout of the `getstatus` player rows.
    pub info_rows: InfoRowLayout,
    /// Column layouts of the `rcon status` table, per server variant.
    pub status_table: VariantLayouts,
}

const MOH: Descriptor = Descriptor {
    prefix: b"\xff\xff\xff\xff\x02",
    has_getinfo: false,
    info_marker: "infoResponse",
    status_marker: "statusResponse",
    print_marker: "print",
    info_rows: InfoRowLayout::SlotName,
    status_table: VariantLayouts {
        steam: TableLayout::MOH,
        non_steam: TableLayout::MOH,
    },
};

const COD: Descriptor = Descriptor {
    prefix: b"\xff\xff\xff\xff",
    has_getinfo: true,
    info_marker: "infoResponse",
    status_marker: "statusResponse",
    print_marker: "print",
    info_rows: InfoRowLayout::ScorePingName,
    status_table: VariantLayouts {
        steam: TableLayout::COD_STEAM,
        non_steam: TableLayout::COD,
    },
};

/// The closed set of registered protocols, selected by their numeric id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolId {
    MedalOfHonor = 1,
    CallOfDuty = 2,
}

impl ProtocolId {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(ProtocolId::MedalOfHonor),
            2 => Some(ProtocolId::CallOfDuty),
            _ => None,
        }
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        match self {
            ProtocolId::MedalOfHonor => &MOH,
            ProtocolId::CallOfDuty => &COD,
        }
    }
}

/// Validated command grammar.
#[derive(Clone, Copy)]
enum Command<'a> {
    GetInfo,
    GetStatus,
    Rcon(&'a str),
}

impl<'a> Command<'a> {
    fn parse(command: &'a str, descriptor: &Descriptor) -> Result<Self> {
        if command == "getinfo" && descriptor.has_getinfo {
            Ok(Command::GetInfo)
        } else if command == "getstatus" {
            Ok(Command::GetStatus)
        } else if let Some(rest) = command.strip_prefix("rcon ") {
            Ok(Command::Rcon(rest))
        } else {
            Err(Error::InvalidCommand)
        }
    }
}

/// Runs one command against one server: build the wire query, send it,
/// strip the envelope, decode. `command` must already be sanitized.
pub(crate) async fn process_command(
    protocol: ProtocolId,
    raw: bool,
    ip: Ipv4Addr,
    port: u16,
    command: &str,
    rcon_password: &str,
    transport: &dyn Transport,
) -> Result<QueryResult> {
    let descriptor = protocol.descriptor();
    let cmd = Command::parse(command, descriptor)?;

    let mut payload = descriptor.prefix.to_vec();
    match &cmd {
        Command::GetInfo => payload.extend_from_slice(b"getinfo"),
        Command::GetStatus => payload.extend_from_slice(b"getstatus"),
        // The password goes onto the wire exactly as supplied, quotes and
        // all. The servers' own parsers define what is valid here, so no
        // escaping is attempted; a password containing a double quote is
        // ambiguous server-side. Compatibility over hygiene.
        Command::Rcon(rest) => {
            payload.extend_from_slice(format!("rcon \"{}\" {}", rcon_password, rest).as_bytes())
        }
    }

    let map_change = matches!(&cmd, Command::Rcon(rest) if rest.starts_with("map "));
    let timeout = if map_change {
        MAP_CHANGE_TIMEOUT
    } else {
        QUERY_TIMEOUT
    };

    debug!("Querying {:?} server {}:{}: {}", protocol, ip, port, command);
    let reply = transport.send_query(ip, port, &payload, timeout).await?;
    let response = decode_reply(&reply);

    if map_change {
        if response.is_empty() {
            return Err(Error::Transport("Empty response from server".into()));
        }
        // The server's answer to a map change is a console spew worth
        // nothing to callers; acknowledge and move on.
        let map = &command["rcon map ".len()..];
        return Ok(QueryResult::MapChange(map.to_string()));
    }
    if response.is_empty() {
        return Err(Error::Transport("Empty response from server".into()));
    }

    match cmd {
        Command::GetInfo | Command::GetStatus => {
            let marker = if matches!(cmd, Command::GetInfo) {
                descriptor.info_marker
            } else {
                descriptor.status_marker
            };
            let body = strip_envelope(&response, marker)?;
            if raw {
                return Ok(QueryResult::Raw(body));
            }
            Ok(QueryResult::Info {
                server: parse_key_values(&body),
                players: parse_info_players(&body, descriptor.info_rows),
            })
        }
        Command::Rcon(rest) => {
            let body = strip_envelope(&response, descriptor.print_marker)?;
            if rest == "status" {
                if raw {
                    return Ok(QueryResult::Raw(body));
                }
                Ok(QueryResult::Status {
                    players: parse_status_table(&body, &descriptor.status_table),
                })
            } else {
                let body = body.trim_start_matches('\n').to_string();
                if raw {
                    return Ok(QueryResult::Raw(body));
                }
                Ok(QueryResult::Console(body))
            }
        }
    }
}

/// The servers talk in C strings; anything after a NUL is garbage from the
/// receive buffer.
fn decode_reply(reply: &[u8]) -> String {
    let end = reply.iter().position(|&b| b == 0).unwrap_or(reply.len());
    String::from_utf8_lossy(&reply[..end]).into_owned()
}

/// Locates the envelope marker and returns everything after it. A missing
/// marker or an empty remainder is an invalid response; the raw text rides
/// along for diagnostics.
fn strip_envelope(response: &str, marker: &str) -> Result<String> {
    let Some(pos) = response.find(marker) else {
        return Err(Error::InvalidResponse {
            reason: "Invalid server response",
            raw: response.to_string(),
        });
    };
    let body = &response[pos + marker.len()..];
    if body.is_empty() {
        return Err(Error::InvalidResponse {
            reason: "Empty response after header removal",
            raw: String::new(),
        });
    }
    Ok(body.to_string())
}
