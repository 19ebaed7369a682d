//! Decoder for the `\key\value\key\value` block that follows the
//! `infoResponse`/`statusResponse` envelope marker.

use crate::models::ServerInfo;

/// Parses a backslash-delimited key/value block.
///
/// Grammar: any leading newlines are skipped; then a sequence of
/// `\key\value` pairs. A value runs to the next backslash, or for the final
/// pair to the next line break (or end of input). Empty keys drop that pair
/// but parsing continues. The first structural anomaly (no backslash at the
/// cursor, or a key with no closing backslash) ends the scan quietly, so
/// malformed input yields a partial or empty map rather than an error.
/// Duplicate keys: last occurrence wins.
pub fn parse_key_values(body: &str) -> ServerInfo {
    let mut result = ServerInfo::new();
    let bytes = body.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() && bytes[pos] == b'\n' {
        pos += 1;
    }

    while pos < bytes.len() {
        if bytes[pos] != b'\\' {
            break;
        }
        pos += 1;
        let Some(next) = find_byte(bytes, pos, b'\\') else {
            break;
        };
        let key = &body[pos..next];
        pos = next + 1;
        let end = find_byte(bytes, pos, b'\\')
            .or_else(|| find_byte(bytes, pos, b'\n'))
            .unwrap_or(bytes.len());
        if !key.is_empty() {
            result.insert(key.to_string(), body[pos..end].to_string());
        }
        pos = end;
    }

    result
}

fn find_byte(haystack: &[u8], from: usize, needle: u8) -> Option<usize> {
    haystack[from..]
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

/// Encodes a [`ServerInfo`] back into the wire form. Only used by tests and
/// tooling; the servers themselves produce this encoding.
pub fn encode_key_values(info: &ServerInfo) -> String {
    let mut out = String::new();
    for (k, v) in info {
        out.push('\\');
        out.push_str(k);
        out.push('\\');
        out.push_str(v);
    }
    out
}
