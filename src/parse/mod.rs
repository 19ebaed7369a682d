//! Decoders for the plaintext bodies these servers return: the
//! backslash-delimited key/value block, the short player list appended to a
//! `getstatus` reply, and the human-readable `rcon status` admin table.
//!
//! All of them are lenient by design. Servers in the wild produce slightly
//! mangled output, so malformed fragments degrade the result (fewer keys,
//! fewer players) instead of failing the whole query.

pub mod keyvalue;
pub mod players;
pub mod status_table;
pub mod tokens;

pub use keyvalue::parse_key_values;
pub use players::parse_info_players;
pub use status_table::parse_status_table;
