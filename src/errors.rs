use thiserror::Error;

/// Everything that can go wrong between accepting a request and handing
/// back a decoded result. Display texts are part of the external contract:
/// they are what ends up after `error=` in [`crate::QueryClient::query_text`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid protocol ID")]
    InvalidProtocol,
    #[error("Invalid port")]
    InvalidPort,
    /// Only reachable through an FFI-style boundary that can hand us absent
    /// pointers. Kept so the textual contract covers it.
    #[error("Null input parameters")]
    NullInput,
    #[error("Empty command")]
    EmptyCommand,
    #[error("Invalid command")]
    InvalidCommand,
    #[error("Unsupported command")]
    UnsupportedCommand,
    #[error("Failed to resolve hostname")]
    Resolution,
    #[error("{0}")]
    Transport(String),
    /// The reply arrived but the protocol envelope was missing or empty.
    /// Carries the undecodable bytes for diagnostics.
    #[error("{reason}")]
    InvalidResponse { reason: &'static str, raw: String },
    #[error("Unexpected exception")]
    Unexpected,
}

pub type Result<T> = std::result::Result<T, Error>;
