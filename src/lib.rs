//!
//! Utilities for querying and administering id Tech 3 family game servers.
//!
//! The `q3query` crate speaks the legacy UDP query protocols of two id
//! Tech 3 derivatives, Medal of Honor (protocol id 1) and Call of Duty
//! (protocol id 2), and turns their plaintext replies into structured
//! data: server metadata, player lists and rcon console output.
//!
//! The usual entry point is [`QueryClient`], which owns the DNS cache and
//! the UDP transport and exposes both a typed API ([`QueryClient::query`])
//! and the uniform textual contract ([`QueryClient::query_text`]) where
//! every failure comes back as an `error=<reason>` string.

pub mod dns;
pub mod errors;
pub mod models;
pub mod parse;
pub mod protocols;
pub mod udp;

pub use errors::{Error, Result};
pub use models::{PlayerRecord, QueryResult, ServerInfo};
pub use protocols::ProtocolId;

use dns::{CachingResolver, Resolve, TrustDnsResolve};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;
use udp::{Transport, UdpTransport};

/// One query against one server.
#[derive(Clone, Debug)]
pub struct QueryRequest {
    /// Numeric protocol id; `1` = Medal of Honor, `2` = Call of Duty.
    pub protocol: i32,
    /// Skip decoding and return the envelope-stripped body verbatim.
    pub raw: bool,
    /// Hostname or IPv4 literal.
    pub host: String,
    pub port: u16,
    /// `getinfo`, `getstatus`, or `rcon <command>`.
    pub command: String,
    /// Required for `rcon`; embedded into the wire payload as supplied.
    pub rcon_password: Option<String>,
}

/// Strips characters that would smuggle a second command into the same
/// datagram (`;`, CR, LF). Idempotent.
pub fn sanitize_command(command: &str) -> String {
    command
        .chars()
        .filter(|c| !matches!(c, ';' | '\n' | '\r'))
        .collect()
}

/// Client for issuing queries. Owns the TTL-caching resolver and the
/// transport, so one client can be shared across tasks; each call is a
/// single resolve, a single send/receive and a single decode pass, with no
/// retries and no state carried between calls beyond the DNS cache.
pub struct QueryClient {
    resolver: CachingResolver,
    transport: Arc<dyn Transport>,
}

impl QueryClient {
    /// Production client: system DNS, real UDP.
    pub fn new() -> Result<Self> {
        Ok(Self::with_collaborators(
            Arc::new(TrustDnsResolve::from_system_conf()?),
            Arc::new(UdpTransport),
        ))
    }

    /// Assembles a client from explicit collaborators. This is how tests
    /// feed canned replies through the full pipeline.
    pub fn with_collaborators(resolve: Arc<dyn Resolve>, transport: Arc<dyn Transport>) -> Self {
        Self {
            resolver: CachingResolver::new(resolve),
            transport,
        }
    }

    /// Validates and runs a request. Input checks happen strictly before
    /// any resolution or network I/O.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let protocol = ProtocolId::from_id(request.protocol).ok_or(Error::InvalidProtocol)?;
        if request.port == 0 {
            return Err(Error::InvalidPort);
        }
        let command = sanitize_command(&request.command);
        if command.is_empty() {
            return Err(Error::EmptyCommand);
        }

        let ip = self.resolver.resolve(&request.host).await?;
        debug!("Dispatching to {:?} at {}:{}", protocol, ip, request.port);

        protocols::process_command(
            protocol,
            request.raw,
            ip,
            request.port,
            &command,
            request.rcon_password.as_deref().unwrap_or(""),
            self.transport.as_ref(),
        )
        .await
    }

    /// Uniform text boundary: a structured payload, a raw passthrough, or
    /// an `error=<reason>` string. Never fails and never panics outward; a
    /// fault anywhere beneath this layer is reported as
    /// `error=Unexpected exception` and leaves the client usable.
    pub async fn query_text(&self, request: &QueryRequest) -> String {
        match AssertUnwindSafe(self.query(request)).catch_unwind().await {
            Ok(Ok(result)) => result.render(),
            Ok(Err(error)) => error_text(&error),
            Err(_) => error_text(&Error::Unexpected),
        }
    }
}

/// Renders an error per the textual contract. [`Error::InvalidResponse`]
/// carries the undecodable server reply as a `;raw=` suffix.
pub fn error_text(error: &Error) -> String {
    match error {
        Error::InvalidResponse { reason, raw } => format!("error={reason};raw={raw}"),
        other => format!("error={other}"),
    }
}
