//! UDP transport: one datagram out, one datagram back, bounded by a
//! deadline. No retries; a timeout surfaces to the caller immediately.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::trace;

/// Largest reply these servers produce in a single datagram.
const MAX_REPLY: usize = 4096;

/// Send/receive capability the protocol handlers call through. Mocked in
/// tests to feed canned server replies through the full pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_query(
        &self,
        ip: Ipv4Addr,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>>;
}

/// Real transport. Binds an ephemeral socket per call; these queries are
/// one-shot, so there is nothing worth keeping open between them.
#[derive(Clone, Copy, Debug, Default)]
pub struct UdpTransport;

#[async_trait]
impl Transport for UdpTransport {
    async fn send_query(
        &self,
        ip: Ipv4Addr,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|_| Error::Transport("Socket creation failed".into()))?;
        let addr = SocketAddr::from((ip, port));

        trace!("Sending data to {}: {:?}", addr, payload);
        tokio::time::timeout(timeout, socket.send_to(payload, addr))
            .await
            .map_err(|_| Error::Transport("Send failed".into()))?
            .map_err(|_| Error::Transport("Send failed".into()))?;

        let mut buf = vec![0u8; MAX_REPLY];
        let (len, from) = tokio::time::timeout(timeout, socket.recv_from(&mut buf))
            .await
            .map_err(|_| Error::Transport("Receive failed".into()))?
            .map_err(|_| Error::Transport("Receive failed".into()))?;
        buf.truncate(len);
        trace!("Received {} bytes from {}", len, from);

        Ok(buf)
    }
}
