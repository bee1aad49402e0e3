//! Outbound handshake client
//!
//! Dials a candidate address and runs the version/genesis handshake to
//! verify there is a compatible node behind it. The node purger uses this
//! as a reachability probe: the probe connection is dropped immediately
//! after the exchange and is never promoted to a peer session.

use crate::address::NetAddress;
use crate::message::{Hello, HelloCodec, MIN_PROTOCOL_VERSION};
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

/// Handshake errors
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("handshake timed out")]
    TimedOut,
    #[error("peer closed the connection mid-handshake")]
    Disconnected,
    #[error("peer speaks version {0}, minimum accepted is {MIN_PROTOCOL_VERSION}")]
    VersionTooOld(u32),
    #[error("peer has different genesis ID")]
    GenesisMismatch,
}

/// Dials addresses and performs the protocol handshake.
#[derive(Debug, Clone)]
pub struct HandshakeClient {
    genesis_id: String,
    dial_timeout: Duration,
    exchange_timeout: Duration,
}

impl HandshakeClient {
    pub fn new(genesis_id: String, dial_timeout: Duration, exchange_timeout: Duration) -> Self {
        Self {
            genesis_id,
            dial_timeout,
            exchange_timeout,
        }
    }

    /// Dial `addr` and exchange hellos. Returns the remote hello on
    /// success; the connection itself is closed when the returned future
    /// completes.
    pub async fn connect(
        &self,
        addr: &NetAddress,
        want_conn: bool,
    ) -> Result<Hello, HandshakeError> {
        let stream = timeout(self.dial_timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| HandshakeError::TimedOut)??;

        let mut framed = Framed::new(stream, HelloCodec);
        let ours = Hello::new(self.genesis_id.clone(), want_conn);

        let remote = timeout(self.exchange_timeout, async {
            framed.send(ours).await?;
            match framed.next().await {
                Some(frame) => Ok(frame?),
                None => Err(HandshakeError::Disconnected),
            }
        })
        .await
        .map_err(|_| HandshakeError::TimedOut)??;

        if remote.version < MIN_PROTOCOL_VERSION {
            return Err(HandshakeError::VersionTooOld(remote.version));
        }
        if remote.genesis_id != self.genesis_id {
            return Err(HandshakeError::GenesisMismatch);
        }
        Ok(remote)
    }

    /// Reachability probe: handshake only, no lasting session requested.
    ///
    /// Any failure, from a refused dial to a genesis mismatch, means the
    /// address is not a usable node; callers treat them all the same.
    pub async fn ping(&self, addr: &NetAddress) -> Result<(), HandshakeError> {
        self.connect(addr, false).await.map(|_| ())
    }
}
