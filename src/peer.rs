//! Connected peer tracking
//!
//! A peer is a live, handshake-authenticated session. Session handles are
//! owned by the connection-management layer; the gateway only keeps a
//! reference so it can open RPC substreams on them. A peer need not be in
//! the node list and a known node need not be connected.

use crate::address::NetAddress;
use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Direction of an established peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

/// A bidirectional RPC substream on a peer session.
pub trait RpcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RpcStream for T {}

/// An established peer session, owned by the connection layer.
///
/// The gateway never reads or writes the underlying socket directly; it
/// asks the session for a fresh substream per named RPC.
#[async_trait]
pub trait PeerSession: Send + Sync {
    async fn open_rpc(&self, name: &str) -> io::Result<Box<dyn RpcStream>>;
}

/// A currently connected peer.
#[derive(Clone)]
pub struct Peer {
    pub addr: NetAddress,
    pub direction: Direction,
    pub session: Arc<dyn PeerSession>,
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("addr", &self.addr)
            .field("direction", &self.direction)
            .finish()
    }
}

/// The set of currently connected peers.
///
/// Like [`crate::nodes::NodeSet`], this does no locking of its own; the
/// gateway guards it.
#[derive(Debug, Default)]
pub struct PeerSet {
    peers: HashMap<NetAddress, Peer>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, addr: &NetAddress) -> bool {
        self.peers.contains_key(addr)
    }

    pub fn insert(&mut self, peer: Peer) {
        self.peers.insert(peer.addr.clone(), peer);
    }

    pub fn remove(&mut self, addr: &NetAddress) -> Option<Peer> {
        self.peers.remove(addr)
    }

    pub fn get(&self, addr: &NetAddress) -> Option<&Peer> {
        self.peers.get(addr)
    }

    /// Every connected peer.
    pub fn all(&self) -> Vec<Peer> {
        self.peers.values().cloned().collect()
    }

    /// A uniformly random outbound peer, or `None` when we have none.
    ///
    /// Having no outbound peers is the normal state of a freshly started
    /// node, so absence is not an error here.
    pub fn random_outbound(&self) -> Option<Peer> {
        let outbound: Vec<&Peer> = self
            .peers
            .values()
            .filter(|p| p.direction == Direction::Outbound)
            .collect();
        if outbound.is_empty() {
            return None;
        }
        let i = rand::thread_rng().gen_range(0..outbound.len());
        Some(outbound[i].clone())
    }
}
