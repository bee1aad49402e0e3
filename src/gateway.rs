//! Gateway orchestration
//!
//! The gateway owns the node and peer sets behind a single reader/writer
//! lock, spawns the maintenance tasks, and coordinates cooperative
//! shutdown. All lock acquisitions are short: candidate lists and
//! snapshots are copied out under the lock and every network or disk
//! operation runs after it is released.

use crate::address::NetAddress;
use crate::handshake::HandshakeClient;
use crate::nodes::{NodeError, NodeSet};
use crate::peer::{Direction, Peer, PeerSession, PeerSet};
use crate::storage::{NodeStore, StorageError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

// Default tuning. Everything here is overridable through `GatewayConfig`,
// which is how the tests shrink the timers.
const HEALTHY_NODE_LIST_LEN: usize = 50;
const PRUNE_NODE_LIST_LEN: usize = 50;
const QUICK_PRUNE_LIST_LEN: usize = 250;
const NODE_LIST_DELAY: Duration = Duration::from_secs(5);
const WELL_CONNECTED_DELAY: Duration = Duration::from_secs(5 * 60);
const NODE_PURGE_DELAY: Duration = Duration::from_secs(10 * 60);
const FAST_NODE_PURGE_DELAY: Duration = Duration::from_secs(60);
const RPC_DEADLINE: Duration = Duration::from_secs(60);
const DIAL_TIMEOUT: Duration = Duration::from_secs(20);

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Our own announced address; never admitted into the node list
    pub my_addr: NetAddress,
    /// Genesis block ID of the chain we follow
    pub genesis_id: String,
    /// Data directory for the persisted node list
    pub data_dir: PathBuf,

    /// Node-list size considered sufficient for network resilience
    pub healthy_node_count: usize,
    /// Floor the purger never prunes below
    pub prune_floor: usize,
    /// List size above which the purger switches to the fast delay
    pub quick_prune_len: usize,

    /// Pause between node manager health checks
    pub node_list_delay: Duration,
    /// Extra backoff once the node list is healthy
    pub well_connected_delay: Duration,
    /// Pause between purge attempts
    pub purge_delay: Duration,
    /// Purge pause when the list is large
    pub fast_purge_delay: Duration,

    /// Deadline applied to every gossip RPC read/write
    pub rpc_deadline: Duration,
    /// Timeout for an outbound dial
    pub dial_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            my_addr: NetAddress::from("127.0.0.1:23112"),
            genesis_id: String::new(),
            data_dir: PathBuf::from(".gateway_data"),
            healthy_node_count: HEALTHY_NODE_LIST_LEN,
            prune_floor: PRUNE_NODE_LIST_LEN,
            quick_prune_len: QUICK_PRUNE_LIST_LEN,
            node_list_delay: NODE_LIST_DELAY,
            well_connected_delay: WELL_CONNECTED_DELAY,
            purge_delay: NODE_PURGE_DELAY,
            fast_purge_delay: FAST_NODE_PURGE_DELAY,
            rpc_deadline: RPC_DEADLINE,
            dial_timeout: DIAL_TIMEOUT,
        }
    }
}

/// Everything guarded by the gateway lock.
pub(crate) struct GatewayState {
    pub nodes: NodeSet,
    pub peers: PeerSet,
}

/// The peer-discovery gateway.
pub struct Gateway {
    pub(crate) config: GatewayConfig,
    pub(crate) state: RwLock<GatewayState>,
    pub(crate) handshake: HandshakeClient,
    pub(crate) cancel: CancellationToken,
    store: NodeStore,
    tasks: TaskTracker,
}

impl Gateway {
    /// Create a gateway, reloading any persisted node list.
    ///
    /// Persisted entries that no longer pass validation are dropped with a
    /// warning rather than failing startup; a missing or unreadable file
    /// just means we start from an empty list.
    pub fn new(config: GatewayConfig) -> Result<Self, StorageError> {
        let store = NodeStore::new(&config.data_dir)?;
        let mut nodes = NodeSet::new(config.my_addr.clone());

        if store.exists() {
            match store.load() {
                Ok(saved) => {
                    for addr in saved {
                        if let Err(e) = nodes.add(addr.clone()) {
                            log::warn!("dropping persisted node '{}': {}", addr, e);
                        }
                    }
                    log::info!("loaded {} known nodes", nodes.len());
                }
                Err(e) => log::warn!("could not load node list, starting empty: {}", e),
            }
        }

        let handshake = HandshakeClient::new(
            config.genesis_id.clone(),
            config.dial_timeout,
            config.rpc_deadline,
        );

        Ok(Self {
            config,
            state: RwLock::new(GatewayState {
                nodes,
                peers: PeerSet::new(),
            }),
            handshake,
            cancel: CancellationToken::new(),
            store,
            tasks: TaskTracker::new(),
        })
    }

    /// Spawn the long-running maintenance tasks.
    pub fn start(self: Arc<Self>) {
        self.tasks.spawn(crate::purger::run(Arc::clone(&self)));
        self.tasks.spawn(crate::manager::run(Arc::clone(&self)));
        log::info!("gateway started, our address is {}", self.config.my_addr);
    }

    /// Cooperative shutdown: signal every task, wait for all of them to
    /// observe the signal and exit, then write a final save.
    pub async fn shutdown(&self) {
        log::info!("gateway shutting down");
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        let snapshot = self.state.read().await.nodes.to_vec();
        self.save_nodes(&snapshot);
        log::info!("gateway stopped");
    }

    /// Persist a node-list snapshot. Failures cost durability, not
    /// correctness, so they are logged and swallowed.
    pub(crate) fn save_nodes(&self, snapshot: &[NetAddress]) {
        if let Err(e) = self.store.save(snapshot) {
            log::warn!("failed to save node list: {}", e);
        }
    }

    /// Add a node to the known-node list and persist the result.
    pub async fn add_node(&self, addr: NetAddress) -> Result<(), NodeError> {
        let snapshot = {
            let mut state = self.state.write().await;
            state.nodes.add(addr)?;
            state.nodes.to_vec()
        };
        self.save_nodes(&snapshot);
        Ok(())
    }

    /// Remove a node from the known-node list and persist the result.
    pub async fn remove_node(&self, addr: &NetAddress) -> Result<(), NodeError> {
        let snapshot = {
            let mut state = self.state.write().await;
            state.nodes.remove(addr)?;
            state.nodes.to_vec()
        };
        self.save_nodes(&snapshot);
        Ok(())
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    pub async fn nodes(&self) -> Vec<NetAddress> {
        self.state.read().await.nodes.to_vec()
    }

    /// Record an established, handshake-authenticated session. Called by
    /// the connection layer, which keeps ownership of the socket.
    pub async fn register_peer(
        &self,
        addr: NetAddress,
        direction: Direction,
        session: Arc<dyn PeerSession>,
    ) {
        let mut state = self.state.write().await;
        state.peers.insert(Peer {
            addr: addr.clone(),
            direction,
            session,
        });
        log::info!("peer {} registered ({:?})", addr, direction);
    }

    /// Drop a peer whose session the connection layer has closed.
    pub async fn peer_disconnected(&self, addr: &NetAddress) {
        let mut state = self.state.write().await;
        if state.peers.remove(addr).is_some() {
            log::info!("peer {} disconnected", addr);
        }
    }

    /// Every currently connected peer.
    pub async fn peers(&self) -> Vec<Peer> {
        self.state.read().await.peers.all()
    }

    /// Currently connected outbound peers.
    pub async fn outbound_peers(&self) -> Vec<Peer> {
        self.state
            .read()
            .await
            .peers
            .all()
            .into_iter()
            .filter(|p| p.direction == Direction::Outbound)
            .collect()
    }
}
