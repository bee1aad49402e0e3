//! Mini-Gateway: peer discovery and node-list maintenance for a
//! mini-blockchain node
//!
//! This crate is the gateway subsystem of a P2P blockchain node. It keeps
//! a bounded, healthy list of known network addresses ("nodes"), tracks
//! live connected peers separately, exchanges address samples with peers
//! over the ShareNodes RPC, and continuously prunes addresses that no
//! longer answer a handshake, all under concurrent access from
//! background tasks and inbound RPC handlers.
//!
//! # Features
//! - Validated known-node set with uniform random sampling
//! - ShareNodes gossip with locality filtering and hard wire bounds
//! - Background node purger with adaptive rate control and a prune floor
//! - Background node manager that pulls addresses while the list is thin
//! - Reachability probing via a version/genesis handshake
//! - Atomic JSON persistence of the node list
//! - Cooperative, signal-driven shutdown
//!
//! # Example
//!
//! ```no_run
//! use mini_gateway::{Gateway, GatewayConfig, NetAddress};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig {
//!         my_addr: NetAddress::from("203.0.113.7:23112"),
//!         genesis_id: "genesis".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let gateway = Arc::new(Gateway::new(config)?);
//!     gateway.add_node(NetAddress::from("198.51.100.4:23112")).await?;
//!     Arc::clone(&gateway).start();
//!
//!     // ... the connection layer registers peer sessions as they come
//!     // and go, and routes inbound ShareNodes RPCs to the gateway ...
//!
//!     gateway.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod address;
pub mod gateway;
pub mod gossip;
pub mod handshake;
pub mod message;
pub mod nodes;
pub mod peer;
pub mod storage;

mod manager;
mod purger;

// Re-export commonly used types
pub use address::{AddressError, NetAddress};
pub use gateway::{Gateway, GatewayConfig};
pub use gossip::SHARE_NODES_RPC;
pub use handshake::{HandshakeClient, HandshakeError};
pub use message::{
    Hello, WireError, MAX_ENCODED_ADDR_LEN, MAX_SHARED_NODES, MIN_PROTOCOL_VERSION,
    PROTOCOL_VERSION,
};
pub use nodes::{AddressValidator, NodeError, NodeSet};
pub use peer::{Direction, Peer, PeerSession, PeerSet, RpcStream};
pub use storage::{NodeStore, StorageError};
