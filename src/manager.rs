//! Node manager task
//!
//! Long-running health check for the node list. While the list is below
//! the healthy threshold, it asks a random outbound peer for more nodes
//! through the ShareNodes RPC; once the list is healthy it backs off to a
//! much longer check interval instead of generating gossip traffic.

use crate::gateway::Gateway;
use crate::gossip::SHARE_NODES_RPC;
use std::sync::Arc;
use tokio::time::sleep;

pub(crate) async fn run(gw: Arc<Gateway>) {
    loop {
        // Pace node requests so peers see a controlled trickle.
        tokio::select! {
            _ = sleep(gw.config.node_list_delay) => {}
            _ = gw.cancel.cancelled() => return,
        }

        let (node_count, peer) = {
            let state = gw.state.read().await;
            (state.nodes.len(), state.peers.random_outbound())
        };
        let peer = match peer {
            Some(peer) => peer,
            // No outbound peers yet; normal for a freshly started node.
            None => continue,
        };

        if node_count < gw.config.healthy_node_count {
            match peer.session.open_rpc(SHARE_NODES_RPC).await {
                Ok(mut stream) => match gw.request_nodes(&mut stream).await {
                    Ok(added) => {
                        if added > 0 {
                            log::debug!("learned {} nodes from peer {}", added, peer.addr);
                        }
                    }
                    Err(e) => log::debug!("ShareNodes RPC failed on peer {}: {}", peer.addr, e),
                },
                Err(e) => log::debug!("could not open ShareNodes to {}: {}", peer.addr, e),
            }
        } else {
            // The list is healthy; no point asking again in a few
            // seconds.
            tokio::select! {
                _ = sleep(gw.config.well_connected_delay) => {}
                _ = gw.cancel.cancelled() => return,
            }
        }
    }
}
