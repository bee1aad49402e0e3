//! Node purger task
//!
//! Long-running sweep that keeps the node list from saturating with dead
//! addresses: pick a random node, probe it, evict it on failure. Eviction
//! never takes the list below the configured floor, so a node that has
//! been offline for a while keeps enough candidates to rejoin the
//! network.

use crate::gateway::Gateway;
use crate::nodes::NodeError;
use std::sync::Arc;
use tokio::time::sleep;

pub(crate) async fn run(gw: Arc<Gateway>) {
    loop {
        // Rate limit: nodes go offline for days and still come back, so a
        // small list is probed gently. A large list carries proportionally
        // more dead weight and gets the fast delay.
        let wait = {
            let node_count = gw.state.read().await.nodes.len();
            if node_count > gw.config.quick_prune_len {
                gw.config.fast_purge_delay
            } else {
                gw.config.purge_delay
            }
        };

        tokio::select! {
            _ = sleep(wait) => {}
            _ = gw.cancel.cancelled() => return,
        }

        let (node_count, pick) = {
            let state = gw.state.read().await;
            (state.nodes.len(), state.nodes.random_pick())
        };
        let node = match pick {
            Ok(node) => node,
            // An empty list is normal before bootstrap has run.
            Err(NodeError::NoNodes) => continue,
            Err(e) => {
                log::error!("could not pick a node to scan: {}", e);
                continue;
            }
        };

        // Never prune below the floor; a short list is all this node has
        // left for getting back onto the network.
        if node_count <= gw.config.prune_floor {
            continue;
        }

        // A connected peer is reachable by definition, skip the dial.
        if gw.state.read().await.peers.contains(&node) {
            continue;
        }

        // Probe with the lock released. A probe aborted by shutdown
        // counts as a failure and evicts a possibly-good node; with a
        // plentiful list that false positive is acceptable.
        if let Err(e) = gw.handshake.ping(&node).await {
            let snapshot = {
                let mut state = gw.state.write().await;
                match state.nodes.remove(&node) {
                    Ok(()) => Some(state.nodes.to_vec()),
                    Err(_) => None,
                }
            };
            if let Some(snapshot) = snapshot {
                gw.save_nodes(&snapshot);
                log::debug!("removed unreachable node {}: {}", node, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::NetAddress;
    use crate::gateway::GatewayConfig;
    use crate::peer::{Direction, PeerSession, RpcStream};
    use async_trait::async_trait;
    use std::io;
    use std::time::Duration;
    use tokio::net::TcpListener;

    struct NullSession;

    #[async_trait]
    impl PeerSession for NullSession {
        async fn open_rpc(&self, _name: &str) -> io::Result<Box<dyn RpcStream>> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "null session"))
        }
    }

    /// An address on loopback that nothing is listening on.
    async fn dead_addr() -> NetAddress {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = NetAddress::from(listener.local_addr().unwrap());
        drop(listener);
        addr
    }

    fn fast_config(dir: &std::path::Path, prune_floor: usize) -> GatewayConfig {
        GatewayConfig {
            my_addr: NetAddress::from("5.6.7.8:23112"),
            genesis_id: "genesis-test".to_string(),
            data_dir: dir.to_path_buf(),
            prune_floor,
            purge_delay: Duration::from_millis(5),
            fast_purge_delay: Duration::from_millis(5),
            dial_timeout: Duration::from_millis(250),
            ..Default::default()
        }
    }

    async fn wait_for_count(gw: &Gateway, want: usize) {
        for _ in 0..400 {
            if gw.node_count().await == want {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!(
            "node count never reached {}, still {}",
            want,
            gw.node_count().await
        );
    }

    #[tokio::test]
    async fn test_purger_stops_at_floor() {
        let dir = tempfile::tempdir().unwrap();
        let gw = Arc::new(Gateway::new(fast_config(dir.path(), 2)).unwrap());

        // Floor + 1 nodes, all unreachable.
        for _ in 0..3 {
            gw.add_node(dead_addr().await).await.unwrap();
        }

        let task = tokio::spawn(run(Arc::clone(&gw)));

        // Converges to the floor...
        wait_for_count(&gw, 2).await;

        // ...and then stays there, no matter how long the purger keeps
        // failing its probes.
        sleep(Duration::from_millis(300)).await;
        assert_eq!(gw.node_count().await, 2);

        gw.cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_purger_skips_connected_peers() {
        let dir = tempfile::tempdir().unwrap();
        let gw = Arc::new(Gateway::new(fast_config(dir.path(), 0)).unwrap());

        // Two unreachable nodes, one of which is a live peer.
        let peer_node = dead_addr().await;
        let other = dead_addr().await;
        gw.add_node(peer_node.clone()).await.unwrap();
        gw.add_node(other.clone()).await.unwrap();
        gw.register_peer(peer_node.clone(), Direction::Outbound, Arc::new(NullSession))
            .await;

        let task = tokio::spawn(run(Arc::clone(&gw)));

        // The non-peer node gets evicted, the peer never does.
        wait_for_count(&gw, 1).await;
        sleep(Duration::from_millis(200)).await;
        assert_eq!(gw.nodes().await, vec![peer_node]);

        gw.cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_purger_exits_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fast_config(dir.path(), 0);
        config.purge_delay = Duration::from_secs(600);
        let gw = Arc::new(Gateway::new(config).unwrap());

        let task = tokio::spawn(run(Arc::clone(&gw)));
        gw.cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("purger ignored the cancel signal")
            .unwrap();
    }
}
