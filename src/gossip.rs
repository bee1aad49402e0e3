//! ShareNodes gossip RPC
//!
//! Both halves of the node-list exchange. The server sends a bounded
//! random sample of its known nodes, filtered so local-only addresses
//! never leak to remote requesters; the client merges a received sample
//! into the node list, tolerating individual bad entries.
//!
//! Candidates and snapshots are copied in and out under the gateway lock;
//! the wire I/O itself always runs with the lock released.

use crate::address::NetAddress;
use crate::gateway::Gateway;
use crate::message::{self, WireError, MAX_SHARED_NODES};
use crate::nodes::NodeError;
use rand::seq::SliceRandom;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

/// RPC name the connection layer routes to [`Gateway::share_nodes`].
pub const SHARE_NODES_RPC: &str = "ShareNodes";

fn deadline_err(what: &str) -> WireError {
    WireError::Io(io::Error::new(io::ErrorKind::TimedOut, what.to_string()))
}

impl Gateway {
    /// Serve one inbound ShareNodes request.
    ///
    /// `remote` is the requester's endpoint as seen on the connection; it
    /// decides which locality classes of nodes it may be shown. At most
    /// [`MAX_SHARED_NODES`] addresses are written, sampled without
    /// replacement. No acknowledgment is read back.
    pub async fn share_nodes<S>(&self, conn: &mut S, remote: &NetAddress) -> Result<(), WireError>
    where
        S: AsyncWrite + Unpin,
    {
        let mut sample = self.state.read().await.nodes.share_candidates(remote);
        sample.shuffle(&mut rand::thread_rng());
        sample.truncate(MAX_SHARED_NODES);

        timeout(
            self.config.rpc_deadline,
            message::write_node_list(conn, &sample),
        )
        .await
        .map_err(|_| deadline_err("ShareNodes write timed out"))??;
        Ok(())
    }

    /// Run the calling side of ShareNodes against an open connection.
    ///
    /// Reads a bounded node list and merges it. A single invalid address
    /// is logged and skipped, never failing the batch; addresses we
    /// already know or that name ourselves are silently ignored. The
    /// updated list is persisted once after the whole batch. Returns how
    /// many addresses were actually added.
    pub async fn request_nodes<S>(&self, conn: &mut S) -> Result<usize, WireError>
    where
        S: AsyncRead + Unpin,
    {
        let received = timeout(self.config.rpc_deadline, message::read_node_list(conn))
            .await
            .map_err(|_| deadline_err("ShareNodes read timed out"))??;

        let mut added = 0;
        let snapshot = {
            let mut state = self.state.write().await;
            for addr in received {
                match state.nodes.add(addr.clone()) {
                    Ok(()) => added += 1,
                    Err(NodeError::AlreadyKnown) | Err(NodeError::OurAddress) => {}
                    Err(e) => log::warn!("peer sent invalid address '{}': {}", addr, e),
                }
            }
            state.nodes.to_vec()
        };
        self.save_nodes(&snapshot);
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayConfig;
    use crate::storage::NodeStore;

    fn gateway(dir: &std::path::Path) -> Gateway {
        Gateway::new(GatewayConfig {
            my_addr: NetAddress::from("5.6.7.8:23112"),
            genesis_id: "genesis-test".to_string(),
            data_dir: dir.to_path_buf(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_share_nodes_caps_sample() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());
        for i in 0..30u32 {
            gw.add_node(NetAddress::from(format!("8.8.{}.{}:1000", i / 250, i % 250 + 1)))
                .await
                .unwrap();
        }

        let mut buf = Vec::new();
        gw.share_nodes(&mut buf, &NetAddress::from("1.2.3.4:9000"))
            .await
            .unwrap();

        let sample = message::read_node_list(&mut &buf[..]).await.unwrap();
        assert_eq!(sample.len(), MAX_SHARED_NODES);

        // Sampling is without replacement and only over members.
        let nodes = gw.nodes().await;
        let mut seen = std::collections::HashSet::new();
        for addr in &sample {
            assert!(nodes.contains(addr));
            assert!(seen.insert(addr.clone()));
        }
    }

    #[tokio::test]
    async fn test_share_nodes_locality_filter() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());
        gw.add_node(NetAddress::from("127.0.0.1:1000")).await.unwrap();
        gw.add_node(NetAddress::from("192.168.1.9:1000")).await.unwrap();
        gw.add_node(NetAddress::from("8.8.8.8:1000")).await.unwrap();

        // A public requester must never see loopback or private nodes.
        let mut buf = Vec::new();
        gw.share_nodes(&mut buf, &NetAddress::from("1.2.3.4:9000"))
            .await
            .unwrap();
        let sample = message::read_node_list(&mut &buf[..]).await.unwrap();
        assert_eq!(sample, vec![NetAddress::from("8.8.8.8:1000")]);

        // A loopback requester may see everything.
        let mut buf = Vec::new();
        gw.share_nodes(&mut buf, &NetAddress::from("127.0.0.1:9000"))
            .await
            .unwrap();
        let sample = message::read_node_list(&mut &buf[..]).await.unwrap();
        assert_eq!(sample.len(), 3);
    }

    #[tokio::test]
    async fn test_request_nodes_merges_batch() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());

        let incoming = vec![
            NetAddress::from("1.1.1.1:1000"),
            NetAddress::from("2.2.2.2:1000"),
            NetAddress::from("3.3.3.3:1000"),
        ];
        let mut buf = Vec::new();
        message::write_node_list(&mut buf, &incoming).await.unwrap();

        let added = gw.request_nodes(&mut &buf[..]).await.unwrap();
        assert_eq!(added, 3);
        assert_eq!(gw.node_count().await, 3);

        // Batch was persisted once.
        let store = NodeStore::new(dir.path()).unwrap();
        assert_eq!(store.load().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_request_nodes_tolerates_bad_entries() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());

        let incoming = vec![
            NetAddress::from("5.6.7.8:23112"),       // our own address
            NetAddress::from("not-an-address"),      // malformed
            NetAddress::from("seed.example.io:1000"), // not an IP literal
            NetAddress::from("1.1.1.1:1000"),
            NetAddress::from("1.1.1.1:1000"), // duplicate within the batch
        ];
        let mut buf = Vec::new();
        message::write_node_list(&mut buf, &incoming).await.unwrap();

        let added = gw.request_nodes(&mut &buf[..]).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(gw.nodes().await, vec![NetAddress::from("1.1.1.1:1000")]);
    }

    #[tokio::test]
    async fn test_request_nodes_rejects_oversize_whole() {
        let dir = tempfile::tempdir().unwrap();
        let gw = gateway(dir.path());
        gw.add_node(NetAddress::from("9.9.9.9:1000")).await.unwrap();

        // Declares more entries than allowed; must fail without applying
        // anything.
        let mut buf = Vec::new();
        tokio::io::AsyncWriteExt::write_u32(&mut buf, (MAX_SHARED_NODES + 1) as u32)
            .await
            .unwrap();

        assert!(matches!(
            gw.request_nodes(&mut &buf[..]).await,
            Err(WireError::TooManyEntries(_))
        ));
        assert_eq!(gw.nodes().await, vec![NetAddress::from("9.9.9.9:1000")]);
    }
}
