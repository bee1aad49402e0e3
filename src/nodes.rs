//! Known-node set
//!
//! The set of remembered network addresses. A node here is only a candidate
//! address believed to belong to a reachable participant; live connections
//! are tracked separately in [`crate::peer::PeerSet`].
//!
//! This type does no locking of its own. The gateway holds it behind a
//! reader/writer lock and all callers go through that lock.

use crate::address::{AddressError, NetAddress};
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

/// Node list errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("can't add our own address")]
    OurAddress,
    #[error("node already known")]
    AlreadyKnown,
    #[error("no record of that node")]
    NotFound,
    #[error("no nodes in the node list")]
    NoNodes,
    #[error("invalid address: {0}")]
    Invalid(#[from] AddressError),
}

/// Admission check for candidate node addresses.
///
/// Pure predicate: rejects our own address, duplicates, malformed
/// addresses, and hosts that are not IP literals. No side effects.
#[derive(Debug, Clone)]
pub struct AddressValidator {
    own_addr: NetAddress,
}

impl AddressValidator {
    pub fn new(own_addr: NetAddress) -> Self {
        Self { own_addr }
    }

    pub fn validate(
        &self,
        addr: &NetAddress,
        members: &HashSet<NetAddress>,
    ) -> Result<(), NodeError> {
        if *addr == self.own_addr {
            return Err(NodeError::OurAddress);
        }
        if members.contains(addr) {
            return Err(NodeError::AlreadyKnown);
        }
        addr.check_valid()?;
        if addr.ip().is_none() {
            return Err(NodeError::Invalid(AddressError::HostNotIp(
                addr.host().to_string(),
            )));
        }
        Ok(())
    }
}

/// The set of known node addresses.
#[derive(Debug)]
pub struct NodeSet {
    members: HashSet<NetAddress>,
    validator: AddressValidator,
}

impl NodeSet {
    pub fn new(own_addr: NetAddress) -> Self {
        Self {
            members: HashSet::new(),
            validator: AddressValidator::new(own_addr),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, addr: &NetAddress) -> bool {
        self.members.contains(addr)
    }

    /// Add an address after running the admission check.
    pub fn add(&mut self, addr: NetAddress) -> Result<(), NodeError> {
        self.validator.validate(&addr, &self.members)?;
        self.members.insert(addr);
        Ok(())
    }

    /// Remove an address, failing if it was never known.
    pub fn remove(&mut self, addr: &NetAddress) -> Result<(), NodeError> {
        if !self.members.remove(addr) {
            return Err(NodeError::NotFound);
        }
        Ok(())
    }

    /// Pick one member uniformly at random.
    ///
    /// Linear in the set size: draws an index in `[0, len)` and scans to it.
    /// At node-list scale this is fine; if the list were ever allowed to
    /// grow toward whole-network size it would need an index-addressable
    /// structure instead.
    pub fn random_pick(&self) -> Result<NetAddress, NodeError> {
        if self.members.is_empty() {
            return Err(NodeError::NoNodes);
        }
        let mut r = rand::thread_rng().gen_range(0..self.members.len());
        for node in &self.members {
            if r == 0 {
                return Ok(node.clone());
            }
            r -= 1;
        }
        Err(NodeError::NoNodes)
    }

    /// Snapshot of every member, for persistence.
    pub fn to_vec(&self) -> Vec<NetAddress> {
        self.members.iter().cloned().collect()
    }

    /// Members that may be shared with the given requester.
    ///
    /// Loopback nodes are shared only with a loopback requester, and
    /// private-network nodes only with a loopback or private requester, so
    /// that addresses meaningless outside our own network never propagate.
    pub fn share_candidates(&self, remote: &NetAddress) -> Vec<NetAddress> {
        self.members
            .iter()
            .filter(|node| {
                if node.is_loopback() && !remote.is_loopback() {
                    return false;
                }
                if node.is_local() && !remote.is_loopback() && !remote.is_local() {
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }
}
