//! The [`Peer`] implementation for one replica.

use crate::network::Network;
use nbta_core::{CoreResult, Key, Notify, Peer, ReplicaAddr};
use std::sync::Arc;

/// Sends notifications on behalf of one local replica.
#[derive(Clone)]
pub struct NetworkPeer {
    local: ReplicaAddr,
    network: Arc<Network>,
}

impl NetworkPeer {
    pub(crate) fn new(local: ReplicaAddr, network: Arc<Network>) -> Self {
        Self { local, network }
    }

    /// The replica this peer sends as.
    pub fn local(&self) -> &ReplicaAddr {
        &self.local
    }

    /// The network frames are queued on.
    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }
}

impl Peer for NetworkPeer {
    fn replicas_for(&self, key: &Key) -> Vec<ReplicaAddr> {
        self.network.directory().replicas_for(key)
    }

    fn async_notify(&self, to_replica: &ReplicaAddr, notify: Notify) -> CoreResult<()> {
        self.network
            .send(&self.local, to_replica, notify)
            .map_err(Into::into)
    }
}
