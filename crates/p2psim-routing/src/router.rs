use crate::environment::RouterId;
use crate::lsa::{LinkRecord, RouterLsa};
use ipnetwork::Ipv4Network;
use p2psim_simulator::{DeviceId, Network, NodeId};
use std::collections::BTreeMap;
use tracing::warn;

/// Default cost of a point-to-point adjacency.
pub const DEFAULT_METRIC: u32 = 1;

/// The per-node routing aggregate. A node carrying one of these is a router;
/// the aggregate owns the node's advertisements and rebuilds them on demand
/// from the topology snapshot.
#[derive(Debug)]
pub struct GlobalRouter {
    router_id: RouterId,
    node: NodeId,
    metric: u32,
    lsas: Vec<RouterLsa>,
}

impl GlobalRouter {
    pub fn new(router_id: RouterId, node: NodeId) -> Self {
        Self {
            router_id,
            node,
            metric: DEFAULT_METRIC,
            lsas: Vec::new(),
        }
    }

    pub fn router_id(&self) -> RouterId {
        self.router_id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Cost stamped on this router's link records from the next discovery on.
    pub fn set_metric(&mut self, metric: u32) {
        self.metric = metric;
    }

    pub fn lsa_count(&self) -> usize {
        self.lsas.len()
    }

    /// The n-th advertisement in insertion order.
    pub fn lsa(&self, n: usize) -> Option<&RouterLsa> {
        self.lsas.get(n)
    }

    pub fn lsas(&self) -> impl Iterator<Item = &RouterLsa> {
        self.lsas.iter()
    }

    /// Rebuilds this router's advertisements by walking its node's devices.
    ///
    /// Per device: no channel or no IPv4 means the interface is skipped; a
    /// channel without both endpoints is skipped with a trace; a router peer
    /// yields a point-to-point record plus a stub record for the subnet; a
    /// non-router peer yields the stub record alone. Returns the number of
    /// advertisements built.
    pub fn discover_lsas(
        &mut self,
        net: &Network,
        addressing: &BTreeMap<DeviceId, Ipv4Network>,
        router_ids: &BTreeMap<NodeId, RouterId>,
    ) -> usize {
        self.lsas.clear();
        let mut lsa = RouterLsa::new(self.router_id);

        for &dev_id in &net.node(self.node).devices {
            let device = net.device(dev_id);
            let Some(channel_id) = device.channel() else {
                continue;
            };
            let channel = net.channel(channel_id);
            if channel.endpoint_count() != 2 {
                warn!(
                    "router {}: skipping {} on a channel with {} endpoint(s)",
                    self.router_id,
                    net.device_label(dev_id),
                    channel.endpoint_count()
                );
                continue;
            }
            // Interfaces without IPv4 stay out of the advertisement.
            let Some(&ifaddr) = addressing.get(&dev_id) else {
                continue;
            };
            let Some(peer) = channel.peer_of(dev_id) else {
                continue;
            };

            let peer_node = net.device(peer).node();
            if let Some(&neighbor) = router_ids.get(&peer_node) {
                lsa.links
                    .push(LinkRecord::point_to_point(neighbor, ifaddr.ip(), self.metric));
            }
            lsa.links
                .push(LinkRecord::stub(ifaddr.network(), ifaddr.mask(), self.metric));
        }

        self.lsas.push(lsa);
        self.lsas.len()
    }
}
