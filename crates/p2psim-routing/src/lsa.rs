use crate::environment::RouterId;
use serde::Serialize;
use std::net::Ipv4Addr;

/// Router link record types from RFC 2328 §12.4.1. Transit and virtual links
/// are reserved for broadcast-network and area support and never emitted by
/// the point-to-point discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkRecordKind {
    Unknown,
    PointToPoint,
    StubNetwork,
    TransitNetwork,
    VirtualLink,
}

/// One link described by a router advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkRecord {
    pub kind: LinkRecordKind,
    /// PointToPoint: the neighbor's router ID. StubNetwork: the network
    /// address with host bits zeroed.
    pub link_id: Ipv4Addr,
    /// PointToPoint: the local interface address. StubNetwork: the mask.
    pub link_data: Ipv4Addr,
    pub metric: u32,
}

impl LinkRecord {
    pub fn point_to_point(neighbor: RouterId, local_addr: Ipv4Addr, metric: u32) -> Self {
        Self {
            kind: LinkRecordKind::PointToPoint,
            link_id: neighbor.0,
            link_data: local_addr,
            metric,
        }
    }

    pub fn stub(network: Ipv4Addr, mask: Ipv4Addr, metric: u32) -> Self {
        Self {
            kind: LinkRecordKind::StubNetwork,
            link_id: network,
            link_data: mask,
            metric,
        }
    }
}

/// A router's link-state advertisement: the full set of its adjacencies and
/// attached subnets. `link_state_id` and `advertising_router` both carry the
/// emitting router's ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterLsa {
    pub link_state_id: RouterId,
    pub advertising_router: RouterId,
    pub links: Vec<LinkRecord>,
}

impl RouterLsa {
    pub fn new(router: RouterId) -> Self {
        Self {
            link_state_id: router,
            advertising_router: router,
            links: Vec::new(),
        }
    }

    pub fn point_to_point_links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links
            .iter()
            .filter(|l| l.kind == LinkRecordKind::PointToPoint)
    }

    pub fn stub_links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links
            .iter()
            .filter(|l| l.kind == LinkRecordKind::StubNetwork)
    }

    /// Whether this LSA advertises a point-to-point link back to `neighbor`;
    /// one half of the two-way check.
    pub fn has_point_to_point_to(&self, neighbor: RouterId) -> bool {
        self.point_to_point_links()
            .any(|l| l.link_id == neighbor.0)
    }
}
