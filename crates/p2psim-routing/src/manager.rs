use crate::environment::{RouterId, RoutingEnvironment};
use crate::lsa::LinkRecord;
use crate::lsdb::LinkStateDatabase;
use crate::router::GlobalRouter;
use crate::spf::{Nexthop, SpfTree, shortest_path_tree};
use crate::table::{RouteEntry, RoutingTable};
use ipnetwork::Ipv4Network;
use p2psim_simulator::{DeviceId, Network, NodeId};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Global route computation over a static topology snapshot.
///
/// Owns the routing side of the simulation: the router-ID environment, the
/// interface address map, each node's `GlobalRouter` aggregate, the
/// link-state database, and the computed forwarding tables. The link arena
/// stays purely L2; everything IPv4 lives here.
#[derive(Debug, Default)]
pub struct GlobalRouting {
    env: RoutingEnvironment,
    addressing: BTreeMap<DeviceId, Ipv4Network>,
    routers: BTreeMap<NodeId, GlobalRouter>,
    lsdb: LinkStateDatabase,
    tables: BTreeMap<RouterId, RoutingTable>,
}

impl GlobalRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns an interface address (address + mask) to a device. Interfaces
    /// never assigned are invisible to discovery.
    pub fn assign_address(&mut self, device: DeviceId, ifaddr: Ipv4Network) {
        self.addressing.insert(device, ifaddr);
    }

    pub fn address_of(&self, device: DeviceId) -> Option<Ipv4Network> {
        self.addressing.get(&device).copied()
    }

    /// Marks `node` as a router, allocating its ID in creation order.
    pub fn add_router(&mut self, node: NodeId) -> RouterId {
        let id = self.env.allocate_router_id();
        self.routers.insert(node, GlobalRouter::new(id, node));
        id
    }

    pub fn router(&self, node: NodeId) -> Option<&GlobalRouter> {
        self.routers.get(&node)
    }

    pub fn router_mut(&mut self, node: NodeId) -> Option<&mut GlobalRouter> {
        self.routers.get_mut(&node)
    }

    pub fn router_id_of(&self, node: NodeId) -> Option<RouterId> {
        self.routers.get(&node).map(|r| r.router_id())
    }

    pub fn lsdb(&self) -> &LinkStateDatabase {
        &self.lsdb
    }

    pub fn table(&self, router: RouterId) -> Option<&RoutingTable> {
        self.tables.get(&router)
    }

    pub fn table_for_node(&self, node: NodeId) -> Option<&RoutingTable> {
        self.table(self.router_id_of(node)?)
    }

    pub fn tables(&self) -> impl Iterator<Item = (RouterId, &RoutingTable)> {
        self.tables.iter().map(|(id, t)| (*id, t))
    }

    /// Builds the database and every forwarding table from scratch.
    ///
    /// Phase 1 walks every router and copies its advertisements into the
    /// LSDB; phase 2 roots one SPF run at each router and installs the
    /// resulting routes. Prior state is discarded first, so repeated calls
    /// against an unchanged topology produce identical tables.
    pub fn initialize_routes(&mut self, net: &Network) {
        self.lsdb.clear();
        self.tables.clear();

        let router_ids: BTreeMap<NodeId, RouterId> = self
            .routers
            .iter()
            .map(|(&node, router)| (node, router.router_id()))
            .collect();

        for router in self.routers.values_mut() {
            router.discover_lsas(net, &self.addressing, &router_ids);
            for lsa in router.lsas() {
                self.lsdb.insert(lsa.clone());
            }
        }
        info!(
            routers = self.lsdb.len(),
            "link-state database assembled"
        );

        let addressing = &self.addressing;
        for &root in router_ids.values() {
            let tree = shortest_path_tree(&self.lsdb, root, |link| {
                root_nexthop(addressing, link)
            });
            let table = build_table(&self.lsdb, &tree);
            self.tables.insert(root, table);
        }
        info!(tables = self.tables.len(), "forwarding tables installed");
    }

    /// Rendered routes of every table, one line each.
    pub fn render_routes(&self) -> Vec<String> {
        self.tables
            .iter()
            .flat_map(|(id, table)| table.render(id))
            .collect()
    }
}

/// Resolves a point-to-point record advertised by the root itself into the
/// concrete first hop: the record's `link_data` is the root's own interface
/// address, which the address map turns back into a device.
fn root_nexthop(
    addressing: &BTreeMap<DeviceId, Ipv4Network>,
    link: &LinkRecord,
) -> Option<Nexthop> {
    let device = addressing
        .iter()
        .find(|(_, ifaddr)| ifaddr.ip() == link.link_data)
        .map(|(&device, _)| device)?;
    Some(Nexthop {
        device,
        via: RouterId(link.link_id),
    })
}

/// Turns a shortest-path tree into routes: each vertex's stub records become
/// prefix routes at `vertex distance + record metric` through the vertex's
/// nexthops. The root's own stubs come out as connected routes, which is all
/// a disconnected router ends up with.
fn build_table(lsdb: &LinkStateDatabase, tree: &SpfTree) -> RoutingTable {
    let mut table = RoutingTable::default();
    for vertex in tree.vertices.values() {
        let Some(lsa) = lsdb.get(vertex.id) else {
            continue;
        };
        for stub in lsa.stub_links() {
            let prefix = match Ipv4Network::with_netmask(stub.link_id, stub.link_data) {
                Ok(prefix) => prefix,
                Err(err) => {
                    warn!(
                        "malformed stub record {}/{} from {}: {err}; skipped",
                        stub.link_id, stub.link_data, vertex.id
                    );
                    continue;
                }
            };
            table.install(prefix, RouteEntry {
                distance: vertex.distance.saturating_add(stub.metric),
                nexthops: vertex.nexthops.clone(),
            });
        }
    }
    table
}
