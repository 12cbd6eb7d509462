use crate::environment::RouterId;
use crate::lsa::LinkRecord;
use crate::lsdb::LinkStateDatabase;
use p2psim_simulator::DeviceId;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// One equal-cost way out of the root toward a destination: the outgoing
/// device on the root and the neighbor router it hands frames to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Nexthop {
    pub device: DeviceId,
    pub via: RouterId,
}

/// A router on the shortest-path tree. Parents and nexthops are sets so
/// equal-cost paths accumulate instead of replacing each other.
#[derive(Debug, Clone)]
pub struct Vertex {
    pub id: RouterId,
    pub distance: u32,
    pub parents: BTreeSet<RouterId>,
    pub nexthops: BTreeSet<Nexthop>,
}

impl Vertex {
    fn new(id: RouterId, distance: u32) -> Self {
        Self {
            id,
            distance,
            parents: BTreeSet::new(),
            nexthops: BTreeSet::new(),
        }
    }
}

/// The shortest-path tree rooted at one router. Vertices are freshly built
/// on every computation; nothing is shared with the database or prior runs.
#[derive(Debug)]
pub struct SpfTree {
    pub root: RouterId,
    pub vertices: BTreeMap<RouterId, Vertex>,
}

impl SpfTree {
    pub fn distance_to(&self, router: RouterId) -> Option<u32> {
        self.vertices.get(&router).map(|v| v.distance)
    }
}

/// Dijkstra over the two-way-checked advertisement graph (RFC 2328 §16.1).
///
/// The candidate list is keyed by `(distance, router)`, so `pop_first` always
/// extracts the closest pending vertex with router-ID ascending as the stable
/// secondary order. A vertex is unexplored until created, a candidate while
/// in the candidate map, and on the tree once moved to `vertices`.
///
/// `resolve_root_nexthop` maps a point-to-point record advertised by the root
/// itself to the concrete outgoing hop; deeper vertices inherit the nexthop
/// set of their parent.
pub fn shortest_path_tree(
    lsdb: &LinkStateDatabase,
    root: RouterId,
    resolve_root_nexthop: impl Fn(&LinkRecord) -> Option<Nexthop>,
) -> SpfTree {
    let mut tree = SpfTree {
        root,
        vertices: BTreeMap::new(),
    };

    if lsdb.get(root).is_none() {
        warn!("spf: no advertisement for root {root}; empty tree");
        return tree;
    }

    let mut candidates: BTreeMap<(u32, RouterId), Vertex> = BTreeMap::new();
    candidates.insert((0, root), Vertex::new(root, 0));

    while let Some(((_, vertex_id), vertex)) = candidates.pop_first() {
        let distance_here = vertex.distance;
        let inherited = vertex.nexthops.clone();
        tree.vertices.insert(vertex_id, vertex);

        let Some(lsa) = lsdb.get(vertex_id) else {
            // Referenced by an edge but never advertised; a leaf by default.
            continue;
        };

        for link in lsa.point_to_point_links() {
            let neighbor = RouterId(link.link_id);

            // Two-way check: the neighbor must advertise this link back.
            if !lsdb.is_two_way(vertex_id, neighbor) {
                debug!("spf: {vertex_id} -> {neighbor} is not two-way, edge dropped");
                continue;
            }

            if tree.vertices.contains_key(&neighbor) {
                continue;
            }

            let distance = distance_here.saturating_add(link.metric);
            let nexthops: BTreeSet<Nexthop> = if vertex_id == root {
                resolve_root_nexthop(link).into_iter().collect()
            } else {
                inherited.clone()
            };

            // Already a candidate? Shorter paths re-key it, equal paths merge
            // into it, longer paths lose.
            if let Some((&key, candidate)) = candidates.iter_mut().find(|(_, c)| c.id == neighbor)
            {
                match distance.cmp(&candidate.distance) {
                    Ordering::Less => {
                        candidates.remove(&key);
                    }
                    Ordering::Equal => {}
                    Ordering::Greater => continue,
                }
            }

            let candidate = candidates
                .entry((distance, neighbor))
                .or_insert_with(|| Vertex::new(neighbor, distance));
            candidate.parents.insert(vertex_id);
            candidate.nexthops.extend(nexthops);
        }
    }

    tree
}
