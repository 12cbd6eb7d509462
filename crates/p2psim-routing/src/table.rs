use crate::spf::Nexthop;
use ipnetwork::Ipv4Network;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

/// How one prefix is reached from one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    /// Cumulative metric from the computing router.
    pub distance: u32,
    /// Equal-cost ways out; empty for a directly connected prefix.
    pub nexthops: BTreeSet<Nexthop>,
}

/// Forwarding state for one router: prefix to route entry. Comparable with
/// `==` so recomputation can be checked for set equality.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: BTreeMap<Ipv4Network, RouteEntry>,
}

impl RoutingTable {
    /// Installs a route, keeping the shorter entry when the prefix is already
    /// present and merging nexthops on an exact distance tie.
    pub fn install(&mut self, prefix: Ipv4Network, entry: RouteEntry) {
        match self.routes.get_mut(&prefix) {
            Some(existing) if existing.distance < entry.distance => {}
            Some(existing) if existing.distance == entry.distance => {
                existing.nexthops.extend(entry.nexthops);
            }
            _ => {
                self.routes.insert(prefix, entry);
            }
        }
    }

    pub fn get(&self, prefix: &Ipv4Network) -> Option<&RouteEntry> {
        self.routes.get(prefix)
    }

    /// Longest-prefix match.
    pub fn lookup(&self, addr: Ipv4Addr) -> Option<(Ipv4Network, &RouteEntry)> {
        self.routes
            .iter()
            .filter(|(prefix, _)| prefix.contains(addr))
            .max_by_key(|(prefix, _)| prefix.prefix())
            .map(|(prefix, entry)| (*prefix, entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ipv4Network, &RouteEntry)> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// One line per route, for reports and the CLI.
    pub fn render(&self, owner: impl std::fmt::Display) -> Vec<String> {
        self.routes
            .iter()
            .map(|(prefix, entry)| {
                if entry.nexthops.is_empty() {
                    format!("{owner}: {prefix} metric {} connected", entry.distance)
                } else {
                    let hops = entry
                        .nexthops
                        .iter()
                        .map(|h| format!("{} ({})", h.via, h.device))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{owner}: {prefix} metric {} via {hops}", entry.distance)
                }
            })
            .collect()
    }
}
