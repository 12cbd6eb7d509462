use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;

/// A 32-bit router identifier, written as a dotted quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RouterId(pub Ipv4Addr);

impl fmt::Display for RouterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Allocates router identifiers for one simulation run.
///
/// Identifiers are dense and monotonic in creation order, starting at
/// `0.0.0.1`. The environment is a plain handle owned by whoever builds the
/// routing fabric; there is no process-wide global.
#[derive(Debug)]
pub struct RoutingEnvironment {
    next: u32,
}

impl RoutingEnvironment {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn allocate_router_id(&mut self) -> RouterId {
        let id = RouterId(Ipv4Addr::from(self.next));
        self.next += 1;
        id
    }
}

impl Default for RoutingEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_dense_and_monotonic_from_one() {
        let mut env = RoutingEnvironment::new();
        assert_eq!(env.allocate_router_id().to_string(), "0.0.0.1");
        assert_eq!(env.allocate_router_id().to_string(), "0.0.0.2");
        assert_eq!(env.allocate_router_id().to_string(), "0.0.0.3");
    }

    #[test]
    fn ids_order_as_integers() {
        let mut env = RoutingEnvironment::new();
        let mut prev = env.allocate_router_id();
        for _ in 0..300 {
            let next = env.allocate_router_id();
            assert!(prev < next);
            prev = next;
        }
        // 0.0.1.x territory after 256 allocations, still ascending.
        assert_eq!(prev.to_string(), "0.0.1.45");
    }
}
