use crate::manager::GlobalRouting;
use anyhow::{Context, Result, bail};
use ipnetwork::Ipv4Network;
use p2psim_abstract::{Mac48, Packet, TestAction, TestAssertion, TestScenario, Time};
use p2psim_simulator::{DeviceId, NetDevice, Network, NodeId, SimulationReport, Simulator};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// A scenario that names something the topology does not have.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("unknown node `{0}`")]
    UnknownNode(String),
    #[error("no link between `{0}` and `{1}`")]
    NoLink(String, String),
    #[error("invalid interface address `{addr}`: {source}")]
    BadAddress {
        addr: String,
        source: ipnetwork::IpNetworkError,
    },
}

/// A scenario materialized into a ready-to-run simulation.
pub struct BuiltScenario {
    pub sim: Simulator,
    pub routing: GlobalRouting,
    nodes: HashMap<String, NodeId>,
}

impl BuiltScenario {
    pub fn node(&self, name: &str) -> Result<NodeId, ScenarioError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownNode(name.to_string()))
    }

    /// The device on `from` whose link leads to `to`.
    fn device_toward(&self, from: &str, to: &str) -> Result<DeviceId, ScenarioError> {
        let from_id = self.node(from)?;
        let to_id = self.node(to)?;
        let net = &self.sim.network;
        net.node(from_id)
            .devices
            .iter()
            .copied()
            .find(|&dev| {
                net.peer_of(dev)
                    .is_some_and(|peer| net.device(peer).node() == to_id)
            })
            .ok_or_else(|| ScenarioError::NoLink(from.to_string(), to.to_string()))
    }
}

fn parse_prefix(addr: &str) -> Result<Ipv4Network, ScenarioError> {
    addr.parse().map_err(|source| ScenarioError::BadAddress {
        addr: addr.to_string(),
        source,
    })
}

/// Materializes the topology half of a scenario: arena, links, addresses,
/// routers.
pub fn build(scenario: &TestScenario) -> Result<BuiltScenario, ScenarioError> {
    let mut net = Network::new();
    let mut routing = GlobalRouting::new();
    let mut nodes = HashMap::new();

    for spec in &scenario.nodes {
        let id = net.add_node(spec.name.clone());
        nodes.insert(spec.name.clone(), id);
    }

    for link in &scenario.links {
        let a = *nodes
            .get(&link.a)
            .ok_or_else(|| ScenarioError::UnknownNode(link.a.clone()))?;
        let b = *nodes
            .get(&link.b)
            .ok_or_else(|| ScenarioError::UnknownNode(link.b.clone()))?;
        let (dev_a, dev_b) = net.connect(a, b, &link.config);
        if let Some(addr) = &link.a_addr {
            routing.assign_address(dev_a, parse_prefix(addr)?);
        }
        if let Some(addr) = &link.b_addr {
            routing.assign_address(dev_b, parse_prefix(addr)?);
        }
    }

    // Router IDs allocate in node declaration order.
    for spec in scenario.nodes.iter().filter(|s| s.router) {
        routing.add_router(nodes[&spec.name]);
    }

    Ok(BuiltScenario {
        sim: Simulator::new(net),
        routing,
        nodes,
    })
}

/// Loads a TOML scenario from disk, runs it, and checks its assertions.
pub fn run_scenario(path: impl AsRef<Path>) -> Result<SimulationReport> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    let scenario: TestScenario =
        toml::from_str(&content).context("Failed to parse scenario file")?;
    run(&scenario)
}

/// Runs an in-memory scenario to completion and checks its assertions.
pub fn run(scenario: &TestScenario) -> Result<SimulationReport> {
    info!(name = %scenario.name, "running scenario");
    let mut built = build(scenario)?;

    if scenario.nodes.iter().any(|s| s.router) {
        built.routing.initialize_routes(&built.sim.network);
    }

    for action in &scenario.actions {
        match action {
            TestAction::Send {
                time_ns,
                from,
                to,
                size_bytes,
            } => {
                let device = built.device_toward(from, to)?;
                let dest = built
                    .sim
                    .network
                    .peer_of(device)
                    .map(|peer| built.sim.network.device(peer).address())
                    .unwrap_or(Mac48::BROADCAST);
                built.sim.schedule_send(
                    Time::from_nanos(*time_ns),
                    device,
                    Packet::of_size(*size_bytes),
                    dest,
                );
            }
        }
    }

    built.sim.run_until_complete();

    for assertion in &scenario.assertions {
        check(&built, assertion)?;
    }

    Ok(built
        .sim
        .export_report(Some(scenario.name.clone()), built.routing.render_routes()))
}

fn check(built: &BuiltScenario, assertion: &TestAssertion) -> Result<()> {
    match assertion {
        TestAssertion::DeliveredCount { node, count } => {
            let actual = built.sim.deliveries_to(built.node(node)?).len();
            if actual != *count {
                bail!("expected {count} deliveries at `{node}`, saw {actual}");
            }
        }
        TestAssertion::DeliveryTime {
            node,
            index,
            time_ns,
        } => {
            let deliveries = built.sim.deliveries_to(built.node(node)?);
            let Some(record) = deliveries.get(*index) else {
                bail!(
                    "`{node}` has {} deliveries, none at index {index}",
                    deliveries.len()
                );
            };
            if record.time_ns != *time_ns {
                bail!(
                    "delivery {index} at `{node}`: expected t={time_ns}ns, saw t={}ns",
                    record.time_ns
                );
            }
        }
        TestAssertion::AcceptedCount { node, count } => {
            let actual = built
                .sim
                .sends_from(built.node(node)?)
                .iter()
                .filter(|s| s.accepted)
                .count();
            if actual != *count {
                bail!("expected {count} accepted sends from `{node}`, saw {actual}");
            }
        }
        TestAssertion::QueueDrops { node, count } => {
            let node_id = built.node(node)?;
            let actual: u64 = built
                .sim
                .network
                .node(node_id)
                .devices
                .iter()
                .filter_map(|&dev| built.sim.network.device(dev).queue_stats())
                .map(|stats| stats.dropped)
                .sum();
            if actual != *count {
                bail!("expected {count} queue drops at `{node}`, saw {actual}");
            }
        }
        TestAssertion::Route {
            from,
            dest,
            distance,
            nexthops,
        } => {
            let node_id = built.node(from)?;
            let table = built
                .routing
                .table_for_node(node_id)
                .with_context(|| format!("`{from}` is not a router"))?;
            let prefix = parse_prefix(dest)?;
            let Some(route) = table.get(&prefix) else {
                bail!("`{from}` has no route toward {dest}");
            };
            if route.distance != *distance {
                bail!(
                    "route {dest} at `{from}`: expected metric {distance}, saw {}",
                    route.distance
                );
            }
            if let Some(expected) = nexthops
                && route.nexthops.len() != *expected
            {
                bail!(
                    "route {dest} at `{from}`: expected {expected} nexthops, saw {}",
                    route.nexthops.len()
                );
            }
        }
        TestAssertion::MaxDuration { time_ns } => {
            if built.sim.now().as_nanos() > *time_ns {
                bail!(
                    "simulation ran to {}ns, past the {time_ns}ns bound",
                    built.sim.now().as_nanos()
                );
            }
        }
    }
    Ok(())
}
