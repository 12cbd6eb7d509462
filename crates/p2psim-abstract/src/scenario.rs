use crate::config::LinkConfig;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub links: Vec<LinkSpec>,
    #[serde(default)]
    pub actions: Vec<TestAction>,
    #[serde(default)]
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    /// Router nodes take part in link-state discovery and SPF.
    #[serde(default)]
    pub router: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
    #[serde(flatten)]
    pub config: LinkConfig,
    /// Interface address of the `a` endpoint, `"10.0.0.1/30"` form.
    pub a_addr: Option<String>,
    /// Interface address of the `b` endpoint.
    pub b_addr: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAction {
    /// Hand a packet to `from`'s device on its link toward `to`.
    Send {
        time_ns: u64,
        from: String,
        to: String,
        size_bytes: usize,
    },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// Assert how many packets reached `node` across all its devices.
    DeliveredCount { node: String, count: usize },
    /// Assert the exact virtual time of `node`'s n-th delivery.
    DeliveryTime {
        node: String,
        index: usize,
        time_ns: u64,
    },
    /// Assert how many upper-layer sends from `node` were accepted
    /// (transmitted or queued, not dropped).
    AcceptedCount { node: String, count: usize },
    /// Assert the number of packets dropped at `node`'s transmit queues.
    QueueDrops { node: String, count: u64 },
    /// Assert that `from`'s forwarding table reaches `dest` at the given
    /// cumulative metric, optionally with an exact equal-cost nexthop count.
    Route {
        from: String,
        dest: String,
        distance: u32,
        nexthops: Option<usize>,
    },
    /// Assert that the simulation drained its event queue within time.
    MaxDuration { time_ns: u64 },
}
