pub mod environment;
pub mod lsa;
pub mod lsdb;
pub mod manager;
pub mod router;
pub mod scenario_runner;
pub mod spf;
pub mod table;

pub use environment::{RouterId, RoutingEnvironment};
pub use lsa::{LinkRecord, LinkRecordKind, RouterLsa};
pub use lsdb::LinkStateDatabase;
pub use manager::GlobalRouting;
pub use router::{DEFAULT_METRIC, GlobalRouter};
pub use scenario_runner::{BuiltScenario, ScenarioError};
pub use spf::{Nexthop, SpfTree, Vertex, shortest_path_tree};
pub use table::{RouteEntry, RoutingTable};
