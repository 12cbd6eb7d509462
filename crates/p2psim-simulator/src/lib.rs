pub mod channel;
pub mod device;
pub mod engine;
pub mod network;
pub mod node;
pub mod queue;
pub mod trace;

pub use channel::PointToPointChannel;
pub use device::{NetDevice, PointToPointNetDevice, SendOutcome, TxState};
pub use engine::{EventKind, RxObserver, Simulator};
pub use network::{ChannelId, DeviceId, Network, NodeId};
pub use node::Node;
pub use queue::{DropTailQueue, QueueStats};
pub use trace::{DeliveryRecord, LinkEventSummary, SendRecord, SimulationReport};
