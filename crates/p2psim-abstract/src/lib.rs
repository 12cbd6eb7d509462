pub mod config;
pub mod packet;
pub mod scenario;
pub mod time;

pub use config::LinkConfig;
pub use packet::{Mac48, Packet, ParseMacError};
pub use time::{DataRate, Time};

pub use scenario::{LinkSpec, NodeSpec, TestAction, TestAssertion, TestScenario};
