use crate::network::DeviceId;
use serde::Serialize;

/// A compact textual summary of important link-layer events for the timeline.
#[derive(Debug, Clone, Serialize)]
pub struct LinkEventSummary {
    pub time_ns: u64,
    pub description: String,
}

/// One frame reaching a receiving device.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub time_ns: u64,
    pub device: DeviceId,
    pub uid: u64,
    pub size_bytes: usize,
}

/// One upper-layer send and whether the link accepted it.
#[derive(Debug, Clone, Serialize)]
pub struct SendRecord {
    pub time_ns: u64,
    pub device: DeviceId,
    pub uid: u64,
    /// False when the frame was dropped at a full queue (or the channel had
    /// no peer to carry it).
    pub accepted: bool,
}

/// Per-device transmit queue totals at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct QueueDropSummary {
    pub device: DeviceId,
    pub enqueued: u64,
    pub dropped: u64,
}

/// A serializable snapshot of a finished simulation.
#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub scenario: Option<String>,
    pub duration_ns: u64,
    pub sends: Vec<SendRecord>,
    pub deliveries: Vec<DeliveryRecord>,
    pub link_events: Vec<LinkEventSummary>,
    pub queue_totals: Vec<QueueDropSummary>,
    /// Human-readable forwarding tables, one line per installed route.
    pub routes: Vec<String>,
}
