use serde::{Deserialize, Serialize};

/// Parameters of one point-to-point link: the channel's rate and propagation
/// delay, plus the per-endpoint interframe gap and transmit queue depth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Channel bit-rate in bits per second.
    pub rate_bps: u64,
    /// One-way propagation delay in nanoseconds.
    pub delay_ns: u64,
    /// Minimum idle time between successive transmissions on one endpoint.
    #[serde(default)]
    pub ifg_ns: u64,
    /// Transmit queue depth per endpoint; omit for unbounded.
    #[serde(default = "default_queue")]
    pub queue: Option<usize>,
}

fn default_queue() -> Option<usize> {
    Some(100)
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            rate_bps: 10_000_000,
            delay_ns: 2_000_000,
            ifg_ns: 0,
            queue: default_queue(),
        }
    }
}
