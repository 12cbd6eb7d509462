use crate::network::{ChannelId, DeviceId};
use p2psim_abstract::{DataRate, Time};

/// The shared medium between exactly two point-to-point devices.
///
/// The channel publishes one bit-rate and one propagation delay and keeps no
/// state about in-flight frames; delivery events carry them instead. Each
/// direction is an independent serial wire, so there is no contention.
#[derive(Debug)]
pub struct PointToPointChannel {
    id: ChannelId,
    data_rate: DataRate,
    delay: Time,
    endpoints: [Option<DeviceId>; 2],
}

impl PointToPointChannel {
    pub(crate) fn new(id: ChannelId, data_rate: DataRate, delay: Time) -> Self {
        Self {
            id,
            data_rate,
            delay,
            endpoints: [None, None],
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    pub fn delay(&self) -> Time {
        self.delay
    }

    /// Records the device as an endpoint. Fails once two are attached.
    pub(crate) fn attach(&mut self, device: DeviceId) -> bool {
        for slot in &mut self.endpoints {
            if slot.is_none() {
                *slot = Some(device);
                return true;
            }
        }
        false
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_some()).count()
    }

    /// The non-sender endpoint, if both sides are attached.
    pub fn peer_of(&self, device: DeviceId) -> Option<DeviceId> {
        match self.endpoints {
            [Some(a), Some(b)] if a == device => Some(b),
            [Some(a), Some(b)] if b == device => Some(a),
            _ => None,
        }
    }
}
