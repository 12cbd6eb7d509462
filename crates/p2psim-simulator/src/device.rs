use crate::network::{ChannelId, DeviceId, NodeId};
use crate::queue::{DropTailQueue, QueueStats};
use p2psim_abstract::{DataRate, Mac48, Packet, Time};

/// Transmitter state: at most one frame on the wire per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Ready,
    Busy,
}

/// Capabilities common to all device flavors. Only the point-to-point
/// variant exists in this simulator, but consumers (the routing layer, the
/// trace hooks) only need this surface.
pub trait NetDevice {
    fn address(&self) -> Mac48;
    fn broadcast(&self) -> Mac48 {
        Mac48::BROADCAST
    }
    fn is_link_up(&self) -> bool;
    fn is_point_to_point(&self) -> bool;
    fn is_broadcast(&self) -> bool;
    fn is_multicast(&self) -> bool;
    fn needs_arp(&self) -> bool;
}

/// What `send_to` decided; the engine turns this into scheduled events.
#[derive(Debug)]
pub enum SendOutcome {
    /// The wire was idle. The frame goes out now; the engine must hand it to
    /// the channel and schedule the completion callback after `complete_after`
    /// (serialization time plus the interframe gap).
    Transmit {
        packet: Packet,
        complete_after: Time,
    },
    /// The transmitter was busy; the frame waits in the queue.
    Queued,
    /// The transmitter was busy and the queue was full.
    Dropped,
}

/// One endpoint of a point-to-point link: a UART-like serial transmitter
/// coupled to a drop-tail queue, plus the receive path up to the trace hooks.
#[derive(Debug)]
pub struct PointToPointNetDevice {
    id: DeviceId,
    node: NodeId,
    address: Mac48,
    state: TxState,
    data_rate: DataRate,
    interframe_gap: Time,
    channel: Option<ChannelId>,
    queue: Option<DropTailQueue>,
    link_up: bool,
}

impl PointToPointNetDevice {
    pub(crate) fn new(id: DeviceId, node: NodeId, address: Mac48) -> Self {
        Self {
            id,
            node,
            address,
            state: TxState::Ready,
            data_rate: DataRate::from_mbps(10),
            interframe_gap: Time::ZERO,
            channel: None,
            queue: None,
            link_up: false,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    pub fn interframe_gap(&self) -> Time {
        self.interframe_gap
    }

    /// Takes effect on subsequent transmissions.
    pub fn set_data_rate(&mut self, rate: DataRate) {
        self.data_rate = rate;
    }

    /// Takes effect on subsequent transmissions.
    pub fn set_interframe_gap(&mut self, gap: Time) {
        self.interframe_gap = gap;
    }

    /// Records the channel, copies its rate into the device, and marks the
    /// link up. Link-up on single-side attach: the channel still refuses to
    /// carry frames until the far side exists.
    pub(crate) fn attach(&mut self, channel: ChannelId, rate: DataRate) {
        self.channel = Some(channel);
        self.data_rate = rate;
        self.link_up = true;
    }

    pub(crate) fn add_queue(&mut self, queue: DropTailQueue) {
        self.queue = Some(queue);
    }

    pub fn queue_stats(&self) -> Option<QueueStats> {
        self.queue.as_ref().map(|q| q.stats())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.as_ref().map_or(0, |q| q.len())
    }

    /// Upper-layer entry point. Preconditions (asserted): the link is up and
    /// a queue is attached.
    pub fn send_to(&mut self, packet: Packet, _dest: Mac48) -> SendOutcome {
        assert!(self.link_up, "send_to with link down on {:?}", self.id);
        let queue = self
            .queue
            .as_mut()
            .unwrap_or_else(|| panic!("send_to without a queue on {:?}", self.id));

        match self.state {
            TxState::Ready => {
                // Ready implies the queue was drained by the last completion.
                debug_assert!(queue.is_empty(), "frames queued behind an idle transmitter");
                self.state = TxState::Busy;
                let complete_after = self.data_rate.tx_time(packet.size()) + self.interframe_gap;
                SendOutcome::Transmit {
                    packet,
                    complete_after,
                }
            }
            TxState::Busy => {
                if queue.enqueue(packet) {
                    SendOutcome::Queued
                } else {
                    SendOutcome::Dropped
                }
            }
        }
    }

    /// The scheduled end of a transmission (serialization plus interframe
    /// gap). Returns the next frame to put on the wire together with its own
    /// completion delay, or `None` after returning to `Ready`.
    ///
    /// The queue is drained here and only here, so it is empty whenever the
    /// transmitter is `Ready`.
    pub fn transmit_complete(&mut self) -> Option<(Packet, Time)> {
        assert_eq!(
            self.state,
            TxState::Busy,
            "transmit_complete on idle {:?}",
            self.id
        );
        let queue = self
            .queue
            .as_mut()
            .unwrap_or_else(|| panic!("transmit_complete without a queue on {:?}", self.id));

        match queue.dequeue() {
            Some(packet) => {
                let complete_after = self.data_rate.tx_time(packet.size()) + self.interframe_gap;
                Some((packet, complete_after))
            }
            None => {
                self.state = TxState::Ready;
                None
            }
        }
    }
}

impl NetDevice for PointToPointNetDevice {
    fn address(&self) -> Mac48 {
        self.address
    }

    fn is_link_up(&self) -> bool {
        self.link_up
    }

    fn is_point_to_point(&self) -> bool {
        true
    }

    fn is_broadcast(&self) -> bool {
        true
    }

    fn is_multicast(&self) -> bool {
        true
    }

    fn needs_arp(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> PointToPointNetDevice {
        let mut dev = PointToPointNetDevice::new(DeviceId(0), NodeId(0), Mac48([0, 0, 0, 0, 0, 1]));
        dev.attach(ChannelId(0), DataRate::from_mbps(10));
        dev.add_queue(DropTailQueue::new(Some(4)));
        dev
    }

    #[test]
    fn ready_transmits_immediately() {
        let mut dev = device();
        match dev.send_to(Packet::of_size(1250), Mac48::BROADCAST) {
            SendOutcome::Transmit { complete_after, .. } => {
                assert_eq!(complete_after, Time::from_millis(1));
            }
            other => panic!("expected Transmit, got {:?}", other),
        }
        assert_eq!(dev.state(), TxState::Busy);
    }

    #[test]
    fn busy_enqueues_then_drains_in_order() {
        let mut dev = device();
        let first = Packet::of_size(1250);
        let second = Packet::of_size(1250);
        let second_uid = second.uid();

        assert!(matches!(
            dev.send_to(first, Mac48::BROADCAST),
            SendOutcome::Transmit { .. }
        ));
        assert!(matches!(
            dev.send_to(second, Mac48::BROADCAST),
            SendOutcome::Queued
        ));
        assert_eq!(dev.queue_len(), 1);

        let (next, delay) = dev.transmit_complete().unwrap();
        assert_eq!(next.uid(), second_uid);
        assert_eq!(delay, Time::from_millis(1));
        assert_eq!(dev.state(), TxState::Busy);

        assert!(dev.transmit_complete().is_none());
        assert_eq!(dev.state(), TxState::Ready);
        assert_eq!(dev.queue_len(), 0);
    }

    #[test]
    fn interframe_gap_extends_completion() {
        let mut dev = device();
        dev.set_interframe_gap(Time::from_nanos(9_600));
        match dev.send_to(Packet::of_size(1250), Mac48::BROADCAST) {
            SendOutcome::Transmit { complete_after, .. } => {
                assert_eq!(complete_after, Time::from_nanos(1_009_600));
            }
            other => panic!("expected Transmit, got {:?}", other),
        }
    }

    #[test]
    fn full_queue_drops() {
        let mut dev = PointToPointNetDevice::new(DeviceId(0), NodeId(0), Mac48([0; 6]));
        dev.attach(ChannelId(0), DataRate::from_mbps(10));
        dev.add_queue(DropTailQueue::new(Some(1)));

        assert!(matches!(
            dev.send_to(Packet::of_size(100), Mac48::BROADCAST),
            SendOutcome::Transmit { .. }
        ));
        assert!(matches!(
            dev.send_to(Packet::of_size(100), Mac48::BROADCAST),
            SendOutcome::Queued
        ));
        assert!(matches!(
            dev.send_to(Packet::of_size(100), Mac48::BROADCAST),
            SendOutcome::Dropped
        ));
        assert_eq!(dev.queue_stats().unwrap().dropped, 1);
    }

    #[test]
    #[should_panic(expected = "link down")]
    fn send_with_link_down_is_a_contract_violation() {
        let mut dev = PointToPointNetDevice::new(DeviceId(0), NodeId(0), Mac48([0; 6]));
        dev.add_queue(DropTailQueue::new(None));
        dev.send_to(Packet::of_size(1), Mac48::BROADCAST);
    }

    #[test]
    fn capability_surface() {
        let dev = device();
        assert!(dev.is_point_to_point());
        assert!(!dev.needs_arp());
        assert!(dev.is_link_up());
        assert_eq!(dev.broadcast(), Mac48::BROADCAST);
    }
}
