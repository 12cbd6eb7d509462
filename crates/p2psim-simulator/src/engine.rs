use crate::device::SendOutcome;
use crate::network::{DeviceId, Network, NodeId};
use crate::trace::{DeliveryRecord, LinkEventSummary, QueueDropSummary, SendRecord, SimulationReport};
use p2psim_abstract::{Mac48, Packet, Time};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use tracing::{debug, info, warn};

/// Callback invoked on each frame a device receives, before it is recorded.
pub type RxObserver = Box<dyn FnMut(Time, &Packet)>;

#[derive(Debug)]
pub enum EventKind {
    /// The upper layer hands a frame to a device for transmission.
    AppSend {
        device: DeviceId,
        packet: Packet,
        dest: Mac48,
    },
    /// End of serialization plus interframe gap on a device.
    TransmitComplete { device: DeviceId },
    /// Channel propagation finished; the frame reaches the peer device.
    Deliver { to: DeviceId, packet: Packet },
}

#[derive(Debug)]
struct Event {
    time: Time,
    kind: EventKind,
    id: u64, // Unique ID to order events scheduled for the same time
}

// Custom Ord for Min-Heap (smallest time pops first); ties break on insertion
// order, which is the kernel's authoritative same-time rule.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// The discrete-event kernel plus the link layer it drives.
///
/// Holds the virtual clock, the pending-event heap, and the topology arena.
/// Event handlers are short synchronous functions that mutate device state
/// and schedule follow-up events; nothing suspends and nothing cancels.
pub struct Simulator {
    time: Time,
    event_queue: BinaryHeap<Event>,
    event_id_counter: u64,

    pub network: Network,

    // Structured results for graders and assertions
    pub sends: Vec<SendRecord>,
    pub deliveries: Vec<DeliveryRecord>,

    /// Timeline of link events (transmissions, deliveries, drops).
    pub link_events: Vec<LinkEventSummary>,

    rx_observers: HashMap<DeviceId, Vec<RxObserver>>,
}

impl Simulator {
    pub fn new(network: Network) -> Self {
        Self {
            time: Time::ZERO,
            event_queue: BinaryHeap::new(),
            event_id_counter: 0,
            network,
            sends: Vec::new(),
            deliveries: Vec::new(),
            link_events: Vec::new(),
            rx_observers: HashMap::new(),
        }
    }

    pub fn now(&self) -> Time {
        self.time
    }

    pub fn remaining_events(&self) -> usize {
        self.event_queue.len()
    }

    pub fn peek_next_event_time(&self) -> Option<Time> {
        self.event_queue.peek().map(|e| e.time)
    }

    fn push_event(&mut self, time: Time, kind: EventKind) {
        self.event_queue.push(Event {
            time,
            kind,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    /// Schedules an upper-layer send at an absolute virtual time.
    pub fn schedule_send(&mut self, time: Time, device: DeviceId, packet: Packet, dest: Mac48) {
        self.push_event(time, EventKind::AppSend {
            device,
            packet,
            dest,
        });
    }

    /// Attaches a receive-trace observer to a device.
    pub fn on_receive(&mut self, device: DeviceId, observer: RxObserver) {
        self.rx_observers.entry(device).or_default().push(observer);
    }

    /// Synchronous upper-layer send. Returns false when the frame was dropped
    /// at a full queue or the channel had no peer to carry it.
    pub fn send_to(&mut self, device: DeviceId, packet: Packet, dest: Mac48) -> bool {
        let uid = packet.uid();
        let size = packet.size();
        let outcome = self.network.device_mut(device).send_to(packet, dest);
        let accepted = match outcome {
            SendOutcome::Transmit {
                packet,
                complete_after,
            } => {
                self.push_event(self.time + complete_after, EventKind::TransmitComplete {
                    device,
                });
                let carried = self.channel_transmit_start(device, packet);
                self.link_event(format!(
                    "[{}] TX start uid={} size={}B",
                    self.network.device_label(device),
                    uid,
                    size
                ));
                carried
            }
            SendOutcome::Queued => {
                debug!(
                    "[{}] queued uid={} depth={}",
                    self.network.device_label(device),
                    uid,
                    self.network.device(device).queue_len()
                );
                true
            }
            SendOutcome::Dropped => {
                self.link_event(format!(
                    "[{}] DROP (queue full) uid={}",
                    self.network.device_label(device),
                    uid
                ));
                false
            }
        };
        self.sends.push(SendRecord {
            time_ns: self.time.as_nanos(),
            device,
            uid,
            accepted,
        });
        accepted
    }

    /// Hands a frame to the channel; delivery to the peer is scheduled one
    /// propagation delay from now. True iff a peer is attached.
    fn channel_transmit_start(&mut self, sender: DeviceId, packet: Packet) -> bool {
        let channel_id = self
            .network
            .device(sender)
            .channel()
            .unwrap_or_else(|| panic!("transmit on detached {:?}", sender));
        let channel = self.network.channel(channel_id);
        match channel.peer_of(sender) {
            Some(peer) => {
                let arrival = self.time + channel.delay();
                self.push_event(arrival, EventKind::Deliver { to: peer, packet });
                true
            }
            None => {
                warn!(
                    "[{}] frame lost: channel has no peer attached",
                    self.network.device_label(sender)
                );
                false
            }
        }
    }

    fn transmit_complete(&mut self, device: DeviceId) {
        if let Some((packet, complete_after)) = self.network.device_mut(device).transmit_complete()
        {
            let uid = packet.uid();
            let size = packet.size();
            self.push_event(self.time + complete_after, EventKind::TransmitComplete {
                device,
            });
            self.channel_transmit_start(device, packet);
            self.link_event(format!(
                "[{}] TX start uid={} size={}B (from queue)",
                self.network.device_label(device),
                uid,
                size
            ));
        }
    }

    fn receive(&mut self, to: DeviceId, packet: Packet) {
        if let Some(observers) = self.rx_observers.get_mut(&to) {
            for observer in observers {
                observer(self.time, &packet);
            }
        }
        info!(
            "[{}] delivered uid={} ({}B) at {}",
            self.network.device_label(to),
            packet.uid(),
            packet.size(),
            self.time
        );
        self.link_events.push(LinkEventSummary {
            time_ns: self.time.as_nanos(),
            description: format!(
                "[{}] RX uid={} size={}B",
                self.network.device_label(to),
                packet.uid(),
                packet.size()
            ),
        });
        self.deliveries.push(DeliveryRecord {
            time_ns: self.time.as_nanos(),
            device: to,
            uid: packet.uid(),
            size_bytes: packet.size(),
        });
    }

    /// Process the next event. Returns false once the queue is empty.
    pub fn step(&mut self) -> bool {
        let event = match self.event_queue.pop() {
            Some(e) => e,
            None => return false,
        };

        self.time = event.time;
        debug!("processing event at {}: {:?}", self.time, event.kind);

        match event.kind {
            EventKind::AppSend {
                device,
                packet,
                dest,
            } => {
                self.send_to(device, packet, dest);
            }
            EventKind::TransmitComplete { device } => self.transmit_complete(device),
            EventKind::Deliver { to, packet } => self.receive(to, packet),
        }
        true
    }

    pub fn run_until_complete(&mut self) {
        while self.step() {}
    }

    /// Deliveries that reached any device on `node`, in arrival order.
    pub fn deliveries_to(&self, node: NodeId) -> Vec<&DeliveryRecord> {
        self.deliveries
            .iter()
            .filter(|d| self.network.device(d.device).node() == node)
            .collect()
    }

    /// Upper-layer sends issued from any device on `node`.
    pub fn sends_from(&self, node: NodeId) -> Vec<&SendRecord> {
        self.sends
            .iter()
            .filter(|s| self.network.device(s.device).node() == node)
            .collect()
    }

    fn link_event(&mut self, description: String) {
        self.link_events.push(LinkEventSummary {
            time_ns: self.time.as_nanos(),
            description,
        });
    }

    /// Produce a serializable snapshot of the finished simulation. Routing
    /// tables live a layer above the link model, so their rendered form is
    /// passed in.
    pub fn export_report(&self, scenario: Option<String>, routes: Vec<String>) -> SimulationReport {
        let queue_totals = self
            .network
            .devices()
            .filter_map(|dev| {
                let stats = dev.queue_stats()?;
                Some(QueueDropSummary {
                    device: dev.id(),
                    enqueued: stats.enqueued,
                    dropped: stats.dropped,
                })
            })
            .collect();
        SimulationReport {
            scenario,
            duration_ns: self.time.as_nanos(),
            sends: self.sends.clone(),
            deliveries: self.deliveries.clone(),
            link_events: self.link_events.clone(),
            queue_totals,
            routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2psim_abstract::{DataRate, LinkConfig};

    fn two_node_link(config: &LinkConfig) -> (Simulator, DeviceId, DeviceId, NodeId, NodeId) {
        let mut net = Network::new();
        let a = net.add_node("a");
        let b = net.add_node("b");
        let (da, db) = net.connect(a, b, config);
        (Simulator::new(net), da, db, a, b)
    }

    fn mbps10() -> LinkConfig {
        LinkConfig {
            rate_bps: 10_000_000,
            delay_ns: 2_000_000,
            ifg_ns: 0,
            queue: Some(100),
        }
    }

    #[test]
    fn single_link_delivery_time() {
        // 1250 B at 10 Mb/s is 1 ms of serialization plus 2 ms propagation.
        let (mut sim, da, _db, _a, b) = two_node_link(&mbps10());
        sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        sim.run_until_complete();

        let delivered = sim.deliveries_to(b);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].time_ns, Time::from_millis(3).as_nanos());
    }

    #[test]
    fn back_to_back_sends_serialize() {
        let (mut sim, da, _db, _a, b) = two_node_link(&mbps10());
        sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        sim.run_until_complete();

        let delivered = sim.deliveries_to(b);
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].time_ns, Time::from_millis(3).as_nanos());
        // Second frame waits 1 ms for the wire: 1 + 1 + 2.
        assert_eq!(delivered[1].time_ns, Time::from_millis(4).as_nanos());
    }

    #[test]
    fn interframe_gap_delays_the_second_frame() {
        let mut config = mbps10();
        config.ifg_ns = 9_600; // 96 bit-times at 10 Mb/s
        let (mut sim, da, _db, _a, b) = two_node_link(&config);
        sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        sim.run_until_complete();

        let delivered = sim.deliveries_to(b);
        assert_eq!(delivered.len(), 2);
        // The gap does not delay the first frame's bits.
        assert_eq!(delivered[0].time_ns, Time::from_millis(3).as_nanos());
        // 1 ms tx + 9.6 us gap + 1 ms tx + 2 ms propagation.
        assert_eq!(delivered[1].time_ns, Time::from_nanos(4_009_600).as_nanos());
    }

    #[test]
    fn queue_overflow_drops_third_send() {
        let mut config = mbps10();
        config.queue = Some(1);
        let (mut sim, da, _db, a, b) = two_node_link(&config);
        for _ in 0..3 {
            sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        }
        sim.run_until_complete();

        let sends = sim.sends_from(a);
        assert_eq!(
            sends.iter().map(|s| s.accepted).collect::<Vec<_>>(),
            vec![true, true, false]
        );
        assert_eq!(sim.deliveries_to(b).len(), 2);
        assert_eq!(sim.network.device(da).queue_stats().unwrap().dropped, 1);
    }

    #[test]
    fn fifo_order_preserved_end_to_end() {
        let (mut sim, da, _db, _a, b) = two_node_link(&mbps10());
        let first = Packet::of_size(1250);
        let second = Packet::of_size(125);
        let uids = [first.uid(), second.uid()];
        sim.schedule_send(Time::ZERO, da, first, Mac48::BROADCAST);
        sim.schedule_send(Time::ZERO, da, second, Mac48::BROADCAST);
        sim.run_until_complete();

        // The short frame is sent second and must still arrive second.
        let delivered = sim.deliveries_to(b);
        assert_eq!(delivered[0].uid, uids[0]);
        assert_eq!(delivered[1].uid, uids[1]);
    }

    #[test]
    fn both_directions_are_independent() {
        let (mut sim, da, db, a, b) = two_node_link(&mbps10());
        sim.schedule_send(Time::ZERO, da, Packet::of_size(1250), Mac48::BROADCAST);
        sim.schedule_send(Time::ZERO, db, Packet::of_size(1250), Mac48::BROADCAST);
        sim.run_until_complete();

        assert_eq!(sim.deliveries_to(b).len(), 1);
        assert_eq!(sim.deliveries_to(a).len(), 1);
        // No contention: both arrive at 3 ms.
        assert_eq!(sim.deliveries_to(a)[0].time_ns, 3_000_000);
        assert_eq!(sim.deliveries_to(b)[0].time_ns, 3_000_000);
    }

    #[test]
    fn same_time_events_run_in_insertion_order() {
        let (mut sim, da, _db, a, _b) = two_node_link(&mbps10());
        let first = Packet::of_size(100);
        let second = Packet::of_size(100);
        let uids = [first.uid(), second.uid()];
        sim.schedule_send(Time::from_millis(5), da, first, Mac48::BROADCAST);
        sim.schedule_send(Time::from_millis(5), da, second, Mac48::BROADCAST);
        sim.run_until_complete();

        let sends = sim.sends_from(a);
        assert_eq!(sends[0].uid, uids[0]);
        assert_eq!(sends[1].uid, uids[1]);
    }

    #[test]
    fn rx_observer_sees_each_delivery_once() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let (mut sim, da, db, _a, _b) = two_node_link(&mbps10());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        sim.on_receive(
            db,
            Box::new(move |time, packet| {
                sink.borrow_mut().push((time, packet.uid()));
            }),
        );

        let packet = Packet::of_size(1250);
        let uid = packet.uid();
        sim.schedule_send(Time::ZERO, da, packet, Mac48::BROADCAST);
        sim.run_until_complete();

        assert_eq!(seen.borrow().as_slice(), &[(Time::from_millis(3), uid)]);
    }

    #[test]
    fn send_into_half_attached_link_is_not_carried() {
        let mut net = Network::new();
        let a = net.add_node("a");
        let ch = net.add_channel(DataRate::from_mbps(10), Time::from_millis(2));
        let da = net.add_device(a);
        net.attach(da, ch);
        net.add_queue(da, Some(10));

        let mut sim = Simulator::new(net);
        // Link is up (single-side attach semantics) but there is no peer.
        let accepted = sim.send_to(da, Packet::of_size(100), Mac48::BROADCAST);
        assert!(!accepted);
        sim.run_until_complete();
        assert!(sim.deliveries.is_empty());
    }
}
