use crate::channel::PointToPointChannel;
use crate::device::PointToPointNetDevice;
use crate::node::Node;
use crate::queue::DropTailQueue;
use p2psim_abstract::{DataRate, LinkConfig, Mac48, Time};
use serde::Serialize;
use std::fmt;

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

/// Index into the device arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceId(pub usize);

/// Index into the channel arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ChannelId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

/// The static topology: nodes own devices, channels are shared by at most two
/// devices, and everything is referenced by arena index. No reference cycles,
/// no shared ownership; pending events name devices by id and stay valid for
/// the lifetime of the arena.
#[derive(Debug, Default)]
pub struct Network {
    nodes: Vec<Node>,
    devices: Vec<PointToPointNetDevice>,
    channels: Vec<PointToPointChannel>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(name.into()));
        id
    }

    /// Adds a device to `node` with an arena-assigned MAC address.
    pub fn add_device(&mut self, node: NodeId) -> DeviceId {
        let id = DeviceId(self.devices.len());
        let serial = id.0 as u64 + 1;
        let mac = Mac48([
            0,
            0,
            (serial >> 24) as u8,
            (serial >> 16) as u8,
            (serial >> 8) as u8,
            serial as u8,
        ]);
        self.devices.push(PointToPointNetDevice::new(id, node, mac));
        self.nodes[node.0].devices.push(id);
        id
    }

    pub fn add_channel(&mut self, rate: DataRate, delay: Time) -> ChannelId {
        let id = ChannelId(self.channels.len());
        self.channels.push(PointToPointChannel::new(id, rate, delay));
        id
    }

    /// Attaches `device` to `channel`, copying the channel's rate into the
    /// device and bringing its link up. False once the channel already has
    /// two endpoints.
    pub fn attach(&mut self, device: DeviceId, channel: ChannelId) -> bool {
        if !self.channels[channel.0].attach(device) {
            return false;
        }
        let rate = self.channels[channel.0].data_rate();
        self.devices[device.0].attach(channel, rate);
        true
    }

    pub fn add_queue(&mut self, device: DeviceId, capacity: Option<usize>) {
        self.devices[device.0].add_queue(DropTailQueue::new(capacity));
    }

    /// Builds a complete point-to-point link between two nodes: one channel,
    /// a device on each node, both attachments, queues, and the interframe
    /// gap from `config`. Returns the (a-side, b-side) devices.
    pub fn connect(&mut self, a: NodeId, b: NodeId, config: &LinkConfig) -> (DeviceId, DeviceId) {
        let channel = self.add_channel(
            DataRate::from_bps(config.rate_bps),
            Time::from_nanos(config.delay_ns),
        );
        let dev_a = self.add_device(a);
        let dev_b = self.add_device(b);
        for dev in [dev_a, dev_b] {
            self.attach(dev, channel);
            self.add_queue(dev, config.queue);
            self.devices[dev.0].set_interframe_gap(Time::from_nanos(config.ifg_ns));
        }
        (dev_a, dev_b)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn device(&self, id: DeviceId) -> &PointToPointNetDevice {
        &self.devices[id.0]
    }

    pub fn device_mut(&mut self, id: DeviceId) -> &mut PointToPointNetDevice {
        &mut self.devices[id.0]
    }

    pub fn channel(&self, id: ChannelId) -> &PointToPointChannel {
        &self.channels[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn devices(&self) -> impl Iterator<Item = &PointToPointNetDevice> {
        self.devices.iter()
    }

    /// The device on the far end of `device`'s channel, when fully paired.
    pub fn peer_of(&self, device: DeviceId) -> Option<DeviceId> {
        let channel = self.devices[device.0].channel()?;
        self.channels[channel.0].peer_of(device)
    }

    /// `"name/devN"`, for log lines and the event timeline.
    pub fn device_label(&self, device: DeviceId) -> String {
        let dev = &self.devices[device.0];
        format!("{}/{}", self.nodes[dev.node().0].name, device)
    }
}
