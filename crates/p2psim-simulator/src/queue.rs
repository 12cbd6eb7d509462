use p2psim_abstract::Packet;
use serde::Serialize;
use std::collections::VecDeque;

/// Observable queue activity, for drop accounting and tests.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub dropped: u64,
}

/// Bounded drop-tail FIFO of frames awaiting transmission.
///
/// Back-pressure is expressed only through capacity: a full queue refuses the
/// frame and the caller reports the drop. There is no flow-control protocol.
#[derive(Debug, Default)]
pub struct DropTailQueue {
    frames: VecDeque<Packet>,
    capacity: Option<usize>,
    stats: QueueStats,
}

impl DropTailQueue {
    /// `capacity: None` builds an unbounded queue.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity,
            stats: QueueStats::default(),
        }
    }

    /// False means the queue was full and the frame has been dropped.
    pub fn enqueue(&mut self, packet: Packet) -> bool {
        if let Some(cap) = self.capacity
            && self.frames.len() >= cap
        {
            self.stats.dropped += 1;
            return false;
        }
        self.frames.push_back(packet);
        self.stats.enqueued += 1;
        true
    }

    pub fn dequeue(&mut self) -> Option<Packet> {
        let packet = self.frames.pop_front();
        if packet.is_some() {
            self.stats.dequeued += 1;
        }
        packet
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut q = DropTailQueue::new(Some(8));
        let first = Packet::of_size(10);
        let second = Packet::of_size(20);
        let first_uid = first.uid();
        let second_uid = second.uid();
        assert!(q.enqueue(first));
        assert!(q.enqueue(second));
        assert_eq!(q.dequeue().unwrap().uid(), first_uid);
        assert_eq!(q.dequeue().unwrap().uid(), second_uid);
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn drops_at_capacity() {
        let mut q = DropTailQueue::new(Some(1));
        assert!(q.enqueue(Packet::of_size(10)));
        assert!(!q.enqueue(Packet::of_size(10)));
        assert_eq!(q.len(), 1);
        let stats = q.stats();
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn unbounded_never_drops() {
        let mut q = DropTailQueue::new(None);
        for _ in 0..1000 {
            assert!(q.enqueue(Packet::of_size(1)));
        }
        assert_eq!(q.len(), 1000);
        assert_eq!(q.stats().dropped, 0);
    }
}
