//! Bounded Packet Buffer
//!
//! Holds received packets between polls. The receive loop is the only producer;
//! when the buffer is full the incoming packet is dropped and the producer moves
//! on. Built on a bounded tokio channel so pushes never wait on a drainer.

use crate::gateway::packet::ReceivedPacket;
use log::warn;
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{channel, Receiver, Sender};

/// Bounded FIFO of received packets with drop-newest overflow
pub struct PacketBuffer {
    tx: Sender<ReceivedPacket>,
    rx: Mutex<Receiver<ReceivedPacket>>,
    capacity: usize,
}

impl PacketBuffer {
    /// Create a buffer holding at most `capacity` packets.
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("Packet buffer capacity 0 requested, using 1");
        }
        let capacity = capacity.max(1);
        let (tx, rx) = channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Queue a packet. Returns `false` if it was dropped because the buffer is full.
    pub fn push(&self, packet: ReceivedPacket) -> bool {
        match self.tx.try_send(packet) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Packet buffer full ({} packets), dropping new packet", self.capacity);
                false
            }
            // The receiver lives as long as self
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Remove and return everything queued, oldest first.
    pub fn drain_all(&self) -> Vec<ReceivedPacket> {
        let mut rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        let mut packets = Vec::with_capacity(self.len());
        while let Ok(packet) = rx.try_recv() {
            packets.push(packet);
        }
        packets
    }

    /// Number of queued packets (may be stale under concurrent pushes)
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn packet(n: usize) -> ReceivedPacket {
        ReceivedPacket::new(format!("packet {n}"), Some(-60.0), Some(7.0), n as f64)
    }

    #[test]
    fn test_overflow_drops_newest() {
        let buffer = PacketBuffer::new(100);
        let accepted = (0..150).filter(|&n| buffer.push(packet(n))).count();

        assert_eq!(accepted, 100);
        assert_eq!(buffer.len(), 100);

        let drained = buffer.drain_all();
        assert_eq!(drained.len(), 100);
        for (n, p) in drained.iter().enumerate() {
            assert_eq!(p.data(), format!("packet {n}"));
        }
    }

    #[test]
    fn test_drain_is_exhaustive() {
        let buffer = PacketBuffer::new(4);
        buffer.push(packet(1));
        buffer.push(packet(2));

        assert_eq!(buffer.drain_all().len(), 2);
        assert!(buffer.drain_all().is_empty());
        assert!(buffer.is_empty());

        // Space is reclaimed after a drain
        assert!(buffer.push(packet(3)));
        assert_eq!(buffer.capacity(), 4);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let buffer = PacketBuffer::new(0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.push(packet(1)));
        assert!(!buffer.push(packet(2)));
        assert_eq!(buffer.drain_all().len(), 1);
    }

    #[test]
    fn test_concurrent_drainers_never_duplicate() {
        let buffer = Arc::new(PacketBuffer::new(1_000));
        for n in 0..1_000 {
            buffer.push(packet(n));
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let buffer = buffer.clone();
                std::thread::spawn(move || buffer.drain_all())
            })
            .collect();

        let mut seen: Vec<f64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|p| p.timestamp())
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());

        assert_eq!(seen.len(), 1_000);
        seen.dedup();
        assert_eq!(seen.len(), 1_000);
    }
}
