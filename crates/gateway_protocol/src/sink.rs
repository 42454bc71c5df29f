//! Packet sinks: where translated packets go.
//!
//! Sending is fire-and-forget: the engine never waits on the target client.
//! The only failure a sink reports is that the connection stopped accepting
//! packets altogether.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::ProtocolError;
use crate::packets::TargetPacket;

/// Accepts outbound packets for one target connection, preserving order.
pub trait PacketSink: Send + Sync {
    /// Queue a packet for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SinkClosed`] if the connection is no longer
    /// writable.
    fn send(&self, packet: TargetPacket) -> Result<(), ProtocolError>;
}

/// A sink backed by an unbounded tokio channel. The receiving half is drained
/// by whatever owns the target connection.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TargetPacket>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TargetPacket>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl PacketSink for ChannelSink {
    fn send(&self, packet: TargetPacket) -> Result<(), ProtocolError> {
        trace!(packet = packet.name(), "queueing packet");
        self.tx.send(packet).map_err(|_| ProtocolError::SinkClosed)
    }
}

/// A sink that keeps every packet in memory. Can be closed to simulate a
/// target connection that stopped accepting writes.
#[derive(Debug, Default)]
pub struct RecordingSink {
    packets: Mutex<Vec<TargetPacket>>,
    closed: AtomicBool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything sent so far.
    #[must_use]
    pub fn packets(&self) -> Vec<TargetPacket> {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Remove and return everything sent so far.
    pub fn take(&self) -> Vec<TargetPacket> {
        std::mem::take(&mut *self.packets.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Reject all further sends.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Accept sends again.
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }
}

impl PacketSink for RecordingSink {
    fn send(&self, packet: TargetPacket) -> Result<(), ProtocolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProtocolError::SinkClosed);
        }
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(packet);
        Ok(())
    }
}
