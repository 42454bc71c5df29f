//! # gateway_protocol
//!
//! The two protocol surfaces the translation engine talks to, as typed values.
//!
//! This crate provides:
//!
//! - [`events`]: entity events delivered by the source-protocol feed.
//! - [`packets`]: packets the engine emits towards the target client.
//! - [`sink`]: the fire-and-forget [`PacketSink`] seam and its implementations.
//! - [`codec`]: MessagePack helpers for capturing outbound packets.
//! - [`error`]: protocol-layer error types.

pub mod codec;
pub mod error;
pub mod events;
pub mod packets;
pub mod sink;

pub use codec::{decode, encode};
pub use error::ProtocolError;
pub use events::{GameProfile, SourceEvent};
pub use packets::{
    Attribute, EntityLink, LinkType, MoveMode, RosterEntry, TargetPacket, DEFAULT_APPEARANCE,
};
pub use sink::{ChannelSink, PacketSink, RecordingSink};
