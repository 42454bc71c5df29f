//! Protocol-layer error types.

/// Errors that can occur while moving protocol values around.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Failed to encode a packet to MessagePack.
    #[error("failed to encode packet: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a packet from MessagePack.
    #[error("failed to decode packet: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A source feed record could not be parsed.
    #[error("malformed source event: {0}")]
    Feed(#[from] serde_json::Error),

    /// The target connection no longer accepts packets.
    #[error("target sink is closed")]
    SinkClosed,
}
