//! MessagePack codec helpers.
//!
//! Thin wrappers around `rmp-serde`. Framing for the wire is handled by the
//! transport; these helpers serve packet capture and replay.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    rmp_serde::to_vec_named(value).map_err(ProtocolError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, ProtocolError> {
    rmp_serde::from_slice(bytes).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use gateway_entity::TargetId;

    use super::*;
    use crate::packets::{EntityLink, LinkType, TargetPacket};

    #[test]
    fn test_packet_capture_roundtrip() {
        let packet = TargetPacket::SetEntityLink {
            link: EntityLink::new(TargetId(7), TargetId(8), LinkType::Rider),
        };
        let bytes = encode(&packet).unwrap();
        let restored: TargetPacket = decode(&bytes).unwrap();
        assert_eq!(packet, restored);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<TargetPacket, _> = decode(&[0xFF, 0xFF]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
