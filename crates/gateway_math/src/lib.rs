//! # gateway_math
//!
//! Spatial types for the entity translation gateway. Re-exports [`glam`] for
//! linear algebra and defines the rotation conventions of both protocols.

pub mod transform;

// Re-export glam types for convenience.
pub use glam::Vec3;

pub use transform::{Rotation, Transform};
