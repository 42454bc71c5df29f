//! Entity position and rotation.
//!
//! The source protocol orders rotation as `(yaw, pitch, head_yaw)` while the
//! target protocol expects `(pitch, yaw, head_yaw)`. [`Rotation`] stores the
//! source ordering and converts on the way out.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Orientation of an entity, in degrees.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Rotation {
    /// Horizontal facing.
    pub yaw: f32,
    /// Vertical facing.
    pub pitch: f32,
    /// Head yaw, independent of the body for living entities.
    pub head_yaw: f32,
}

impl Rotation {
    /// No rotation.
    pub const ZERO: Self = Self {
        yaw: 0.0,
        pitch: 0.0,
        head_yaw: 0.0,
    };

    #[must_use]
    pub const fn new(yaw: f32, pitch: f32, head_yaw: f32) -> Self {
        Self {
            yaw,
            pitch,
            head_yaw,
        }
    }

    /// Rotation vector in the target protocol's `(pitch, yaw, head_yaw)` order.
    #[must_use]
    pub fn to_target(self) -> Vec3 {
        Vec3::new(self.pitch, self.yaw, self.head_yaw)
    }
}

/// Position, rotation and motion of one entity.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Position as stored by the gateway (already adjusted for the kind's
    /// vertical offset).
    pub position: Vec3,
    /// Current orientation.
    pub rotation: Rotation,
    /// Motion per tick.
    pub velocity: Vec3,
}

impl Transform {
    #[must_use]
    pub fn new(position: Vec3, rotation: Rotation, velocity: Vec3) -> Self {
        Self {
            position,
            rotation,
            velocity,
        }
    }

    /// Set the position from a source-protocol coordinate, lifting it by
    /// `vertical_offset`.
    pub fn set_position(&mut self, source_position: Vec3, vertical_offset: f32) {
        self.position = source_position + Vec3::new(0.0, vertical_offset, 0.0);
    }

    /// Shift the stored position by a relative delta. The vertical offset is
    /// already part of the stored position and is not re-applied.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }
}
