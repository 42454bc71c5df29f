//! Metadata fields and values for both protocols.
//!
//! The source protocol addresses metadata by a numeric index whose meaning
//! depends on the entity layout; [`SourceField`] names the indices the gateway
//! knows about. [`TargetField`] keys the per-entity [`EntityMetadata`] map and
//! its declaration order is the order fields are applied in.

use std::collections::BTreeMap;

use gateway_math::Vec3;
use serde::{Deserialize, Serialize};

/// A metadata field identifier in the source protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SourceField {
    Flags,
    Air,
    CustomName,
    CustomNameVisible,
    Silent,
    NoGravity,
    /// Player extra health.
    Absorption,
    /// Player left shoulder compound tag.
    LeftShoulder,
    /// Player right shoulder compound tag.
    RightShoulder,
    /// Any index without a name.
    Other(u8),
}

impl SourceField {
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index {
            0 => Self::Flags,
            1 => Self::Air,
            2 => Self::CustomName,
            3 => Self::CustomNameVisible,
            4 => Self::Silent,
            5 => Self::NoGravity,
            14 => Self::Absorption,
            18 => Self::LeftShoulder,
            19 => Self::RightShoulder,
            other => Self::Other(other),
        }
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Flags => 0,
            Self::Air => 1,
            Self::CustomName => 2,
            Self::CustomNameVisible => 3,
            Self::Silent => 4,
            Self::NoGravity => 5,
            Self::Absorption => 14,
            Self::LeftShoulder => 18,
            Self::RightShoulder => 19,
            Self::Other(index) => index,
        }
    }

    /// The target field this source field copies into unchanged, if the
    /// target protocol has one.
    #[must_use]
    pub const fn passthrough_target(self) -> Option<TargetField> {
        match self {
            Self::Flags => Some(TargetField::Flags),
            Self::Air => Some(TargetField::Air),
            Self::CustomName => Some(TargetField::Nametag),
            Self::CustomNameVisible => Some(TargetField::AlwaysShowNametag),
            _ => None,
        }
    }
}

impl From<u8> for SourceField {
    fn from(index: u8) -> Self {
        Self::from_index(index)
    }
}

impl From<SourceField> for u8 {
    fn from(field: SourceField) -> Self {
        field.index()
    }
}

/// A metadata field key in the target protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TargetField {
    Flags,
    Air,
    Nametag,
    AlwaysShowNametag,
    Variant,
    RiderSeatPosition,
    RiderRotationLocked,
}

/// A typed metadata value. Used on both sides of the translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Byte(i8),
    Int(i32),
    Float(f32),
    Bool(bool),
    Text(Option<String>),
    Position(Vec3),
    Compound(Option<CompoundTag>),
}

impl MetadataValue {
    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f32),
            Self::Byte(value) => Some(f32::from(*value)),
            _ => None,
        }
    }

    /// Display text, with an absent optional text reading as `None`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(Some(text)) => Some(text),
            _ => None,
        }
    }

    /// The compound tag, treating absent and empty tags alike.
    #[must_use]
    pub fn as_compound(&self) -> Option<&CompoundTag> {
        match self {
            Self::Compound(Some(tag)) if !tag.is_empty() => Some(tag),
            _ => None,
        }
    }
}

/// A single value inside a [`CompoundTag`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Byte(i8),
    Int(i32),
    Long(i64),
    Float(f32),
    String(String),
}

/// A named-tag compound, the opaque blob the source protocol uses for things
/// like shoulder-riding entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompoundTag(pub BTreeMap<String, TagValue>);

impl CompoundTag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: TagValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    /// Reads an integral value, accepting any integer width.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.0.get(key)? {
            TagValue::Byte(value) => Some(i32::from(*value)),
            TagValue::Int(value) => Some(*value),
            TagValue::Long(value) => i32::try_from(*value).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The target-protocol metadata an entity currently carries, iterated in
/// [`TargetField`] order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityMetadata {
    fields: BTreeMap<TargetField, MetadataValue>,
}

impl EntityMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a field, returning the previous value.
    pub fn set(&mut self, field: TargetField, value: MetadataValue) -> Option<MetadataValue> {
        self.fields.insert(field, value)
    }

    #[must_use]
    pub fn get(&self, field: TargetField) -> Option<&MetadataValue> {
        self.fields.get(&field)
    }

    pub fn remove(&mut self, field: TargetField) -> Option<MetadataValue> {
        self.fields.remove(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TargetField, &MetadataValue)> {
        self.fields.iter().map(|(field, value)| (*field, value))
    }

    /// Owned copy of every field, in application order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(TargetField, MetadataValue)> {
        self.fields
            .iter()
            .map(|(field, value)| (*field, value.clone()))
            .collect()
    }

    /// Owned copy of the named fields that are present, in application order.
    #[must_use]
    pub fn subset(&self, fields: &[TargetField]) -> Vec<(TargetField, MetadataValue)> {
        self.fields
            .iter()
            .filter(|(field, _)| fields.contains(field))
            .map(|(field, value)| (*field, value.clone()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
