//! # gateway_entity
//!
//! Identity and data model shared by every part of the translation gateway.
//!
//! This crate provides:
//!
//! - [`SourceId`] / [`TargetId`]: identifiers in the two protocols' spaces.
//! - [`TargetIdAllocator`]: monotonically increasing target ID allocator.
//! - [`IdentifierRegistry`]: the bidirectional source ↔ target mapping.
//! - [`EntityKind`]: the closed set of translated entity variants.
//! - [`metadata`]: source/target metadata fields, typed values, and the
//!   ordered metadata map carried by each entity.

pub mod entity;
pub mod error;
pub mod kind;
pub mod metadata;
pub mod registry;

pub use entity::{SourceId, TargetId, TargetIdAllocator};
pub use error::RegistryError;
pub use kind::EntityKind;
pub use metadata::{CompoundTag, EntityMetadata, MetadataValue, SourceField, TagValue, TargetField};
pub use registry::IdentifierRegistry;
