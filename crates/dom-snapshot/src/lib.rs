//! DOM snapshot - the document every anchor operation runs against
//!
//! This crate provides:
//! - An arena-backed element tree with attributes, text and per-element geometry
//! - JSON snapshot (de)serialization for captured pages and test fixtures
//! - A CSS selector engine covering the selector forms anchors are built from
//! - CSS escaping and text normalization helpers shared by synthesis and resolution

pub mod document;
pub mod errors;
pub mod escape;
pub mod geometry;
pub mod selector;
pub mod snapshot;
pub mod text;

pub use document::{Document, ElementData, NodeId};
pub use errors::{DomError, SelectorError};
pub use escape::{escape_attr_value, escape_ident};
pub use geometry::{BoundingBox, Viewport};
pub use selector::Selector;
pub use snapshot::{DomSnapshot, SnapshotElement, SnapshotNode};
pub use text::{normalize_text, snippet, text_digest};
