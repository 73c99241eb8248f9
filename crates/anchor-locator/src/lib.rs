//! Anchor locator - portable element identity for page annotations
//!
//! This crate implements:
//! - Selector synthesis: a seven-strategy cascade verified for uniqueness,
//!   with a marker attribute as the only side-effecting last resort
//! - Element resolution: direct selector, parent chain, text, class and
//!   position stages, refusing implausible matches
//! - Selector promotion when a stored selector breaks
//! - Position-delta tracking for elements moved in design mode
//! - A layered locator policy (defaults, YAML, environment)

pub mod capture;
pub mod errors;
pub mod policy;
pub mod resolver;
pub mod selector_forms;
pub mod stability;
pub mod stages;
pub mod strategies;
pub mod synthesizer;
pub mod tracker;
pub mod types;
pub mod verify;

pub use capture::*;
pub use errors::*;
pub use policy::*;
pub use resolver::*;
pub use selector_forms::*;
pub use stability::*;
pub use stages::*;
pub use strategies::*;
pub use synthesizer::*;
pub use tracker::*;
pub use types::*;
pub use verify::*;
