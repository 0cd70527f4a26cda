//! Duet Effects: the frame effect pipeline
//!
//! Applies an ordered stack of stateless transforms to a composed frame:
//! - **Area transforms:** blur, grayscale, sepia, tint, brightness, invert
//! - **Anchored decorations:** ears, horns, glasses, crown, sparkles, drawn
//!   relative to the tick's facial anchor when one is available
//! - **Effect stack:** the session's ordered active set, with premium gating
//!   at activation time
//!
//! This crate is pure computation with no I/O or platform dependencies.
//! Every effect is a function of (frame, its own settings, anchor).

pub mod area;
pub mod catalog;
pub mod decoration;
pub mod pipeline;
pub mod raster;
pub mod stack;

pub use catalog::{CatalogEntry, EffectCatalog, Entitlements};
pub use pipeline::{EffectPipeline, PipelineReport};
pub use stack::{EffectStack, SharedEffects};
