//! Duet Media Model
//!
//! Defines the core data contracts shared by the compositing and recording
//! pipeline:
//! - **Frames:** RGBA pixel buffers and colors
//! - **Geometry:** normalized points/rects and pixel regions
//! - **Layouts:** how one or two sources are placed on the output canvas
//! - **Effects:** effect descriptors and their resolved tagged variants
//! - **Anchors:** per-tick facial landmark data supplied by a detector
//! - **Quality / Artifacts:** output tiers and finalized recording metadata
//!
//! Normalized coordinates are in `[0.0, 1.0]` relative to the output canvas.

pub mod anchor;
pub mod artifact;
pub mod effect;
pub mod frame;
pub mod geometry;
pub mod layout;
pub mod quality;
pub mod source;

pub use anchor::*;
pub use artifact::*;
pub use effect::*;
pub use frame::*;
pub use geometry::*;
pub use layout::*;
pub use quality::*;
pub use source::*;
