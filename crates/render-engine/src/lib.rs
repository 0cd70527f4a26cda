//! Duet Render Engine
//!
//! Real-time composition of one or two source streams into a single output
//! surface, followed by the effect pipeline.
//!
//! # Tick Pipeline
//!
//! ```text
//! reference frame ──┐
//!                   ├── Layout (side-by-side | stacked | pip | blend | single)
//! camera frame ─────┘         │
//!                             ├── Effect pipeline (area → decorations)
//! anchor (optional) ──────────┘         │
//!                                       ▼
//!                              retained output frame ──► encoder
//! ```

pub mod compositor;
pub mod renderer;

pub use compositor::{compose, plan_layout, Blend, Placement};
pub use renderer::*;
