//! Duet Capture Engine
//!
//! Acquires camera streams, drives the per-tick composition of a duet or AR
//! session, and records the composed output into a finalized artifact.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                          Studio                           │
//! │  ┌───────────────┐  ┌───────────────┐  ┌───────────────┐  │
//! │  │ CaptureLease  │  │ ReferenceClip │  │ SharedEffects │  │
//! │  └───────┬───────┘  └───────┬───────┘  └───────┬───────┘  │
//! │          │ frames/audio     │                  │          │
//! │          ▼                  ▼                  ▼          │
//! │  ┌───────────────────────────────┐  ┌─────────────────┐   │
//! │  │ CompositeRenderer + MixGraph  │  │ AnchorProvider  │   │
//! │  └───────────────┬───────────────┘  └─────────────────┘   │
//! │                  ▼ surface + mixed track                  │
//! │  ┌───────────────────────────────┐                        │
//! │  │ RecordingController (Encoder) │──▶ ArtifactManager ──▶ sinks
//! │  └───────────────────────────────┘                        │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod acquisition;
pub mod artifact;
pub mod backend;
pub mod encoder;
pub mod session;
pub mod source;
pub mod studio;

pub use acquisition::{CaptureAcquisition, CaptureLease};
pub use artifact::*;
pub use encoder::*;
pub use session::*;
pub use source::{ReferenceClip, SourceStream};
pub use studio::*;
