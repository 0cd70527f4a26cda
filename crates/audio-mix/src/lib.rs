//! Duet Audio Mix
//!
//! Mixes the audio of every enabled source into one destination track:
//! - **Gain stages:** one per enabled channel, adjustable live from any thread
//! - **Mix graph:** linear gain-weighted sum, no compression or limiting
//! - **Block pacing:** per-tick block sizes that follow host time
//! - **Signal helpers:** test tones and level metering

pub mod channel;
pub mod graph;
pub mod pacer;
pub mod signal;

pub use channel::*;
pub use graph::*;
pub use pacer::BlockPacer;
