//! Mix channels and their live gain controls.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use duet_media_model::source::SourceId;

/// Configuration of one input to the mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChannel {
    /// Source whose audio feeds this channel.
    pub source: SourceId,

    /// Linear gain in `[0.0, 1.0]`.
    pub gain: f32,

    /// Disabled channels are left out of the graph entirely.
    pub enabled: bool,
}

impl AudioChannel {
    pub fn new(source: impl Into<SourceId>, gain: f32) -> Self {
        Self {
            source: source.into(),
            gain: clamp_gain(gain),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Clamp a gain into `[0.0, 1.0]`; NaN becomes silence.
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}

/// Shared handle to one gain stage's value.
///
/// The value is an `f32` stored as bits in an atomic so a control thread can
/// change it while the mix runs, without locking.
#[derive(Debug, Clone)]
pub struct GainHandle(Arc<AtomicU32>);

impl GainHandle {
    pub fn new(gain: f32) -> Self {
        Self(Arc::new(AtomicU32::new(clamp_gain(gain).to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Set the gain, clamped to `[0.0, 1.0]`.
    pub fn set(&self, gain: f32) {
        self.0.store(clamp_gain(gain).to_bits(), Ordering::Relaxed);
    }

    /// Whether two handles control the same stage.
    pub fn same_stage(&self, other: &GainHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One per-channel gain stage in the graph.
#[derive(Debug, Clone)]
pub struct GainStage {
    pub source: SourceId,
    pub gain: GainHandle,
}

impl GainStage {
    pub fn new(source: SourceId, gain: f32) -> Self {
        Self {
            source,
            gain: GainHandle::new(gain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gain_is_clamped() {
        let handle = GainHandle::new(1.7);
        assert_eq!(handle.get(), 1.0);
        handle.set(-0.3);
        assert_eq!(handle.get(), 0.0);
        handle.set(f32::NAN);
        assert_eq!(handle.get(), 0.0);
        assert_eq!(AudioChannel::new("mic", 2.0).gain, 1.0);
    }

    #[test]
    fn cloned_handles_share_the_stage() {
        let stage = GainStage::new(SourceId::from("mic"), 0.5);
        let remote = stage.gain.clone();
        remote.set(0.25);
        assert_eq!(stage.gain.get(), 0.25);
        assert!(remote.same_stage(&stage.gain));
        assert!(!remote.same_stage(&GainHandle::new(0.25)));
    }
}
