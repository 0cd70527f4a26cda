//! The mix graph: enabled channels → gain stages → one summed track.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use duet_common::error::{DuetError, DuetResult};
use duet_media_model::source::SourceId;

use crate::channel::{clamp_gain, AudioChannel, GainHandle, GainStage};

/// One block of the mixed destination track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedTrack {
    pub sample_rate: u32,
    /// Mono f32 samples. Not clipped: values may exceed `[-1, 1]` when gains
    /// sum above one.
    pub samples: Vec<f32>,
}

impl MixedTrack {
    pub fn silent(sample_rate: u32, frames: usize) -> Self {
        Self {
            sample_rate,
            samples: vec![0.0; frames],
        }
    }

    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|s| *s == 0.0)
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Gain-weighted sum of the enabled channels.
#[derive(Debug, Clone)]
pub struct MixGraph {
    sample_rate: u32,
    channels: Vec<AudioChannel>,
    stages: Vec<GainStage>,
}

impl MixGraph {
    /// Wire one gain stage per enabled channel.
    pub fn build(channels: &[AudioChannel], sample_rate: u32) -> Self {
        let mut graph = Self {
            sample_rate,
            channels: Vec::new(),
            stages: Vec::new(),
        };
        graph.rebuild(channels);
        graph
    }

    /// Replace the channel set.
    ///
    /// Channels that stay enabled keep their existing gain handle and its
    /// live value, so controllers holding the handle are unaffected.
    pub fn rebuild(&mut self, channels: &[AudioChannel]) {
        let mut previous: HashMap<SourceId, GainHandle> = self
            .stages
            .drain(..)
            .map(|stage| (stage.source, stage.gain))
            .collect();

        self.stages = channels
            .iter()
            .filter(|c| c.enabled)
            .map(|c| match previous.remove(&c.source) {
                Some(gain) => GainStage {
                    source: c.source.clone(),
                    gain,
                },
                None => GainStage::new(c.source.clone(), c.gain),
            })
            .collect();
        self.channels = channels.to_vec();

        tracing::debug!(
            channels = self.channels.len(),
            stages = self.stages.len(),
            "Mix graph built"
        );
    }

    /// Enable exactly `source`, muting every other channel.
    pub fn audio_mix_only(&mut self, source: &SourceId) -> DuetResult<()> {
        if !self.channels.iter().any(|c| &c.source == source) {
            return Err(DuetError::invalid_state(format!(
                "no audio channel for source '{source}'"
            )));
        }
        let channels: Vec<AudioChannel> = self
            .channels
            .iter()
            .map(|c| AudioChannel {
                enabled: &c.source == source,
                ..c.clone()
            })
            .collect();
        self.rebuild(&channels);
        tracing::info!(source = %source, "Audio-mix-only mode");
        Ok(())
    }

    /// Set a channel's gain live. Returns whether an enabled channel matched.
    pub fn set_gain(&self, source: &SourceId, gain: f32) -> bool {
        match self.gain_handle(source) {
            Some(handle) => {
                handle.set(clamp_gain(gain));
                true
            }
            None => false,
        }
    }

    pub fn gain(&self, source: &SourceId) -> Option<f32> {
        self.gain_handle(source).map(GainHandle::get)
    }

    /// Handle for adjusting a channel's gain from another thread.
    pub fn gain_handle(&self, source: &SourceId) -> Option<&GainHandle> {
        self.stages
            .iter()
            .find(|s| &s.source == source)
            .map(|s| &s.gain)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> &[AudioChannel] {
        &self.channels
    }

    pub fn stages(&self) -> &[GainStage] {
        &self.stages
    }

    /// Mix one block of `frames` samples.
    ///
    /// Inputs are keyed by source id. Missing inputs and short blocks count
    /// as silence; longer blocks are truncated to `frames`.
    pub fn mix(&self, inputs: &HashMap<SourceId, Vec<f32>>, frames: usize) -> MixedTrack {
        let mut track = MixedTrack::silent(self.sample_rate, frames);
        for stage in &self.stages {
            let gain = stage.gain.get();
            if gain == 0.0 {
                continue;
            }
            let Some(block) = inputs.get(&stage.source) else {
                continue;
            };
            for (out, sample) in track.samples.iter_mut().zip(block) {
                *out += gain * sample;
            }
        }
        track
    }
}
