//! Source streams consumed by the renderer and the mix graph.

use std::time::Duration;

use duet_common::clock::RecordingClock;
use duet_media_model::frame::Frame;
use duet_media_model::source::{SourceId, SourceKind, StreamInfo};

use crate::backend::synthetic::test_pattern;

/// A live or pre-recorded audio/video feed.
///
/// Pulls never block: a stream that has nothing new returns what it has,
/// and a stream with nothing at all returns `None`.
pub trait SourceStream: Send {
    fn info(&self) -> &StreamInfo;

    fn id(&self) -> &SourceId {
        &self.info().id
    }

    /// Most recent video frame, if one is available.
    fn latest_frame(&mut self) -> Option<&Frame>;

    /// Next `frames` mono samples. `None` means silence (muted, paused or
    /// no audio track).
    fn read_audio(&mut self, frames: usize) -> Option<Vec<f32>>;

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);
}

enum ClipFrames {
    Decoded(Vec<Frame>),
    Pattern { width: u32, height: u32, total: u64, hue: u8 },
}

/// A caller-owned, pre-recorded reference clip (the "other half" of a duet).
///
/// Playback position advances with host timestamps while playing, using the
/// same accounting as the recording clock so both stay on one timebase. At
/// the end of the clip the last frame is held.
pub struct ReferenceClip {
    info: StreamInfo,
    frames: ClipFrames,
    audio: Vec<f32>,
    sample_rate: u32,
    playback: RecordingClock,
    started: bool,
    muted: bool,
    loading_pulls: u32,
    current: Option<(u64, Frame)>,
}

impl ReferenceClip {
    /// Clip from decoded frames and mono audio.
    pub fn from_frames(
        id: impl Into<SourceId>,
        frames: Vec<Frame>,
        fps: u32,
        audio: Vec<f32>,
        sample_rate: u32,
    ) -> Self {
        let (width, height) = frames.first().map(Frame::dimensions).unwrap_or((0, 0));
        Self::with_frames(
            id.into(),
            ClipFrames::Decoded(frames),
            width,
            height,
            fps,
            audio,
            sample_rate,
        )
    }

    /// Generated color-bar clip of the given length with a sine soundtrack.
    pub fn synthetic(
        id: impl Into<SourceId>,
        width: u32,
        height: u32,
        fps: u32,
        length: Duration,
        sample_rate: u32,
    ) -> Self {
        let total = (length.as_secs_f64() * fps as f64).ceil() as u64;
        let samples = (length.as_secs_f64() * sample_rate as f64).ceil() as usize;
        let audio = duet_audio_mix::signal::sine_block(330.0, 0.5, sample_rate, samples);
        Self::with_frames(
            id.into(),
            ClipFrames::Pattern {
                width,
                height,
                total: total.max(1),
                hue: 160,
            },
            width,
            height,
            fps,
            audio,
            sample_rate,
        )
    }

    fn with_frames(
        id: SourceId,
        frames: ClipFrames,
        width: u32,
        height: u32,
        fps: u32,
        audio: Vec<f32>,
        sample_rate: u32,
    ) -> Self {
        Self {
            info: StreamInfo {
                id,
                kind: SourceKind::ReferenceClip,
                width,
                height,
                fps: fps.max(1),
                has_audio: !audio.is_empty(),
            },
            frames,
            audio,
            sample_rate,
            playback: RecordingClock::new(),
            started: false,
            muted: false,
            loading_pulls: 0,
            current: None,
        }
    }

    /// Report "not yet loaded" for the first `pulls` frame requests.
    pub fn with_load_delay(mut self, pulls: u32) -> Self {
        self.loading_pulls = pulls;
        self
    }

    /// Start (or resume) playback at host time `now`.
    pub fn play(&mut self, now: Duration) {
        if !self.started {
            self.playback.start(now);
            self.started = true;
            tracing::debug!(clip = %self.info.id, "Reference clip playback started");
        } else {
            self.playback.resume(now);
        }
    }

    /// Rewind to the first frame and play from host time `now`.
    pub fn restart(&mut self, now: Duration) {
        self.playback.start(now);
        self.started = true;
        tracing::debug!(clip = %self.info.id, "Reference clip restarted");
    }

    /// Pause playback at host time `now`.
    pub fn pause(&mut self, now: Duration) {
        self.playback.pause(now);
    }

    /// Move the playback position forward to host time `now`.
    pub fn advance(&mut self, now: Duration) {
        self.playback.advance(now);
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_running()
    }

    /// Current playback position.
    pub fn position(&self) -> Duration {
        self.playback.elapsed()
    }

    pub fn frame_count(&self) -> u64 {
        match &self.frames {
            ClipFrames::Decoded(frames) => frames.len() as u64,
            ClipFrames::Pattern { total, .. } => *total,
        }
    }

    pub fn length(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.info.fps as f64)
    }

    fn frame_index(&self) -> Option<u64> {
        let count = self.frame_count();
        if count == 0 {
            return None;
        }
        let index = (self.position().as_secs_f64() * self.info.fps as f64).floor() as u64;
        Some(index.min(count - 1))
    }
}

impl SourceStream for ReferenceClip {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn latest_frame(&mut self) -> Option<&Frame> {
        if self.loading_pulls > 0 {
            self.loading_pulls -= 1;
            return None;
        }
        let index = self.frame_index()?;
        match &self.frames {
            ClipFrames::Decoded(frames) => frames.get(index as usize),
            ClipFrames::Pattern {
                width,
                height,
                hue,
                ..
            } => {
                if self.current.as_ref().map(|(i, _)| *i) != Some(index) {
                    self.current = Some((index, test_pattern(*width, *height, index, *hue)));
                }
                self.current.as_ref().map(|(_, frame)| frame)
            }
        }
    }

    fn read_audio(&mut self, frames: usize) -> Option<Vec<f32>> {
        if self.muted || !self.is_playing() || self.audio.is_empty() {
            return None;
        }
        let start = (self.position().as_secs_f64() * self.sample_rate as f64).round() as usize;
        let mut block = vec![0.0; frames];
        if let Some(available) = self.audio.get(start..) {
            let n = available.len().min(frames);
            block[..n].copy_from_slice(&available[..n]);
        }
        Some(block)
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn position_only_advances_while_playing() {
        let mut clip = ReferenceClip::synthetic("clip", 16, 9, 30, Duration::from_secs(2), 8000);
        clip.advance(ms(500));
        assert_eq!(clip.position(), Duration::ZERO);

        clip.play(ms(1000));
        clip.advance(ms(1500));
        clip.pause(ms(1600));
        clip.advance(ms(3000));
        assert_eq!(clip.position(), ms(600));

        clip.play(ms(4000));
        clip.advance(ms(4100));
        assert_eq!(clip.position(), ms(700));
    }

    #[test]
    fn restart_rewinds_a_paused_clip() {
        let mut clip = ReferenceClip::synthetic("clip", 16, 9, 30, Duration::from_secs(2), 8000);
        clip.play(ms(0));
        clip.pause(ms(900));
        assert_eq!(clip.position(), ms(900));

        clip.restart(ms(5000));
        assert!(clip.is_playing());
        assert_eq!(clip.position(), Duration::ZERO);
        clip.advance(ms(5100));
        assert_eq!(clip.position(), ms(100));
    }

    #[test]
    fn load_delay_yields_no_frames_first() {
        let mut clip =
            ReferenceClip::synthetic("clip", 8, 8, 30, Duration::from_secs(1), 8000).with_load_delay(2);
        clip.play(Duration::ZERO);
        assert!(clip.latest_frame().is_none());
        assert!(clip.latest_frame().is_none());
        assert!(clip.latest_frame().is_some());
    }

    #[test]
    fn last_frame_is_held_after_the_end() {
        let frames = vec![Frame::filled(2, 2, duet_media_model::frame::Rgba::WHITE), Frame::new(2, 2)];
        let mut clip = ReferenceClip::from_frames("clip", frames, 10, Vec::new(), 8000);
        clip.play(Duration::ZERO);
        clip.advance(Duration::from_secs(5));
        assert_eq!(clip.latest_frame(), Some(&Frame::new(2, 2)));
        assert!(!clip.info().has_audio);
    }

    #[test]
    fn audio_is_silent_when_muted_or_paused() {
        let mut clip = ReferenceClip::synthetic("clip", 4, 4, 30, Duration::from_secs(1), 8000);
        assert!(clip.read_audio(80).is_none());
        clip.play(Duration::ZERO);
        assert_eq!(clip.read_audio(80).map(|b| b.len()), Some(80));
        clip.set_muted(true);
        assert!(clip.read_audio(80).is_none());
    }
}
