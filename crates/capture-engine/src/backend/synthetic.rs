//! Synthetic capture device: color-bar camera and sine-tone microphone.
//!
//! Stands in for real hardware in tests and headless runs. The outcome of a
//! stream request is configurable so permission and hardware failures can be
//! exercised, and a shared counter tracks how many streams are still open.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use duet_audio_mix::signal::sine_block_from;
use duet_common::error::{DuetError, DuetResult};
use duet_media_model::frame::{Frame, Rgba};
use duet_media_model::geometry::PixelRect;
use duet_media_model::source::{CaptureConstraints, SourceId, SourceKind, StreamInfo};

use super::{DeviceFacility, DeviceStream};
use crate::source::SourceStream;

const BARS: [Rgba; 8] = [
    Rgba::rgb(235, 235, 235),
    Rgba::rgb(235, 235, 16),
    Rgba::rgb(16, 235, 235),
    Rgba::rgb(16, 235, 16),
    Rgba::rgb(235, 16, 235),
    Rgba::rgb(235, 16, 16),
    Rgba::rgb(16, 16, 235),
    Rgba::rgb(16, 16, 16),
];

/// Color bars, rotated by `hue`, with a white marker that moves with `index`.
pub fn test_pattern(width: u32, height: u32, index: u64, hue: u8) -> Frame {
    let mut frame = Frame::new(width, height);
    if frame.is_empty() {
        return frame;
    }
    let bar_w = (width / BARS.len() as u32).max(1);
    for i in 0..BARS.len() {
        let x = i as u32 * bar_w;
        if x >= width {
            break;
        }
        let color = BARS[(i + hue as usize) % BARS.len()];
        frame.fill_rect(PixelRect::new(x, 0, bar_w, height), color);
    }
    let marker_w = (width / 40).max(1);
    let marker_x = ((index * 4) % width as u64) as u32;
    frame.fill_rect(PixelRect::new(marker_x, 0, marker_w, height), Rgba::WHITE);
    frame
}

/// What a synthetic stream request does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticOutcome {
    /// Grant a stream.
    Grant,
    /// The user refuses the permission prompt.
    Deny,
    /// No usable device.
    Unavailable,
    /// The prompt is never answered.
    Hang,
}

/// Configurable fake camera + microphone.
#[derive(Debug, Clone)]
pub struct SyntheticDevice {
    outcome: SyntheticOutcome,
    microphone: bool,
    motion: bool,
    tone_hz: f32,
    sample_rate: u32,
    live: Arc<AtomicUsize>,
}

impl SyntheticDevice {
    pub fn new() -> Self {
        Self {
            outcome: SyntheticOutcome::Grant,
            microphone: true,
            motion: true,
            tone_hz: 440.0,
            sample_rate: 48_000,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_outcome(mut self, outcome: SyntheticOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Streams carry video only, whatever the constraints ask for.
    pub fn without_microphone(mut self) -> Self {
        self.microphone = false;
        self
    }

    /// Keep the pattern still instead of moving the marker.
    pub fn still(mut self) -> Self {
        self.motion = false;
        self
    }

    pub fn with_tone(mut self, tone_hz: f32, sample_rate: u32) -> Self {
        self.tone_hz = tone_hz;
        self.sample_rate = sample_rate;
        self
    }

    /// Streams granted and not yet released.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl Default for SyntheticDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceFacility for SyntheticDevice {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> DuetResult<Box<dyn DeviceStream>> {
        match self.outcome {
            SyntheticOutcome::Grant => {}
            SyntheticOutcome::Deny => {
                return Err(DuetError::permission_denied(
                    "camera access was refused at the prompt",
                ))
            }
            SyntheticOutcome::Unavailable => {
                return Err(DuetError::device_unavailable("no synthetic camera attached"))
            }
            SyntheticOutcome::Hang => std::future::pending::<()>().await,
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            info: StreamInfo {
                id: SourceId::from("camera"),
                kind: SourceKind::Camera,
                width: constraints.width,
                height: constraints.height,
                fps: constraints.fps.max(1),
                has_audio: self.microphone,
            },
            opened_at: Instant::now(),
            motion: self.motion,
            mirror: constraints.mirror,
            tone_hz: self.tone_hz,
            sample_rate: self.sample_rate,
            current: None,
            sample_offset: 0,
            muted: false,
            released: false,
            live: Arc::clone(&self.live),
        }))
    }
}

struct SyntheticStream {
    info: StreamInfo,
    opened_at: Instant,
    motion: bool,
    mirror: bool,
    tone_hz: f32,
    sample_rate: u32,
    current: Option<(u64, Frame)>,
    sample_offset: u64,
    muted: bool,
    released: bool,
    live: Arc<AtomicUsize>,
}

impl SourceStream for SyntheticStream {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn latest_frame(&mut self) -> Option<&Frame> {
        if self.released {
            return None;
        }
        // Frames follow the device's own clock, not the caller's pull rate.
        let index = if self.motion {
            (self.opened_at.elapsed().as_secs_f64() * self.info.fps as f64) as u64
        } else {
            0
        };
        if self.current.as_ref().map(|(i, _)| *i) != Some(index) {
            let mut frame = test_pattern(self.info.width, self.info.height, index, 0);
            if self.mirror {
                frame.mirror_horizontal();
            }
            self.current = Some((index, frame));
        }
        self.current.as_ref().map(|(_, frame)| frame)
    }

    fn read_audio(&mut self, frames: usize) -> Option<Vec<f32>> {
        if self.released || !self.info.has_audio {
            return None;
        }
        let block = sine_block_from(self.tone_hz, 1.0, self.sample_rate, self.sample_offset, frames);
        self.sample_offset += frames as u64;
        if self.muted {
            return None;
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

impl DeviceStream for SyntheticStream {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.current = None;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_has_requested_size() {
        let frame = test_pattern(64, 36, 3, 2);
        assert_eq!(frame.dimensions(), (64, 36));
        assert_eq!(test_pattern(0, 10, 0, 0).dimensions(), (0, 10));
    }

    #[tokio::test]
    async fn granted_streams_are_counted_until_released() {
        let device = SyntheticDevice::new().still();
        let mut stream = device
            .request_stream(&CaptureConstraints::default())
            .await
            .unwrap();
        assert_eq!(device.live_streams(), 1);
        assert!(stream.latest_frame().is_some());
        stream.release();
        stream.release();
        assert_eq!(device.live_streams(), 0);
        assert!(stream.latest_frame().is_none());
        drop(stream);
        assert_eq!(device.live_streams(), 0);
    }

    #[tokio::test]
    async fn refusals_hold_nothing() {
        for outcome in [SyntheticOutcome::Deny, SyntheticOutcome::Unavailable] {
            let device = SyntheticDevice::new().with_outcome(outcome);
            let result = device.request_stream(&CaptureConstraints::default()).await;
            assert!(result.is_err());
            assert_eq!(device.live_streams(), 0);
        }
    }

    #[tokio::test]
    async fn muted_microphone_keeps_its_phase() {
        let device = SyntheticDevice::new().with_tone(100.0, 1000);
        let mut stream = device
            .request_stream(&CaptureConstraints::default())
            .await
            .unwrap();
        let first = stream.read_audio(5).unwrap();
        stream.set_muted(true);
        assert!(stream.read_audio(5).is_none());
        stream.set_muted(false);
        let third = stream.read_audio(5).unwrap();
        let expected = sine_block_from(100.0, 1.0, 1000, 10, 5);
        assert_eq!(third, expected);
        assert_eq!(first.len(), 5);
    }
}
