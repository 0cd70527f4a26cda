//! Capture acquisition: turns a device grant into a scoped lease.

use std::sync::Arc;

use duet_common::error::{DuetError, DuetResult};
use duet_media_model::frame::Frame;
use duet_media_model::source::{CaptureConstraints, StreamInfo};

use crate::backend::{DeviceFacility, DeviceStream};
use crate::source::SourceStream;

/// Obtains camera/microphone streams from a device facility.
#[derive(Clone)]
pub struct CaptureAcquisition {
    facility: Arc<dyn DeviceFacility>,
}

impl CaptureAcquisition {
    pub fn new(facility: Arc<dyn DeviceFacility>) -> Self {
        Self { facility }
    }

    pub fn facility_name(&self) -> &str {
        self.facility.name()
    }

    /// Request a live stream.
    ///
    /// Waits for as long as the permission prompt is open; drop the future
    /// to cancel. On failure nothing is held. A granted stream that does not
    /// satisfy `constraints` is released before the error is returned.
    pub async fn acquire(&self, constraints: CaptureConstraints) -> DuetResult<CaptureLease> {
        if constraints.width == 0 || constraints.height == 0 || constraints.fps == 0 {
            return Err(DuetError::config(format!(
                "invalid capture constraints {}x{} @ {} fps",
                constraints.width, constraints.height, constraints.fps
            )));
        }

        tracing::info!(
            facility = self.facility.name(),
            width = constraints.width,
            height = constraints.height,
            fps = constraints.fps,
            audio = constraints.audio,
            "Requesting capture stream"
        );

        let mut stream = match self.facility.request_stream(&constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(error = %e, "Capture request failed");
                return Err(e);
            }
        };

        if constraints.audio && !stream.info().has_audio {
            stream.release();
            tracing::warn!("Granted stream has no microphone track");
            return Err(DuetError::device_unavailable(
                "the granted stream has no microphone track",
            ));
        }

        tracing::info!(source = %stream.id(), "Capture stream granted");
        Ok(CaptureLease::new(stream))
    }
}

/// A granted device stream, released on drop.
pub struct CaptureLease {
    info: StreamInfo,
    stream: Option<Box<dyn DeviceStream>>,
}

impl CaptureLease {
    fn new(stream: Box<dyn DeviceStream>) -> Self {
        Self {
            info: stream.info().clone(),
            stream: Some(stream),
        }
    }

    /// Give the device back. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            tracing::info!(source = %self.info.id, "Capture stream released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.stream.as_ref().map_or(true, |s| s.is_released())
    }
}

impl SourceStream for CaptureLease {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn latest_frame(&mut self) -> Option<&Frame> {
        self.stream.as_mut()?.latest_frame()
    }

    fn read_audio(&mut self, frames: usize) -> Option<Vec<f32>> {
        self.stream.as_mut()?.read_audio(frames)
    }

    fn is_muted(&self) -> bool {
        self.stream.as_ref().is_some_and(|s| s.is_muted())
    }

    fn set_muted(&mut self, muted: bool) {
        if let Some(stream) = self.stream.as_mut() {
            stream.set_muted(muted);
        }
    }
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SyntheticDevice, SyntheticOutcome};
    use std::time::Duration;

    fn acquisition(device: &SyntheticDevice) -> CaptureAcquisition {
        CaptureAcquisition::new(Arc::new(device.clone()))
    }

    #[tokio::test]
    async fn lease_releases_on_drop_and_explicitly() {
        let device = SyntheticDevice::new();
        let acq = acquisition(&device);

        let lease = acq.acquire(CaptureConstraints::default()).await.unwrap();
        assert_eq!(device.live_streams(), 1);
        drop(lease);
        assert_eq!(device.live_streams(), 0);

        let mut lease = acq.acquire(CaptureConstraints::default()).await.unwrap();
        lease.release();
        lease.release();
        assert!(lease.is_released());
        assert!(lease.latest_frame().is_none());
        assert_eq!(device.live_streams(), 0);
    }

    #[tokio::test]
    async fn denied_request_is_user_recoverable() {
        let device = SyntheticDevice::new().with_outcome(SyntheticOutcome::Deny);
        let err = acquisition(&device)
            .acquire(CaptureConstraints::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_user_recoverable());
        assert_eq!(device.live_streams(), 0);
    }

    #[tokio::test]
    async fn stream_without_required_audio_is_rejected_and_released() {
        let device = SyntheticDevice::new().without_microphone();
        let err = acquisition(&device)
            .acquire(CaptureConstraints::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DuetError::DeviceUnavailable { .. }));
        assert_eq!(device.live_streams(), 0);

        let video_only = CaptureConstraints {
            audio: false,
            ..CaptureConstraints::default()
        };
        assert!(acquisition(&device).acquire(video_only).await.is_ok());
    }

    #[tokio::test]
    async fn abandoned_prompt_holds_nothing() {
        let device = SyntheticDevice::new().with_outcome(SyntheticOutcome::Hang);
        let acq = acquisition(&device);
        let pending = acq.acquire(CaptureConstraints::default());
        let result = tokio::time::timeout(Duration::from_millis(20), pending).await;
        assert!(result.is_err());
        assert_eq!(device.live_streams(), 0);
    }

    #[tokio::test]
    async fn zero_sized_constraints_are_rejected() {
        let device = SyntheticDevice::new();
        let constraints = CaptureConstraints {
            width: 0,
            ..CaptureConstraints::default()
        };
        assert!(acquisition(&device).acquire(constraints).await.is_err());
        assert_eq!(device.live_streams(), 0);
    }
}
