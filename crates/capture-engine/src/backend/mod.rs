use duet_common::error::DuetResult;
use duet_media_model::source::CaptureConstraints;

use crate::source::SourceStream;

/// The external device capture facility (camera + microphone).
///
/// `request_stream` may wait on a user permission prompt for as long as it
/// takes; callers cancel by dropping the future.
#[async_trait::async_trait]
pub trait DeviceFacility: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Ask for a live stream matching `constraints`.
    ///
    /// Fails with `PermissionDenied` or `DeviceUnavailable`; never returns a
    /// partially opened stream.
    async fn request_stream(
        &self,
        constraints: &CaptureConstraints,
    ) -> DuetResult<Box<dyn DeviceStream>>;
}

/// A stream that holds a hardware resource until released.
pub trait DeviceStream: SourceStream {
    /// Give the device back. Calling this more than once is a no-op.
    fn release(&mut self);

    fn is_released(&self) -> bool;
}

pub mod synthetic;

pub use synthetic::{SyntheticDevice, SyntheticOutcome};

/// The facility used when no hardware backend is configured.
pub fn default_facility() -> Box<dyn DeviceFacility> {
    Box::new(SyntheticDevice::new())
}
