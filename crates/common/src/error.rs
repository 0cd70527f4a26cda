//! Error types shared across Duet crates.

/// Top-level error type for Duet operations.
///
/// Every failure is scoped to the session that produced it. Capture failures
/// are user-recoverable (the host shows a retry prompt), `NotEntitled` is a
/// plain notice, and `RecordingFailed` terminates the recording session it
/// belongs to without any automatic retry.
#[derive(Debug, thiserror::Error)]
pub enum DuetError {
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Device unavailable: {message}")]
    DeviceUnavailable { message: String },

    #[error("Effect '{effect_id}' requires an entitlement the user does not have")]
    NotEntitled { effect_id: String },

    #[error("Recording failed: {message}")]
    RecordingFailed { message: String },

    /// A source produced no frame for a tick. The renderer recovers by
    /// reusing its last composed frame, so this never reaches a caller.
    #[error("Source '{source_id}' yielded no frame")]
    SourceStarved { source_id: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Invalid layout: {message}")]
    InvalidLayout { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using DuetError.
pub type DuetResult<T> = Result<T, DuetError>;

impl DuetError {
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            message: msg.into(),
        }
    }

    pub fn not_entitled(effect_id: impl Into<String>) -> Self {
        Self::NotEntitled {
            effect_id: effect_id.into(),
        }
    }

    pub fn recording_failed(msg: impl Into<String>) -> Self {
        Self::RecordingFailed {
            message: msg.into(),
        }
    }

    pub fn source_starved(source_id: impl Into<String>) -> Self {
        Self::SourceStarved {
            source_id: source_id.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Capture failures the user can fix and retry (grant access, plug a device in).
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. } | Self::DeviceUnavailable { .. }
        )
    }

    /// Whether this error ends the recording session it occurred in.
    pub fn is_session_terminal(&self) -> bool {
        matches!(self, Self::RecordingFailed { .. })
    }

    /// Short, user-facing notice text for the host UI.
    pub fn notice(&self) -> String {
        match self {
            Self::PermissionDenied { .. } => {
                "Camera or microphone access was denied. Allow access and try again.".to_string()
            }
            Self::DeviceUnavailable { .. } => {
                "No usable camera or microphone was found. Check the device and try again."
                    .to_string()
            }
            Self::NotEntitled { effect_id } => {
                format!("The '{effect_id}' effect is only available to premium members.")
            }
            Self::RecordingFailed { .. } => {
                "Recording stopped because of an error. Start a new recording to try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_errors_are_recoverable() {
        assert!(DuetError::permission_denied("camera").is_user_recoverable());
        assert!(DuetError::device_unavailable("no camera").is_user_recoverable());
        assert!(!DuetError::recording_failed("encoder").is_user_recoverable());
    }

    #[test]
    fn only_recording_failures_end_the_session() {
        assert!(DuetError::recording_failed("encoder died").is_session_terminal());
        assert!(!DuetError::not_entitled("crown").is_session_terminal());
        assert!(!DuetError::source_starved("cam").is_session_terminal());
    }

    #[test]
    fn notice_names_the_gated_effect() {
        let notice = DuetError::not_entitled("crown").notice();
        assert!(notice.contains("'crown'"));
    }

    #[test]
    fn display_includes_message() {
        let err = DuetError::recording_failed("encoder device lost");
        assert_eq!(err.to_string(), "Recording failed: encoder device lost");
    }
}
