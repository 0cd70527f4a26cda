//! Source stream identity and capture constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a source stream (camera, microphone or reference clip).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Where a source stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Live camera (+ microphone) owned by capture acquisition.
    Camera,
    /// Pre-recorded clip owned by the caller.
    ReferenceClip,
}

/// Static description of a source stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: SourceId,
    pub kind: SourceKind,
    /// Nominal frame width.
    pub width: u32,
    /// Nominal frame height.
    pub height: u32,
    /// Nominal frame rate.
    pub fps: u32,
    /// Whether the stream carries audio.
    pub has_audio: bool,
}

/// What the caller asks the device capture facility for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    /// Desired frame width.
    pub width: u32,
    /// Desired frame height.
    pub height: u32,
    /// Desired frame rate.
    pub fps: u32,
    /// Whether a microphone track is required.
    pub audio: bool,
    /// Mirror camera frames horizontally (selfie view).
    pub mirror: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            audio: true,
            mirror: true,
        }
    }
}
