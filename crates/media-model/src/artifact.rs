//! Recording session identity and finalized artifact metadata.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::quality::QualityTier;

/// Metadata attached to a finalized recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    /// Id of the recording session that produced the artifact.
    pub session_id: String,

    /// Recorded duration in seconds (never above the session's max duration).
    pub duration_secs: f64,

    /// Quality tier the session was encoded at.
    pub quality: QualityTier,

    /// Total size of the artifact bytes.
    pub byte_len: u64,

    /// Number of encoder chunks concatenated into the artifact.
    pub chunk_count: usize,

    /// Container mime type reported by the encoder.
    pub mime_type: String,

    /// Finalization timestamp (RFC 3339).
    pub created_at: String,
}

impl ArtifactMeta {
    /// Suggested download file name, e.g. `duet-<session>.mkv`.
    pub fn file_name(&self) -> String {
        format!("duet-{}.{}", self.session_id, extension_for_mime(&self.mime_type))
    }

    /// Duration formatted as `mm:ss` for display.
    pub fn duration_label(&self) -> String {
        format_mm_ss(self.duration_secs)
    }
}

/// File extension for a container mime type.
pub fn extension_for_mime(mime: &str) -> &'static str {
    let base = mime.split(';').next().unwrap_or_default().trim();
    match base {
        "video/webm" => "webm",
        "video/x-matroska" => "mkv",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}

/// Format seconds as `mm:ss`.
pub fn format_mm_ss(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh recording session id.
///
/// Time-seeded like a v4 UUID, with a process-wide counter mixed in so ids
/// minted within the same clock tick still differ.
pub fn new_session_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let counter = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed) as u128;
    let seed = seed ^ (counter << 64) ^ counter.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    format!(
        "{:08x}-{:04x}-4{:03x}-{:04x}-{:012x}",
        (seed & 0xFFFF_FFFF) as u32,
        ((seed >> 32) & 0xFFFF) as u16,
        ((seed >> 48) & 0x0FFF) as u16,
        (((seed >> 60) & 0x3FFF) as u16) | 0x8000,
        (seed >> 76) & 0xFFFF_FFFF_FFFF,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(mime: &str) -> ArtifactMeta {
        ArtifactMeta {
            session_id: "abc".to_string(),
            duration_secs: 65.4,
            quality: QualityTier::Standard,
            byte_len: 10,
            chunk_count: 2,
            mime_type: mime.to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn file_name_follows_mime() {
        assert_eq!(meta("video/webm;codecs=vp9").file_name(), "duet-abc.webm");
        assert_eq!(meta("video/x-matroska").file_name(), "duet-abc.mkv");
        assert_eq!(meta("application/octet-stream").file_name(), "duet-abc.bin");
    }

    #[test]
    fn duration_label_is_minutes_seconds() {
        assert_eq!(meta("video/webm").duration_label(), "01:05");
        assert_eq!(format_mm_ss(-3.0), "00:00");
    }

    #[test]
    fn session_ids_are_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
