//! Output quality tiers.
//!
//! Tiers are the only externally visible format contract of the pipeline:
//! each maps to one fixed resolution and bitrate pair.

use std::fmt;
use std::str::FromStr;

use duet_common::error::DuetError;
use serde::{Deserialize, Serialize};

/// Output quality preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Standard,
    High,
}

/// Encoder target derived from a quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeProfile {
    pub width: u32,
    pub height: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Standard, QualityTier::High];

    /// Resolution and bitrates for this tier.
    pub fn profile(self) -> EncodeProfile {
        match self {
            QualityTier::Low => EncodeProfile {
                width: 640,
                height: 360,
                video_bitrate_kbps: 1_000,
                audio_bitrate_kbps: 96,
            },
            QualityTier::Standard => EncodeProfile {
                width: 1280,
                height: 720,
                video_bitrate_kbps: 2_500,
                audio_bitrate_kbps: 128,
            },
            QualityTier::High => EncodeProfile {
                width: 1920,
                height: 1080,
                video_bitrate_kbps: 5_000,
                audio_bitrate_kbps: 192,
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Standard => "standard",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DuetError::config(format!("unknown quality tier '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_are_strictly_ordered() {
        let profiles: Vec<_> = QualityTier::ALL.iter().map(|t| t.profile()).collect();
        for pair in profiles.windows(2) {
            assert!(pair[0].width < pair[1].width);
            assert!(pair[0].video_bitrate_kbps < pair[1].video_bitrate_kbps);
            assert!(pair[0].audio_bitrate_kbps < pair[1].audio_bitrate_kbps);
        }
    }

    #[test]
    fn mapping_is_deterministic() {
        assert_eq!(QualityTier::Standard.profile().width, 1280);
        assert_eq!(QualityTier::Standard.profile().height, 720);
        assert_eq!(QualityTier::High.profile(), QualityTier::High.profile());
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<QualityTier>().unwrap(), QualityTier::High);
        assert!("ultra".parse::<QualityTier>().is_err());
    }
}
