//! Layout modes: how sources are placed on the output canvas.

use std::fmt;
use std::str::FromStr;

use duet_common::error::{DuetError, DuetResult};
use serde::{Deserialize, Serialize};

/// Compositing strategy for one or two sources into one output frame.
///
/// Fixed for the lifetime of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    /// Two equal regions, left and right.
    PairedSideBySide,
    /// Two equal regions, top and bottom.
    PairedStacked,
    /// Source A full canvas, source B in a small corner inset.
    PictureInPicture,
    /// Both sources over the full canvas at partial opacity.
    BlendOverlay,
    /// One source full canvas; decorations follow the detected face.
    SingleAnchored,
}

impl LayoutMode {
    pub const ALL: [LayoutMode; 5] = [
        LayoutMode::PairedSideBySide,
        LayoutMode::PairedStacked,
        LayoutMode::PictureInPicture,
        LayoutMode::BlendOverlay,
        LayoutMode::SingleAnchored,
    ];

    /// Number of sources this layout composes.
    pub fn required_sources(self) -> usize {
        match self {
            LayoutMode::SingleAnchored => 1,
            _ => 2,
        }
    }

    /// Whether the second source is a pre-recorded reference clip (duet flow).
    pub fn uses_reference_clip(self) -> bool {
        self.required_sources() == 2
    }

    /// Check a source count against this layout.
    pub fn validate_source_count(self, count: usize) -> DuetResult<()> {
        let required = self.required_sources();
        if count != required {
            return Err(DuetError::invalid_layout(format!(
                "{self} requires exactly {required} source(s), got {count}"
            )));
        }
        Ok(())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::PairedSideBySide => "paired-side-by-side",
            LayoutMode::PairedStacked => "paired-stacked",
            LayoutMode::PictureInPicture => "picture-in-picture",
            LayoutMode::BlendOverlay => "blend-overlay",
            LayoutMode::SingleAnchored => "single-anchored",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayoutMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| DuetError::invalid_layout(format!("unknown layout mode '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_requirements() {
        assert_eq!(LayoutMode::SingleAnchored.required_sources(), 1);
        assert_eq!(LayoutMode::BlendOverlay.required_sources(), 2);
        assert!(LayoutMode::PairedStacked.validate_source_count(2).is_ok());
        assert!(LayoutMode::PairedStacked.validate_source_count(1).is_err());
        assert!(LayoutMode::SingleAnchored.validate_source_count(2).is_err());
    }

    #[test]
    fn parses_kebab_names() {
        for mode in LayoutMode::ALL {
            assert_eq!(mode.as_str().parse::<LayoutMode>().unwrap(), mode);
        }
        assert!("diagonal".parse::<LayoutMode>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&LayoutMode::PictureInPicture).unwrap();
        assert_eq!(json, "\"picture-in-picture\"");
    }
}
