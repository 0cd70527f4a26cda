//! Effect descriptors and their resolved variants.
//!
//! A descriptor is what the host activates (an id from the effect catalog
//! plus settings). Before rendering it is resolved into a tagged [`Effect`]:
//! an area transform, an anchored decoration, or `Unknown` for ids this build
//! does not recognise. Unknown effects render as a no-op so newer catalogs
//! keep working against older pipelines.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point2D, Rect};

/// Maximum effect intensity.
pub const MAX_INTENSITY: u8 = 100;

/// Broad grouping used by pickers in the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    /// Whole-frame or region color/blur filters.
    Filter,
    /// Face-anchored decorations.
    Decoration,
    /// Anything the catalog knows about but this build does not.
    Other,
}

/// Placement tweak for an anchored decoration, relative to its default spot.
///
/// `offset` is measured in face-box units (1.0 = one face width/height),
/// `scale` multiplies the decoration's default size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecorationGeometry {
    pub offset: Point2D,
    pub scale: f64,
}

impl Default for DecorationGeometry {
    fn default() -> Self {
        Self {
            offset: Point2D::new(0.0, 0.0),
            scale: 1.0,
        }
    }
}

/// One configured visual transform in a session's active set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// Catalog id (e.g. "blur", "sparkles").
    pub id: String,

    /// Category the catalog files this effect under.
    pub category: EffectCategory,

    /// Strength in `[0, 100]`.
    pub intensity: u8,

    /// Decoration placement relative to the detected anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<DecorationGeometry>,

    /// Restrict an area transform to a fixed canvas region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Rect>,
}

impl EffectDescriptor {
    /// Create a descriptor, inferring the category from the id.
    pub fn new(id: impl Into<String>, intensity: u8) -> Self {
        let id = id.into();
        let category = if AreaKind::parse(&id).is_some() {
            EffectCategory::Filter
        } else if DecorationKind::parse(&id).is_some() {
            EffectCategory::Decoration
        } else {
            EffectCategory::Other
        };
        Self {
            id,
            category,
            intensity: intensity.min(MAX_INTENSITY),
            geometry: None,
            region: None,
        }
    }

    pub fn with_geometry(mut self, geometry: DecorationGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }

    /// Intensity as a fraction in `[0.0, 1.0]`.
    pub fn strength(&self) -> f64 {
        self.intensity.min(MAX_INTENSITY) as f64 / MAX_INTENSITY as f64
    }

    /// Resolve into a renderable effect.
    pub fn resolve(&self) -> Effect {
        let intensity = self.intensity.min(MAX_INTENSITY);
        if let Some(kind) = AreaKind::parse(&self.id) {
            return Effect::Area(AreaTransform {
                kind,
                intensity,
                region: self.region,
            });
        }
        if let Some(kind) = DecorationKind::parse(&self.id) {
            return Effect::Anchored(AnchoredDecoration {
                kind,
                intensity,
                geometry: self.geometry.unwrap_or_default(),
            });
        }
        Effect::Unknown {
            id: self.id.clone(),
        }
    }
}

/// A resolved effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Area(AreaTransform),
    Anchored(AnchoredDecoration),
    Unknown { id: String },
}

/// A transform applied uniformly over the frame or a fixed region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaTransform {
    pub kind: AreaKind,
    pub intensity: u8,
    pub region: Option<Rect>,
}

/// Area transform kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaKind {
    Blur,
    Grayscale,
    Sepia,
    Tint,
    Brightness,
    Invert,
}

impl AreaKind {
    pub const ALL: [AreaKind; 6] = [
        AreaKind::Blur,
        AreaKind::Grayscale,
        AreaKind::Sepia,
        AreaKind::Tint,
        AreaKind::Brightness,
        AreaKind::Invert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AreaKind::Blur => "blur",
            AreaKind::Grayscale => "grayscale",
            AreaKind::Sepia => "sepia",
            AreaKind::Tint => "tint",
            AreaKind::Brightness => "brightness",
            AreaKind::Invert => "invert",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == id)
    }
}

/// A decoration drawn relative to facial landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchoredDecoration {
    pub kind: DecorationKind,
    pub intensity: u8,
    pub geometry: DecorationGeometry,
}

/// Anchored decoration kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationKind {
    Ears,
    Horns,
    Glasses,
    Crown,
    Sparkles,
}

impl DecorationKind {
    pub const ALL: [DecorationKind; 5] = [
        DecorationKind::Ears,
        DecorationKind::Horns,
        DecorationKind::Glasses,
        DecorationKind::Crown,
        DecorationKind::Sparkles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DecorationKind::Ears => "ears",
            DecorationKind::Horns => "horns",
            DecorationKind::Glasses => "glasses",
            DecorationKind::Crown => "crown",
            DecorationKind::Sparkles => "sparkles",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_area_transforms() {
        let effect = EffectDescriptor::new("blur", 40).resolve();
        assert!(matches!(
            effect,
            Effect::Area(AreaTransform {
                kind: AreaKind::Blur,
                intensity: 40,
                region: None
            })
        ));
    }

    #[test]
    fn resolves_decorations_with_default_geometry() {
        let d = EffectDescriptor::new("sparkles", 70);
        assert_eq!(d.category, EffectCategory::Decoration);
        match d.resolve() {
            Effect::Anchored(dec) => {
                assert_eq!(dec.kind, DecorationKind::Sparkles);
                assert_eq!(dec.geometry, DecorationGeometry::default());
            }
            other => panic!("expected decoration, got {other:?}"),
        }
    }

    #[test]
    fn unknown_ids_resolve_to_unknown() {
        let d = EffectDescriptor::new("hologram-v9", 50);
        assert_eq!(d.category, EffectCategory::Other);
        assert_eq!(
            d.resolve(),
            Effect::Unknown {
                id: "hologram-v9".to_string()
            }
        );
    }

    #[test]
    fn intensity_is_clamped() {
        let d = EffectDescriptor::new("sepia", 250);
        assert_eq!(d.intensity, 100);
        assert!((d.strength() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn descriptor_deserializes_without_optional_fields() {
        let d: EffectDescriptor =
            serde_json::from_str(r#"{"id":"tint","category":"filter","intensity":30}"#).unwrap();
        assert!(d.geometry.is_none());
        assert!(d.region.is_none());
    }
}
