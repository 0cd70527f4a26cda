//! Facial anchor data supplied by an external feature detector.
//!
//! The pipeline never detects faces itself. A detector (or a stub) implements
//! [`AnchorProvider`] and reports either a present [`AnchorFrame`] or nothing
//! for each tick; anchored decorations are simply skipped on ticks without one.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point2D, Rect};

/// Approximate facial landmarks for one tick, in normalized canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorFrame {
    pub left_eye: Point2D,
    pub right_eye: Point2D,
    pub nose: Point2D,
    pub mouth: Point2D,
    /// Face bounding box.
    pub face: Rect,
}

impl AnchorFrame {
    /// Derive typical landmark positions from a face bounding box alone.
    pub fn from_face_box(face: Rect) -> Self {
        let at = |fx: f64, fy: f64| Point2D::new(face.x + face.w * fx, face.y + face.h * fy);
        Self {
            left_eye: at(0.32, 0.38),
            right_eye: at(0.68, 0.38),
            nose: at(0.5, 0.58),
            mouth: at(0.5, 0.78),
            face,
        }
    }

    /// Midpoint between the eyes.
    pub fn eye_center(&self) -> Point2D {
        Point2D::midpoint(&self.left_eye, &self.right_eye)
    }

    /// Distance between the eyes (normalized).
    pub fn eye_distance(&self) -> f64 {
        self.left_eye.distance_to(&self.right_eye)
    }

    /// Center of the top edge of the face box.
    pub fn forehead(&self) -> Point2D {
        Point2D::new(self.face.x + self.face.w / 2.0, self.face.y)
    }
}

/// Per-tick source of anchor data.
pub trait AnchorProvider: Send {
    /// Anchor for the given tick, or `None` when no face is available.
    fn anchor_for_tick(&mut self, tick: u64) -> Option<AnchorFrame>;
}

/// A provider that never detects anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnchors;

impl AnchorProvider for NoAnchors {
    fn anchor_for_tick(&mut self, _tick: u64) -> Option<AnchorFrame> {
        None
    }
}

/// A provider that reports the same anchor every tick.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnchor(pub AnchorFrame);

impl AnchorProvider for FixedAnchor {
    fn anchor_for_tick(&mut self, _tick: u64) -> Option<AnchorFrame> {
        Some(self.0)
    }
}

/// A provider that replays a fixed script, cycling when it runs out.
#[derive(Debug, Clone, Default)]
pub struct ScriptedAnchors {
    script: Vec<Option<AnchorFrame>>,
}

impl ScriptedAnchors {
    pub fn new(script: Vec<Option<AnchorFrame>>) -> Self {
        Self { script }
    }
}

impl AnchorProvider for ScriptedAnchors {
    fn anchor_for_tick(&mut self, tick: u64) -> Option<AnchorFrame> {
        if self.script.is_empty() {
            return None;
        }
        self.script[(tick % self.script.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landmarks_fall_inside_face_box() {
        let anchor = AnchorFrame::from_face_box(Rect::new(0.3, 0.2, 0.4, 0.5));
        for p in [
            anchor.left_eye,
            anchor.right_eye,
            anchor.nose,
            anchor.mouth,
        ] {
            assert!(anchor.face.contains(p));
        }
        assert!(anchor.left_eye.x < anchor.right_eye.x);
        assert!((anchor.forehead().y - 0.2).abs() < 1e-9);
    }

    #[test]
    fn scripted_anchors_cycle() {
        let present = AnchorFrame::from_face_box(Rect::new(0.25, 0.25, 0.5, 0.5));
        let mut provider = ScriptedAnchors::new(vec![Some(present), None]);
        assert!(provider.anchor_for_tick(0).is_some());
        assert!(provider.anchor_for_tick(1).is_none());
        assert!(provider.anchor_for_tick(2).is_some());
        assert!(NoAnchors.anchor_for_tick(0).is_none());
    }
}
