//! Runs the active effect set over a composed frame.

use serde::{Deserialize, Serialize};

use duet_media_model::anchor::AnchorFrame;
use duet_media_model::effect::{Effect, EffectDescriptor};
use duet_media_model::frame::Frame;

use crate::area::apply_area;
use crate::decoration::draw_decoration;

/// What happened during one pipeline pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Effects that modified (or were allowed to modify) the frame.
    pub applied: usize,
    /// Anchored decorations skipped because the tick had no anchor.
    pub skipped_no_anchor: usize,
    /// Effects with ids this build does not recognise.
    pub unknown: usize,
}

/// Stateless effect executor.
///
/// Entitlements are not checked here; gating happens when an effect is
/// activated on the stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct EffectPipeline;

impl EffectPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Apply `effects` to `frame` in order.
    ///
    /// Decorations need `anchor`; when it is `None` they are skipped for
    /// this call only.
    pub fn apply(
        &self,
        frame: &mut Frame,
        effects: &[EffectDescriptor],
        anchor: Option<&AnchorFrame>,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();
        for descriptor in effects {
            match descriptor.resolve() {
                Effect::Area(transform) => {
                    apply_area(frame, &transform);
                    report.applied += 1;
                }
                Effect::Anchored(decoration) => match anchor {
                    Some(anchor) => {
                        draw_decoration(frame, &decoration, anchor);
                        report.applied += 1;
                    }
                    None => report.skipped_no_anchor += 1,
                },
                Effect::Unknown { id } => {
                    tracing::trace!(effect = %id, "Unknown effect ignored");
                    report.unknown += 1;
                }
            }
        }
        tracing::trace!(
            applied = report.applied,
            skipped = report.skipped_no_anchor,
            unknown = report.unknown,
            "Effect pass complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_media_model::frame::Rgba;
    use duet_media_model::geometry::Rect;

    fn gradient(w: u32, h: u32) -> Frame {
        let mut frame = Frame::new(w, h);
        for y in 0..h {
            for x in 0..w {
                frame.put_pixel(x, y, Rgba::rgb((x * 7) as u8, (y * 5) as u8, 90));
            }
        }
        frame
    }

    fn face() -> AnchorFrame {
        AnchorFrame::from_face_box(Rect::new(0.25, 0.25, 0.5, 0.5))
    }

    #[test]
    fn decorations_without_anchor_leave_frame_untouched() {
        let mut frame = gradient(32, 32);
        let before = frame.clone();
        let report = EffectPipeline::new().apply(
            &mut frame,
            &[EffectDescriptor::new("sparkles", 100)],
            None,
        );
        assert_eq!(frame, before);
        assert_eq!(report.skipped_no_anchor, 1);
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn decorations_with_anchor_draw() {
        let mut frame = gradient(32, 32);
        let before = frame.clone();
        let anchor = face();
        let report = EffectPipeline::new().apply(
            &mut frame,
            &[EffectDescriptor::new("glasses", 100)],
            Some(&anchor),
        );
        assert_ne!(frame, before);
        assert_eq!(report.applied, 1);
    }

    #[test]
    fn unknown_effects_are_no_ops() {
        let mut frame = gradient(16, 16);
        let before = frame.clone();
        let report = EffectPipeline::new().apply(
            &mut frame,
            &[EffectDescriptor::new("holo-foil", 100)],
            Some(&face()),
        );
        assert_eq!(frame, before);
        assert_eq!(report.unknown, 1);
    }

    #[test]
    fn order_matters() {
        let pipeline = EffectPipeline::new();
        let tint_then_gray = [
            EffectDescriptor::new("tint", 100),
            EffectDescriptor::new("grayscale", 100),
        ];
        let gray_then_tint = [
            EffectDescriptor::new("grayscale", 100),
            EffectDescriptor::new("tint", 100),
        ];
        let mut a = gradient(8, 8);
        let mut b = gradient(8, 8);
        pipeline.apply(&mut a, &tint_then_gray, None);
        pipeline.apply(&mut b, &gray_then_tint, None);
        assert_ne!(a, b);
        let px = a.pixel(3, 3).unwrap();
        assert_eq!(px.r, px.b);
    }

    #[test]
    fn empty_effect_set_is_identity() {
        let mut frame = gradient(8, 8);
        let before = frame.clone();
        let report = EffectPipeline::new().apply(&mut frame, &[], Some(&face()));
        assert_eq!(frame, before);
        assert_eq!(report, PipelineReport::default());
    }
}
