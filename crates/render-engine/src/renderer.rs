//! The composite renderer: one retained output frame, refreshed per tick.

use serde::{Deserialize, Serialize};

use duet_common::clock::RateController;
use duet_common::error::{DuetError, DuetResult};
use duet_effects::pipeline::EffectPipeline;
use duet_media_model::anchor::AnchorFrame;
use duet_media_model::effect::EffectDescriptor;
use duet_media_model::frame::Frame;
use duet_media_model::layout::LayoutMode;

use crate::compositor::compose;

/// Output surface configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub layout: LayoutMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            layout: LayoutMode::PairedSideBySide,
        }
    }
}

/// Counters for one renderer's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Ticks requested.
    pub ticks: u64,
    /// Ticks that composed a fresh frame.
    pub composed: u64,
    /// Ticks that reused the previous frame because a source starved.
    pub reused: u64,
    /// Effect pipeline passes run.
    pub effect_passes: u64,
    /// Decorations skipped for lack of an anchor.
    pub skipped_decorations: u64,
}

/// Composes sources into a single retained output frame.
///
/// The renderer keeps only the latest composed frame and overwrites it in
/// place every tick. When a source has nothing for a tick, the previous
/// frame is published again.
pub struct CompositeRenderer {
    config: RendererConfig,
    canvas: Frame,
    pipeline: EffectPipeline,
    rate: RateController,
    effects_frozen: bool,
    stats: RenderStats,
}

impl CompositeRenderer {
    pub fn new(config: RendererConfig) -> DuetResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(DuetError::invalid_layout(format!(
                "output resolution {}x{} is empty",
                config.width, config.height
            )));
        }
        if config.fps == 0 {
            return Err(DuetError::config("frame rate must be positive"));
        }
        tracing::info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            layout = %config.layout,
            "Composite renderer created"
        );
        Ok(Self {
            canvas: Frame::new(config.width, config.height),
            pipeline: EffectPipeline::new(),
            rate: RateController::new(config.fps),
            effects_frozen: false,
            stats: RenderStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn layout(&self) -> LayoutMode {
        self.config.layout
    }

    /// Stop (or restart) running effects on composed frames.
    pub fn set_effects_frozen(&mut self, frozen: bool) {
        self.effects_frozen = frozen;
    }

    pub fn effects_frozen(&self) -> bool {
        self.effects_frozen
    }

    /// Gate a host refresh callback down to the configured frame rate.
    pub fn should_render(&mut self, host_ns: u64) -> bool {
        self.rate.should_tick(host_ns)
    }

    /// Latest composed frame.
    pub fn frame(&self) -> &Frame {
        &self.canvas
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Compose one output frame.
    ///
    /// `sources` are in layout order; `None` means the source has no frame
    /// this tick, in which case the previous output is kept unchanged.
    pub fn tick(
        &mut self,
        sources: &[Option<&Frame>],
        effects: &[EffectDescriptor],
        anchor: Option<&AnchorFrame>,
    ) -> DuetResult<&Frame> {
        self.config.layout.validate_source_count(sources.len())?;
        self.stats.ticks += 1;

        let Some(frames) = sources.iter().copied().collect::<Option<Vec<&Frame>>>() else {
            let starved = sources.iter().position(Option::is_none).unwrap_or(0);
            let err = DuetError::source_starved(format!("layout slot {starved}"));
            tracing::debug!(error = %err, tick = self.stats.ticks, "Reusing last composed frame");
            self.stats.reused += 1;
            return Ok(&self.canvas);
        };

        compose(&mut self.canvas, self.config.layout, &frames)?;
        self.stats.composed += 1;

        if !self.effects_frozen && !effects.is_empty() {
            let report = self.pipeline.apply(&mut self.canvas, effects, anchor);
            self.stats.effect_passes += 1;
            self.stats.skipped_decorations += report.skipped_no_anchor as u64;
        }

        tracing::trace!(tick = self.stats.ticks, "Frame composed");
        Ok(&self.canvas)
    }
}
