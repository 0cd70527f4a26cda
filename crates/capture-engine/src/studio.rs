//! Studio: one compositing + recording session.
//!
//! Owns the capture lease, the optional reference clip, the renderer, the
//! mix graph, the shared effect stack and the recording controller. Every
//! piece of state is session-scoped, so one studio failing never touches
//! another.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use duet_audio_mix::{AudioChannel, BlockPacer, MixGraph};
use duet_common::error::DuetResult;
use duet_effects::{Entitlements, SharedEffects};
use duet_media_model::anchor::{AnchorProvider, NoAnchors};
use duet_media_model::effect::EffectDescriptor;
use duet_media_model::frame::Frame;
use duet_media_model::layout::LayoutMode;
use duet_media_model::source::{CaptureConstraints, SourceId};
use duet_render_engine::{CompositeRenderer, RenderStats, RendererConfig};

use crate::acquisition::{CaptureAcquisition, CaptureLease};
use crate::artifact::{Artifact, ArtifactReceipt, ArtifactSink};
use crate::encoder::Encoder;
use crate::session::{
    Preconditions, RecordingConfig, RecordingController, RecordingState, TickInput, TickOutcome,
};
use crate::source::{ReferenceClip, SourceStream};

/// Settings for one studio session.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    pub layout: LayoutMode,
    pub recording: RecordingConfig,
    pub constraints: CaptureConstraints,
    pub camera_gain: f32,
    pub clip_gain: f32,
    pub entitlements: Entitlements,
}

impl StudioConfig {
    pub fn new(layout: LayoutMode, recording: RecordingConfig) -> Self {
        Self {
            layout,
            recording,
            constraints: CaptureConstraints::default(),
            camera_gain: 1.0,
            clip_gain: 1.0,
            entitlements: Entitlements::free(),
        }
    }

    /// Output canvas size, taken from the quality tier.
    pub fn output_size(&self) -> (u32, u32) {
        let profile = self.recording.quality.profile();
        (profile.width, profile.height)
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::new(LayoutMode::PairedSideBySide, RecordingConfig::default())
    }
}

/// Result of one studio tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Renderer tick counter after this tick.
    pub tick: u64,
    pub outcome: TickOutcome,
    pub state: RecordingState,
    /// Active recording time so far.
    pub elapsed: Duration,
    /// A source had no frame and the previous output was reused.
    pub starved: bool,
    /// Samples in the mixed block, sized from the time since the last tick.
    pub audio_frames: usize,
    /// Peak absolute sample of the mixed block.
    pub audio_peak: f32,
}

/// One duet / AR session.
pub struct Studio {
    layout: LayoutMode,
    camera: CaptureLease,
    clip: Option<ReferenceClip>,
    renderer: CompositeRenderer,
    mix: MixGraph,
    audio_pacer: BlockPacer,
    effects: SharedEffects,
    entitlements: Entitlements,
    anchors: Box<dyn AnchorProvider>,
    controller: RecordingController,
    opened_at: Instant,
}

impl Studio {
    /// Acquire the camera and assemble a session.
    ///
    /// Two-source layouts need a reference clip and `single-anchored` must
    /// not get one; the check runs before any device is requested.
    pub async fn open(
        acquisition: &CaptureAcquisition,
        config: StudioConfig,
        clip: Option<ReferenceClip>,
        encoder: Box<dyn Encoder>,
    ) -> DuetResult<Self> {
        let sources = 1 + usize::from(clip.is_some());
        config.layout.validate_source_count(sources)?;

        let (width, height) = config.output_size();
        let renderer = CompositeRenderer::new(RendererConfig {
            width,
            height,
            fps: config.recording.fps,
            layout: config.layout,
        })?;

        let camera = acquisition.acquire(config.constraints).await?;

        let mut channels = vec![AudioChannel::new(camera.id().clone(), config.camera_gain)];
        if let Some(clip) = &clip {
            channels.push(AudioChannel::new(clip.id().clone(), config.clip_gain));
        }
        let mix = MixGraph::build(&channels, config.recording.sample_rate);
        let audio_pacer = BlockPacer::new(
            config.recording.sample_rate,
            config.recording.tick_interval(),
        );

        tracing::info!(
            layout = %config.layout,
            width,
            height,
            camera = %camera.id(),
            clip = ?clip.as_ref().map(|c| c.id().to_string()),
            "Studio opened"
        );

        Ok(Self {
            layout: config.layout,
            camera,
            clip,
            renderer,
            mix,
            audio_pacer,
            effects: SharedEffects::default(),
            entitlements: config.entitlements,
            anchors: Box::new(NoAnchors),
            controller: RecordingController::new(config.recording, encoder),
            opened_at: Instant::now(),
        })
    }

    /// Use `provider` for per-tick anchor frames.
    pub fn with_anchor_provider(mut self, provider: Box<dyn AnchorProvider>) -> Self {
        self.anchors = provider;
        self
    }

    pub fn set_anchor_provider(&mut self, provider: Box<dyn AnchorProvider>) {
        self.anchors = provider;
    }

    /// Host time since the studio opened.
    pub fn host_now(&self) -> Duration {
        self.opened_at.elapsed()
    }

    pub fn layout(&self) -> LayoutMode {
        self.layout
    }

    pub fn state(&self) -> RecordingState {
        self.controller.state()
    }

    pub fn controller(&self) -> &RecordingController {
        &self.controller
    }

    pub fn render_stats(&self) -> RenderStats {
        self.renderer.stats()
    }

    /// Latest published surface.
    pub fn surface(&self) -> &Frame {
        self.renderer.frame()
    }

    pub fn camera_id(&self) -> &SourceId {
        self.camera.id()
    }

    pub fn clip_id(&self) -> Option<&SourceId> {
        self.clip.as_ref().map(|c| c.id())
    }

    pub fn clip(&self) -> Option<&ReferenceClip> {
        self.clip.as_ref()
    }

    pub fn camera_released(&self) -> bool {
        self.camera.is_released()
    }

    /// Handle to the active effect set for a control thread.
    pub fn effects(&self) -> SharedEffects {
        self.effects.clone()
    }

    /// Activate an effect under this session's entitlements.
    pub fn activate_effect(&self, descriptor: EffectDescriptor) -> DuetResult<bool> {
        self.effects.activate(descriptor, &self.entitlements)
    }

    pub fn deactivate_effect(&self, id: &str) -> bool {
        self.effects.deactivate(id)
    }

    pub fn set_entitlements(&mut self, entitlements: Entitlements) {
        self.entitlements = entitlements;
    }

    /// Live gain change for one source.
    pub fn set_gain(&self, source: &SourceId, gain: f32) -> bool {
        self.mix.set_gain(source, gain)
    }

    pub fn gain(&self, source: &SourceId) -> Option<f32> {
        self.mix.gain(source)
    }

    /// Mute or unmute a source at the stream.
    pub fn set_muted(&mut self, source: &SourceId, muted: bool) -> bool {
        if self.camera.id() == source {
            self.camera.set_muted(muted);
            return true;
        }
        match self.clip.as_mut() {
            Some(clip) if clip.id() == source => {
                clip.set_muted(muted);
                true
            }
            _ => false,
        }
    }

    /// Keep only `source` in the mix.
    pub fn audio_mix_only(&mut self, source: &SourceId) -> DuetResult<()> {
        self.mix.audio_mix_only(source)
    }

    /// Replace the mix channel set. Safe while recording.
    pub fn rebuild_mix(&mut self, channels: &[AudioChannel]) {
        self.mix.rebuild(channels);
    }

    /// Start recording at host time `now`.
    ///
    /// A reference clip that is not already playing is rewound and played
    /// from the top, so every session starts in lockstep with the clip.
    pub fn start_recording(&mut self, now: Duration) -> DuetResult<()> {
        let mut started_clip = false;
        if self.controller.state() == RecordingState::Idle {
            if let Some(clip) = self.clip.as_mut() {
                if !clip.is_playing() {
                    clip.restart(now);
                    started_clip = true;
                }
            }
        }

        let preconditions = Preconditions {
            capture_acquired: !self.camera.is_released(),
            reference_clip_started: self.clip.as_ref().map(ReferenceClip::is_playing),
        };
        if let Err(e) = self.controller.start(now, preconditions) {
            if started_clip {
                if let Some(clip) = self.clip.as_mut() {
                    clip.pause(now);
                }
            }
            return Err(e);
        }
        self.audio_pacer.reset(now);
        self.renderer.set_effects_frozen(false);
        Ok(())
    }

    /// Pause recording, clip playback and effect evaluation together.
    pub fn pause_recording(&mut self, now: Duration) -> DuetResult<()> {
        self.controller.pause(now)?;
        if let Some(clip) = self.clip.as_mut() {
            clip.pause(now);
        }
        self.renderer.set_effects_frozen(true);
        Ok(())
    }

    pub fn resume_recording(&mut self, now: Duration) -> DuetResult<()> {
        self.controller.resume(now)?;
        if let Some(clip) = self.clip.as_mut() {
            clip.play(now);
        }
        self.audio_pacer.reset(now);
        self.renderer.set_effects_frozen(false);
        Ok(())
    }

    /// Manual stop. The artifact waits in preview.
    pub fn stop_recording(&mut self, now: Duration) -> DuetResult<Artifact> {
        let result = self.controller.stop(now);
        self.after_session(now);
        if let Err(e) = &result {
            if e.is_session_terminal() {
                self.camera.release();
            }
        }
        result
    }

    pub fn accept(&mut self) -> DuetResult<Artifact> {
        self.controller.accept()
    }

    pub async fn accept_into(&mut self, sink: &dyn ArtifactSink) -> DuetResult<ArtifactReceipt> {
        self.controller.accept_into(sink).await
    }

    pub fn discard(&mut self) {
        self.controller.discard();
        self.renderer.set_effects_frozen(false);
    }

    /// Host refresh callback. Runs a tick only when one is due at the
    /// session frame rate.
    pub fn on_refresh(&mut self, now: Duration) -> DuetResult<Option<TickReport>> {
        let host_ns = u64::try_from(now.as_nanos()).unwrap_or(u64::MAX);
        if !self.renderer.should_render(host_ns) {
            return Ok(None);
        }
        self.tick(now).map(Some)
    }

    /// Run one frame at host time `now`.
    pub fn tick(&mut self, now: Duration) -> DuetResult<TickReport> {
        if let Some(clip) = self.clip.as_mut() {
            clip.advance(now);
        }

        let tick_index = self.renderer.stats().ticks;
        let anchor = self.anchors.anchor_for_tick(tick_index);
        let effects = self.effects.snapshot();

        let frames = self.audio_pacer.frames_until(now);
        let mut inputs = HashMap::new();
        if let Some(block) = self.camera.read_audio(frames) {
            inputs.insert(self.camera.id().clone(), block);
        }
        if let Some(clip) = self.clip.as_mut() {
            if let Some(block) = clip.read_audio(frames) {
                inputs.insert(clip.id().clone(), block);
            }
        }
        let track = self.mix.mix(&inputs, frames);
        let audio_peak = duet_audio_mix::signal::peak_amplitude(&track.samples);

        let reference_position = self
            .clip
            .as_ref()
            .filter(|c| c.is_playing())
            .map(ReferenceClip::position);

        // Layout order: reference clip first, camera second.
        let camera_frame = self.camera.latest_frame();
        let sources: Vec<Option<&Frame>> = match self.clip.as_mut() {
            Some(clip) => vec![clip.latest_frame(), camera_frame],
            None => vec![camera_frame],
        };
        let starved = sources.iter().any(Option::is_none);

        let surface = self.renderer.tick(&sources, &effects, anchor.as_ref())?;
        let ingested = self.controller.ingest(TickInput {
            now,
            frame: surface,
            audio: &track.samples,
            reference_position,
        });

        let outcome = match ingested {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_session_terminal() {
                    self.camera.release();
                    self.after_session(now);
                }
                return Err(e);
            }
        };
        if outcome == TickOutcome::AutoStopped {
            self.after_session(now);
        }

        Ok(TickReport {
            tick: self.renderer.stats().ticks,
            outcome,
            state: self.controller.state(),
            elapsed: self.controller.elapsed(),
            starved,
            audio_frames: track.samples.len(),
            audio_peak,
        })
    }

    /// Drive ticks from a tokio interval at the session frame rate until the
    /// recording ends or `max_ticks` have run.
    pub async fn run(&mut self, max_ticks: u64) -> DuetResult<RecordingState> {
        let period = self.controller.config().tick_interval();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        for _ in 0..max_ticks {
            interval.tick().await;
            let report = self.tick(self.host_now())?;
            if !matches!(
                report.state,
                RecordingState::Recording | RecordingState::Paused
            ) {
                break;
            }
        }
        Ok(self.controller.state())
    }

    /// Tear the session down: drop any recording and release the camera.
    pub fn close(&mut self) {
        self.controller.discard();
        self.camera.release();
        if let Some(clip) = self.clip.as_mut() {
            clip.pause(self.opened_at.elapsed());
        }
        tracing::info!(layout = %self.layout, "Studio closed");
    }

    fn after_session(&mut self, now: Duration) {
        if let Some(clip) = self.clip.as_mut() {
            clip.pause(now);
        }
        self.renderer.set_effects_frozen(false);
    }
}

impl std::fmt::Debug for Studio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Studio")
            .field("layout", &self.layout)
            .field("state", &self.controller.state())
            .field("camera", self.camera.id())
            .field("clip", &self.clip_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{SyntheticDevice, SyntheticOutcome};
    use crate::encoder::MemoryEncoder;
    use duet_common::error::DuetError;
    use duet_media_model::quality::QualityTier;
    use std::sync::Arc;

    fn recording() -> RecordingConfig {
        RecordingConfig {
            max_duration: Duration::from_secs(2),
            quality: QualityTier::Low,
            fps: 30,
            timeslice: Duration::from_millis(250),
            sample_rate: 8_000,
        }
    }

    fn small_constraints() -> CaptureConstraints {
        CaptureConstraints {
            width: 64,
            height: 36,
            fps: 30,
            audio: true,
            mirror: true,
        }
    }

    fn clip() -> ReferenceClip {
        ReferenceClip::synthetic("reference", 48, 64, 30, Duration::from_secs(3), 8_000)
    }

    async fn studio(device: &SyntheticDevice, layout: LayoutMode, clip: Option<ReferenceClip>) -> DuetResult<Studio> {
        let mut config = StudioConfig::new(layout, recording());
        config.constraints = small_constraints();
        Studio::open(
            &CaptureAcquisition::new(Arc::new(device.clone())),
            config,
            clip,
            Box::new(MemoryEncoder::new()),
        )
        .await
    }

    #[tokio::test]
    async fn source_count_is_checked_before_acquiring() {
        let device = SyntheticDevice::new();
        let err = studio(&device, LayoutMode::PairedSideBySide, None).await.unwrap_err();
        assert!(matches!(err, DuetError::InvalidLayout { .. }));
        assert_eq!(device.live_streams(), 0);

        let err = studio(&device, LayoutMode::SingleAnchored, Some(clip()))
            .await
            .unwrap_err();
        assert!(matches!(err, DuetError::InvalidLayout { .. }));
        assert_eq!(device.live_streams(), 0);
    }

    #[tokio::test]
    async fn start_plays_the_reference_clip() {
        let device = SyntheticDevice::new();
        let mut studio = studio(&device, LayoutMode::PictureInPicture, Some(clip()))
            .await
            .unwrap();
        assert!(!studio.clip().unwrap().has_started());
        studio.start_recording(Duration::ZERO).unwrap();
        assert!(studio.clip().unwrap().is_playing());
        assert_eq!(studio.state(), RecordingState::Recording);

        studio.pause_recording(Duration::from_millis(100)).unwrap();
        assert!(!studio.clip().unwrap().is_playing());
        studio.resume_recording(Duration::from_millis(300)).unwrap();
        assert!(studio.clip().unwrap().is_playing());
    }

    #[tokio::test]
    async fn output_has_quality_tier_resolution() {
        let device = SyntheticDevice::new();
        let mut studio = studio(&device, LayoutMode::BlendOverlay, Some(clip()))
            .await
            .unwrap();
        studio.start_recording(Duration::ZERO).unwrap();
        let report = studio.tick(Duration::from_millis(33)).unwrap();
        assert_eq!(report.outcome, TickOutcome::Captured);
        assert_eq!(studio.surface().dimensions(), (640, 360));
    }

    #[tokio::test]
    async fn gains_and_mute_shape_the_mix() {
        let device = SyntheticDevice::new().with_tone(440.0, 8_000);
        let mut studio = studio(&device, LayoutMode::SingleAnchored, None).await.unwrap();
        let camera = studio.camera_id().clone();

        let loud = studio.tick(Duration::from_millis(33)).unwrap().audio_peak;
        assert!(loud > 0.9);

        assert!(studio.set_gain(&camera, 0.25));
        let quiet = studio.tick(Duration::from_millis(66)).unwrap().audio_peak;
        assert!((quiet - 0.25).abs() < 0.02, "peak {quiet}");

        assert!(studio.set_muted(&camera, true));
        assert_eq!(studio.tick(Duration::from_millis(100)).unwrap().audio_peak, 0.0);
        assert!(!studio.set_muted(&SourceId::from("nobody"), true));
    }

    #[tokio::test]
    async fn refresh_callbacks_tick_at_session_rate() {
        let device = SyntheticDevice::new();
        let mut studio = studio(&device, LayoutMode::SingleAnchored, None).await.unwrap();
        studio.start_recording(Duration::ZERO).unwrap();

        // One second of 60 Hz display refresh.
        let mut captured = 0;
        for k in 0..60u64 {
            if let Some(report) = studio.on_refresh(Duration::from_nanos(k * 16_666_667)).unwrap() {
                assert_eq!(report.outcome, TickOutcome::Captured);
                captured += 1;
            }
        }
        assert_eq!(captured, 30);
        assert_eq!(studio.render_stats().ticks, 30);
    }

    #[tokio::test]
    async fn close_releases_the_camera() {
        let device = SyntheticDevice::new();
        let mut studio = studio(&device, LayoutMode::SingleAnchored, None).await.unwrap();
        assert_eq!(device.live_streams(), 1);
        studio.start_recording(Duration::ZERO).unwrap();
        studio.close();
        studio.close();
        assert_eq!(device.live_streams(), 0);
        assert_eq!(studio.state(), RecordingState::Idle);
        assert!(studio.start_recording(Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn unavailable_device_opens_nothing() {
        let device = SyntheticDevice::new().with_outcome(SyntheticOutcome::Unavailable);
        let err = studio(&device, LayoutMode::SingleAnchored, None).await.unwrap_err();
        assert!(err.is_user_recoverable());
    }

    #[tokio::test(start_paused = true)]
    async fn run_drives_ticks_until_auto_stop() {
        let device = SyntheticDevice::new();
        let mut studio = studio(&device, LayoutMode::PairedStacked, Some(clip()))
            .await
            .unwrap();
        studio.start_recording(studio.host_now()).unwrap();
        let state = studio.run(1_000).await.unwrap();
        assert_eq!(state, RecordingState::Preview);
        let artifact = studio.controller().artifact().unwrap();
        assert!(artifact.duration() <= Duration::from_secs(2));
        assert!(artifact.duration() >= Duration::from_millis(1_900));
    }
}
