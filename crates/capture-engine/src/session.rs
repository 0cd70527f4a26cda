//! Recording session management.
//!
//! The [`RecordingController`] wraps an [`Encoder`] in the session state
//! machine:
//!
//! ```text
//! Idle ─start─▶ Recording ◀─resume/pause─▶ Paused
//!                  │                         │
//!                  └──── stop / max-duration ┴──▶ Stopped ──▶ Preview
//!                                                   ▲            │
//!                        encoder failure ───────────┘      accept/discard ─▶ Idle
//! ```

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};

use duet_common::clock::{DriftMeasurement, RecordingClock};
use duet_common::config::RecordingDefaults;
use duet_common::error::{DuetError, DuetResult};
use duet_media_model::artifact::new_session_id;
use duet_media_model::frame::Frame;
use duet_media_model::quality::QualityTier;

use crate::artifact::{Artifact, ArtifactManager, ArtifactReceipt, ArtifactSink, SessionSummary};
use crate::encoder::{Chunk, Encoder, EncoderConfig, EncoderEvent, EncoderStats};

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// No session; ready to start.
    Idle,
    /// Consuming composed frames and mixed audio.
    Recording,
    /// Chunk consumption frozen.
    Paused,
    /// Ended; either finalizing or failed.
    Stopped,
    /// Artifact ready for accept or discard.
    Preview,
}

/// Why a session left `Recording`/`Paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    MaxDuration,
    Failed,
}

/// Per-session recording settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingConfig {
    pub max_duration: Duration,
    pub quality: QualityTier,
    pub fps: u32,
    pub timeslice: Duration,
    pub sample_rate: u32,
}

impl RecordingConfig {
    /// Build from the configured defaults.
    pub fn from_defaults(defaults: &RecordingDefaults) -> DuetResult<Self> {
        if !(defaults.max_duration_secs.is_finite() && defaults.max_duration_secs > 0.0) {
            return Err(DuetError::config(format!(
                "max duration must be positive, got {}",
                defaults.max_duration_secs
            )));
        }
        Ok(Self {
            max_duration: Duration::from_secs_f64(defaults.max_duration_secs),
            quality: defaults.quality.parse()?,
            fps: defaults.fps.max(1),
            timeslice: Duration::from_millis(defaults.timeslice_ms.max(1) as u64),
            sample_rate: defaults.audio_sample_rate.max(1),
        })
    }

    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    pub fn with_quality(mut self, quality: QualityTier) -> Self {
        self.quality = quality;
        self
    }

    /// Duration of one composition tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    pub fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            quality: self.quality,
            fps: self.fps,
            sample_rate: self.sample_rate,
            timeslice: self.timeslice,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_secs(60),
            quality: QualityTier::Standard,
            fps: 30,
            timeslice: crate::encoder::DEFAULT_TIMESLICE,
            sample_rate: 48_000,
        }
    }
}

/// What must hold before a session may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    /// A camera stream is currently granted.
    pub capture_acquired: bool,
    /// `Some(started)` when the layout plays a reference clip.
    pub reference_clip_started: Option<bool>,
}

/// One tick's worth of input for the controller.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// Host timestamp of the tick.
    pub now: Duration,
    /// The renderer's published surface.
    pub frame: &'a Frame,
    /// The mixed audio block for this tick.
    pub audio: &'a [f32],
    /// Reference clip playback position, if a clip is playing.
    pub reference_position: Option<Duration>,
}

/// What happened to a tick handed to [`RecordingController::ingest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session is recording; the tick was not consumed.
    Inactive,
    /// Paused; the tick was not consumed.
    Paused,
    /// Frame and audio were handed to the encoder.
    Captured,
    /// Max duration reached; the session is now in `Preview`.
    AutoStopped,
}

/// The recording state machine around one encoder.
pub struct RecordingController {
    config: RecordingConfig,
    encoder: Box<dyn Encoder>,
    manager: ArtifactManager,
    state: RecordingState,
    stop_reason: Option<StopReason>,
    session_id: Option<String>,
    clock: RecordingClock,
    events: Option<UnboundedReceiver<EncoderEvent>>,
    chunks: Vec<Chunk>,
    artifact: Option<Artifact>,
    failure: Option<String>,
    ticks: u64,
}

impl RecordingController {
    pub fn new(config: RecordingConfig, encoder: Box<dyn Encoder>) -> Self {
        Self {
            config,
            encoder,
            manager: ArtifactManager::new(),
            state: RecordingState::Idle,
            stop_reason: None,
            session_id: None,
            clock: RecordingClock::new(),
            events: None,
            chunks: Vec::new(),
            artifact: None,
            failure: None,
            ticks: 0,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Change settings for the next session.
    pub fn set_config(&mut self, config: RecordingConfig) -> DuetResult<()> {
        if self.state != RecordingState::Idle {
            return Err(DuetError::invalid_state(
                "recording settings are fixed while a session exists",
            ));
        }
        self.config = config;
        Ok(())
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Active recording time of the current session.
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Time spent paused in the current session.
    pub fn paused_total(&self) -> Duration {
        self.clock.paused_total()
    }

    /// Failure message of the last session, if it failed.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// The artifact awaiting accept or discard.
    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    /// Chunks received so far in the current session.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Ticks consumed in the current session.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn encoder_stats(&self) -> EncoderStats {
        self.encoder.stats()
    }

    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    /// `Idle → Recording` at host time `now`.
    pub fn start(&mut self, now: Duration, preconditions: Preconditions) -> DuetResult<()> {
        if self.state != RecordingState::Idle {
            return Err(DuetError::invalid_state(format!(
                "cannot start recording while {:?}",
                self.state
            )));
        }
        if !preconditions.capture_acquired {
            return Err(DuetError::invalid_state("capture has not been acquired"));
        }
        if preconditions.reference_clip_started == Some(false) {
            return Err(DuetError::invalid_state(
                "the reference clip has not started playing",
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.encoder
            .start(&self.config.encoder_config(), tx)
            .map_err(|e| DuetError::recording_failed(format!("encoder did not start: {e}")))?;

        let session_id = new_session_id();
        self.clock.start(now);
        self.events = Some(rx);
        self.chunks.clear();
        self.artifact = None;
        self.failure = None;
        self.stop_reason = None;
        self.ticks = 0;
        self.state = RecordingState::Recording;

        tracing::info!(
            session = %session_id,
            encoder = self.encoder.name(),
            quality = %self.config.quality,
            max_duration_secs = self.config.max_duration.as_secs_f64(),
            "Recording started"
        );
        self.session_id = Some(session_id);
        Ok(())
    }

    /// Feed one tick. Returns `Err(RecordingFailed)` when the encoder fails;
    /// the session is then `Stopped` with no artifact.
    pub fn ingest(&mut self, input: TickInput<'_>) -> DuetResult<TickOutcome> {
        match self.state {
            RecordingState::Recording => {}
            RecordingState::Paused => {
                self.drain_events()?;
                return Ok(TickOutcome::Paused);
            }
            _ => return Ok(TickOutcome::Inactive),
        }

        self.clock.advance(input.now);
        let pts = self.clock.elapsed();
        self.ticks += 1;

        if let Err(e) = self.push(input.frame, input.audio, pts) {
            return Err(self.fail(e.to_string()));
        }
        self.drain_events()?;

        if let Some(position) = input.reference_position {
            self.check_drift(position, pts);
        }

        if pts >= self.config.max_duration {
            tracing::info!(
                session = self.session_id.as_deref().unwrap_or_default(),
                elapsed_secs = pts.as_secs_f64(),
                ticks = self.ticks,
                "Max duration reached, stopping"
            );
            self.finish(StopReason::MaxDuration)?;
            return Ok(TickOutcome::AutoStopped);
        }

        tracing::trace!(tick = self.ticks, pts_ms = pts.as_millis() as u64, "Tick captured");
        Ok(TickOutcome::Captured)
    }

    /// `Recording → Paused` at host time `now`.
    pub fn pause(&mut self, now: Duration) -> DuetResult<()> {
        if self.state != RecordingState::Recording {
            return Err(DuetError::invalid_state("not recording"));
        }
        self.clock.pause(now);
        if let Err(e) = self.encoder.pause() {
            return Err(self.fail(e.to_string()));
        }
        self.state = RecordingState::Paused;
        tracing::info!(elapsed_secs = self.clock.elapsed_secs(), "Recording paused");
        Ok(())
    }

    /// `Paused → Recording` at host time `now`.
    pub fn resume(&mut self, now: Duration) -> DuetResult<()> {
        if self.state != RecordingState::Paused {
            return Err(DuetError::invalid_state("not paused"));
        }
        self.clock.resume(now);
        if let Err(e) = self.encoder.resume() {
            return Err(self.fail(e.to_string()));
        }
        self.state = RecordingState::Recording;
        tracing::info!(
            paused_total_secs = self.clock.paused_total().as_secs_f64(),
            "Recording resumed"
        );
        Ok(())
    }

    /// Manual stop. Finalizes the artifact and enters `Preview`.
    pub fn stop(&mut self, now: Duration) -> DuetResult<Artifact> {
        match self.state {
            RecordingState::Recording => {
                self.clock.advance(now);
            }
            RecordingState::Paused => {}
            _ => return Err(DuetError::invalid_state("no recording in progress")),
        }
        self.finish(StopReason::Manual)
    }

    /// Terminate the session because a collaborator failed.
    pub fn fail_with(&mut self, message: impl Into<String>) -> DuetError {
        self.fail(message.into())
    }

    /// `Preview → Idle`, taking the artifact.
    pub fn accept(&mut self) -> DuetResult<Artifact> {
        if self.state != RecordingState::Preview {
            return Err(DuetError::invalid_state("no artifact to accept"));
        }
        let artifact = self
            .artifact
            .take()
            .ok_or_else(|| DuetError::invalid_state("no artifact to accept"))?;
        self.reset();
        tracing::info!(session = %artifact.meta().session_id, "Artifact accepted");
        Ok(artifact)
    }

    /// Hand the previewed artifact to `sink`, then return to `Idle`.
    ///
    /// If the sink fails the artifact stays in preview.
    pub async fn accept_into(&mut self, sink: &dyn ArtifactSink) -> DuetResult<ArtifactReceipt> {
        let artifact = match (&self.state, &self.artifact) {
            (RecordingState::Preview, Some(artifact)) => artifact.clone(),
            _ => return Err(DuetError::invalid_state("no artifact to accept")),
        };
        let receipt = sink.deliver(&artifact).await?;
        self.accept()?;
        Ok(receipt)
    }

    /// Drop whatever the session holds and return to `Idle`. Valid from
    /// every state; calling it twice is harmless.
    pub fn discard(&mut self) {
        if matches!(self.state, RecordingState::Recording | RecordingState::Paused) {
            if let Err(e) = self.encoder.stop() {
                tracing::debug!(error = %e, "Encoder stop failed during discard");
            }
        }
        if self.state != RecordingState::Idle {
            tracing::info!(
                session = self.session_id.as_deref().unwrap_or_default(),
                "Recording discarded"
            );
        }
        self.artifact = None;
        self.failure = None;
        self.reset();
    }

    fn reset(&mut self) {
        self.state = RecordingState::Idle;
        self.stop_reason = None;
        self.session_id = None;
        self.events = None;
        self.chunks.clear();
        self.clock = RecordingClock::new();
        self.ticks = 0;
    }

    fn push(&mut self, frame: &Frame, audio: &[f32], pts: Duration) -> DuetResult<()> {
        self.encoder.push_video(frame, pts)?;
        if !audio.is_empty() {
            self.encoder.push_audio(audio, pts)?;
        }
        Ok(())
    }

    /// Move every pending encoder event into the session.
    fn drain_events(&mut self) -> DuetResult<()> {
        let Some(events) = self.events.as_mut() else {
            return Ok(());
        };
        let mut failure = None;
        while let Ok(event) = events.try_recv() {
            match event {
                EncoderEvent::Chunk(chunk) => self.chunks.push(chunk),
                EncoderEvent::Failed(message) => {
                    failure = Some(message);
                    break;
                }
            }
        }
        match failure {
            Some(message) => Err(self.fail(message)),
            None => Ok(()),
        }
    }

    fn check_drift(&self, reference: Duration, elapsed: Duration) {
        let drift = DriftMeasurement {
            reference_ns: reference.as_nanos() as u64,
            measured_ns: elapsed.as_nanos() as u64,
        };
        let tick_ms = self.config.tick_interval().as_secs_f64() * 1000.0;
        if drift.exceeds_threshold_ms(tick_ms) {
            tracing::warn!(
                drift_ms = drift.drift_ms(),
                tick_ms,
                "Recording time drifted from reference playback"
            );
        }
    }

    fn finish(&mut self, reason: StopReason) -> DuetResult<Artifact> {
        self.state = RecordingState::Stopped;
        self.stop_reason = Some(reason);

        if let Err(e) = self.encoder.stop() {
            return Err(self.fail(e.to_string()));
        }
        self.drain_events()?;
        self.events = None;

        let duration = self.clock.elapsed().min(self.config.max_duration);
        let summary = SessionSummary {
            session_id: self.session_id.clone().unwrap_or_default(),
            duration,
            quality: self.config.quality,
            mime_type: self.encoder.mime_type().to_string(),
        };
        let chunks = std::mem::take(&mut self.chunks);
        match self.manager.finalize(&summary, &chunks) {
            Ok(artifact) => {
                self.artifact = Some(artifact.clone());
                self.state = RecordingState::Preview;
                tracing::info!(
                    session = %summary.session_id,
                    reason = ?reason,
                    duration_secs = duration.as_secs_f64(),
                    "Recording stopped"
                );
                Ok(artifact)
            }
            Err(e) => Err(self.fail(e.to_string())),
        }
    }

    /// Enter `Stopped`/`Failed`, dropping everything recorded.
    fn fail(&mut self, message: String) -> DuetError {
        if let Err(e) = self.encoder.stop() {
            tracing::debug!(error = %e, "Encoder stop failed after failure");
        }
        self.state = RecordingState::Stopped;
        self.stop_reason = Some(StopReason::Failed);
        self.events = None;
        self.chunks.clear();
        self.artifact = None;
        tracing::warn!(
            session = self.session_id.as_deref().unwrap_or_default(),
            error = %message,
            "Recording failed"
        );
        self.failure = Some(message.clone());
        DuetError::recording_failed(message)
    }
}
