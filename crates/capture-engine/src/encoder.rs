//! Record/encode facility.
//!
//! An encoder takes the composed surface and the mixed audio track and
//! produces an append-only stream of time-sliced chunks. Chunks and the
//! terminal error (if any) are delivered over an mpsc channel owned by the
//! recording controller, which drains it every tick.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use duet_common::error::{DuetError, DuetResult};
use duet_media_model::frame::Frame;
use duet_media_model::quality::{EncodeProfile, QualityTier};

/// Default chunk length.
pub const DEFAULT_TIMESLICE: Duration = Duration::from_millis(250);

/// One encoded time slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the session's chunk sequence, starting at 0.
    pub seq: u64,
    /// Presentation time of the first packet.
    pub start: Duration,
    /// Media time covered.
    pub duration: Duration,
    pub data: Vec<u8>,
}

/// What an encoder reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    Chunk(Chunk),
    /// Terminal failure. No further chunks follow.
    Failed(String),
}

/// Sending half of the encoder event channel.
pub type EncoderEvents = UnboundedSender<EncoderEvent>;

/// Encoder settings derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub quality: QualityTier,
    pub fps: u32,
    pub sample_rate: u32,
    pub timeslice: Duration,
}

impl EncoderConfig {
    pub fn profile(&self) -> EncodeProfile {
        self.quality.profile()
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quality: QualityTier::Standard,
            fps: 30,
            sample_rate: 48_000,
            timeslice: DEFAULT_TIMESLICE,
        }
    }
}

/// Runtime statistics from an encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderStats {
    /// Video frames accepted.
    pub frames_encoded: u64,

    /// Video frames dropped (pushed while paused or after failure).
    pub frames_dropped: u64,

    /// Audio blocks accepted.
    pub audio_blocks: u64,

    /// Chunks emitted.
    pub chunks_emitted: u64,

    /// Bytes emitted across all chunks.
    pub bytes_emitted: u64,
}

impl EncoderStats {
    /// Drop rate as a percentage.
    pub fn drop_rate(&self) -> f64 {
        let total = self.frames_encoded + self.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / total as f64 * 100.0
    }
}

/// A record/encode facility.
pub trait Encoder: Send {
    fn name(&self) -> &str;

    /// MIME type of the produced stream.
    fn mime_type(&self) -> &str;

    /// Start a new stream. Chunks and failures go to `events`.
    fn start(&mut self, config: &EncoderConfig, events: EncoderEvents) -> DuetResult<()>;

    /// Encode one composed frame at presentation time `pts`.
    fn push_video(&mut self, frame: &Frame, pts: Duration) -> DuetResult<()>;

    /// Encode one block of mixed mono audio starting at `pts`.
    fn push_audio(&mut self, samples: &[f32], pts: Duration) -> DuetResult<()>;

    fn pause(&mut self) -> DuetResult<()>;

    fn resume(&mut self) -> DuetResult<()>;

    /// Flush the final chunk and end the stream.
    fn stop(&mut self) -> DuetResult<()>;

    fn is_running(&self) -> bool;

    fn stats(&self) -> EncoderStats;
}

/// Stream header magic of [`MemoryEncoder`] output.
pub const PROXY_MAGIC: &[u8; 8] = b"DUETPRX1";

/// Linear downscale factor of the proxy video track.
pub const PROXY_DOWNSCALE: u32 = 8;

/// In-process encoder producing a framed proxy stream.
///
/// Video is stored as RGB block averages at 1/8 resolution, audio as 16-bit
/// PCM. The layout is a header followed by packets:
///
/// ```text
/// header: "DUETPRX1" | width u32 | height u32 | fps u32 | sample_rate u32
///         | video_kbps u32 | audio_kbps u32
/// packet: kind u8 ('V' | 'A') | pts_us u64 | len u32 | payload
/// ```
///
/// All integers are little-endian.
pub struct MemoryEncoder {
    config: EncoderConfig,
    events: Option<EncoderEvents>,
    running: bool,
    paused: bool,
    failed: bool,
    fail_after_packets: Option<u64>,
    packets: u64,
    pending: Vec<u8>,
    pending_start: Option<Duration>,
    last_pts: Duration,
    seq: u64,
    stats: EncoderStats,
}

impl MemoryEncoder {
    pub fn new() -> Self {
        Self {
            config: EncoderConfig::default(),
            events: None,
            running: false,
            paused: false,
            failed: false,
            fail_after_packets: None,
            packets: 0,
            pending: Vec::new(),
            pending_start: None,
            last_pts: Duration::ZERO,
            seq: 0,
            stats: EncoderStats::default(),
        }
    }

    /// Report a device failure once `packets` packets have been accepted.
    pub fn failing_after(packets: u64) -> Self {
        Self {
            fail_after_packets: Some(packets),
            ..Self::new()
        }
    }

    fn header(&self) -> Vec<u8> {
        let profile = self.config.profile();
        let mut header = Vec::with_capacity(32);
        header.extend_from_slice(PROXY_MAGIC);
        for value in [
            profile.width,
            profile.height,
            self.config.fps,
            self.config.sample_rate,
            profile.video_bitrate_kbps,
            profile.audio_bitrate_kbps,
        ] {
            header.extend_from_slice(&value.to_le_bytes());
        }
        header
    }

    /// Whether the next packet may be written. Handles injected failures.
    fn accept_packet(&mut self) -> DuetResult<bool> {
        if self.failed {
            return Err(DuetError::recording_failed("encoder has already failed"));
        }
        if !self.running || self.paused {
            return Ok(false);
        }
        if self.fail_after_packets.is_some_and(|limit| self.packets >= limit) {
            self.fail("encode device stopped responding");
            return Ok(false);
        }
        Ok(true)
    }

    fn write_packet(&mut self, kind: u8, pts: Duration, payload: &[u8]) {
        if self.pending_start.is_none() {
            self.pending_start = Some(pts);
        }
        self.pending.push(kind);
        self.pending
            .extend_from_slice(&(pts.as_micros() as u64).to_le_bytes());
        self.pending
            .extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.pending.extend_from_slice(payload);
        self.packets += 1;
        self.last_pts = self.last_pts.max(pts);
    }

    fn maybe_flush(&mut self, pts: Duration) {
        if let Some(start) = self.pending_start {
            if pts.saturating_sub(start) >= self.config.timeslice {
                self.flush(pts);
            }
        }
    }

    /// Emit everything pending as one chunk ending at `end`.
    fn flush(&mut self, end: Duration) {
        let Some(start) = self.pending_start.take() else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let chunk = Chunk {
            seq: self.seq,
            start,
            duration: end.saturating_sub(start),
            data: std::mem::take(&mut self.pending),
        };
        self.seq += 1;
        self.stats.chunks_emitted += 1;
        self.stats.bytes_emitted += chunk.data.len() as u64;
        tracing::trace!(seq = chunk.seq, bytes = chunk.data.len(), "Chunk emitted");
        if let Some(events) = &self.events {
            // A closed channel means the controller has gone away; nothing to report to.
            let _ = events.send(EncoderEvent::Chunk(chunk));
        }
    }

    fn fail(&mut self, message: &str) {
        self.failed = true;
        self.running = false;
        self.pending.clear();
        self.pending_start = None;
        tracing::warn!(encoder = "memory", error = message, "Encoder failed");
        if let Some(events) = self.events.take() {
            let _ = events.send(EncoderEvent::Failed(message.to_string()));
        }
    }
}

impl Default for MemoryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder for MemoryEncoder {
    fn name(&self) -> &str {
        "memory"
    }

    fn mime_type(&self) -> &str {
        "application/x-duet-proxy"
    }

    fn start(&mut self, config: &EncoderConfig, events: EncoderEvents) -> DuetResult<()> {
        if self.running {
            return Err(DuetError::invalid_state("encoder already running"));
        }
        self.config = *config;
        self.events = Some(events);
        self.running = true;
        self.paused = false;
        self.failed = false;
        self.packets = 0;
        self.seq = 0;
        self.last_pts = Duration::ZERO;
        self.stats = EncoderStats::default();
        self.pending = self.header();
        self.pending_start = Some(Duration::ZERO);
        tracing::debug!(quality = %config.quality, timeslice_ms = config.timeslice.as_millis() as u64, "Memory encoder started");
        Ok(())
    }

    fn push_video(&mut self, frame: &Frame, pts: Duration) -> DuetResult<()> {
        if !self.accept_packet()? {
            self.stats.frames_dropped += 1;
            return Ok(());
        }
        self.maybe_flush(pts);
        let payload = proxy_video(frame);
        self.write_packet(b'V', pts, &payload);
        self.stats.frames_encoded += 1;
        Ok(())
    }

    fn push_audio(&mut self, samples: &[f32], pts: Duration) -> DuetResult<()> {
        if !self.accept_packet()? {
            return Ok(());
        }
        let payload: Vec<u8> = samples
            .iter()
            .flat_map(|s| ((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).to_le_bytes())
            .collect();
        self.write_packet(b'A', pts, &payload);
        self.stats.audio_blocks += 1;
        Ok(())
    }

    fn pause(&mut self) -> DuetResult<()> {
        if !self.running {
            return Err(DuetError::invalid_state("encoder not running"));
        }
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> DuetResult<()> {
        if !self.running {
            return Err(DuetError::invalid_state("encoder not running"));
        }
        self.paused = false;
        Ok(())
    }

    fn stop(&mut self) -> DuetResult<()> {
        if !self.running {
            return Ok(());
        }
        let frame_time = Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
        self.flush(self.last_pts + frame_time);
        self.running = false;
        self.paused = false;
        self.events = None;
        tracing::debug!(chunks = self.stats.chunks_emitted, "Memory encoder stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn stats(&self) -> EncoderStats {
        self.stats
    }
}

/// RGB block averages of `frame` at 1/[`PROXY_DOWNSCALE`] resolution.
fn proxy_video(frame: &Frame) -> Vec<u8> {
    let (w, h) = frame.dimensions();
    let pw = w.div_ceil(PROXY_DOWNSCALE);
    let ph = h.div_ceil(PROXY_DOWNSCALE);
    let mut out = Vec::with_capacity(8 + (pw * ph * 3) as usize);
    out.extend_from_slice(&pw.to_le_bytes());
    out.extend_from_slice(&ph.to_le_bytes());

    let data = frame.data();
    let stride = w as usize * Frame::BPP;
    for by in 0..ph {
        for bx in 0..pw {
            let (x0, y0) = (bx * PROXY_DOWNSCALE, by * PROXY_DOWNSCALE);
            let x1 = (x0 + PROXY_DOWNSCALE).min(w);
            let y1 = (y0 + PROXY_DOWNSCALE).min(h);
            let mut sum = [0u32; 3];
            for y in y0..y1 {
                let row = y as usize * stride;
                for x in x0..x1 {
                    let i = row + x as usize * Frame::BPP;
                    sum[0] += data[i] as u32;
                    sum[1] += data[i + 1] as u32;
                    sum[2] += data[i + 2] as u32;
                }
            }
            let n = ((x1 - x0) * (y1 - y0)).max(1);
            out.extend(sum.iter().map(|s| (s / n) as u8));
        }
    }
    out
}

#[cfg(feature = "gstreamer")]
pub use gst_encoder::GstEncoder;

#[cfg(feature = "gstreamer")]
mod gst_encoder {
    use std::sync::OnceLock;
    use std::time::Duration;

    use gst::prelude::*;
    use gstreamer as gst;

    use duet_common::error::{DuetError, DuetResult};
    use duet_media_model::frame::Frame;

    use super::{Chunk, Encoder, EncoderConfig, EncoderEvent, EncoderEvents, EncoderStats};

    /// H.264 + Opus in Matroska, built from a GStreamer launch line.
    ///
    /// Frames enter through `appsrc` elements and encoded bytes are pulled
    /// from an `appsink` without blocking, then cut into time slices.
    pub struct GstEncoder {
        pipeline: Option<gst::Pipeline>,
        video_src: Option<gst::Element>,
        audio_src: Option<gst::Element>,
        sink: Option<gst::Element>,
        events: Option<EncoderEvents>,
        config: EncoderConfig,
        pending: Vec<u8>,
        pending_start: Option<Duration>,
        last_pts: Duration,
        seq: u64,
        paused: bool,
        stats: EncoderStats,
    }

    impl GstEncoder {
        pub fn new() -> Self {
            Self {
                pipeline: None,
                video_src: None,
                audio_src: None,
                sink: None,
                events: None,
                config: EncoderConfig::default(),
                pending: Vec::new(),
                pending_start: None,
                last_pts: Duration::ZERO,
                seq: 0,
                paused: false,
                stats: EncoderStats::default(),
            }
        }

        fn launch_line(config: &EncoderConfig) -> String {
            let profile = config.profile();
            let fps = config.fps.max(1);
            let keyint = fps.saturating_mul(2).max(2);
            format!(
                "appsrc name=video format=time is-live=true do-timestamp=false \
                 caps=video/x-raw,format=RGBA,width={w},height={h},framerate={fps}/1 \
                 ! queue max-size-buffers=8 ! videoconvert \
                 ! x264enc tune=zerolatency speed-preset=veryfast bitrate={vb} key-int-max={keyint} \
                 ! h264parse ! queue ! mux. \
                 appsrc name=audio format=time is-live=true do-timestamp=false \
                 caps=audio/x-raw,format=F32LE,layout=interleaved,channels=1,rate={rate} \
                 ! audioconvert ! audioresample ! opusenc bitrate={ab} ! queue ! mux. \
                 matroskamux name=mux streamable=true ! appsink name=sink sync=false",
                w = profile.width,
                h = profile.height,
                vb = profile.video_bitrate_kbps,
                ab = profile.audio_bitrate_kbps * 1000,
                rate = config.sample_rate,
            )
        }

        fn element(pipeline: &gst::Pipeline, name: &str) -> DuetResult<gst::Element> {
            pipeline.by_name(name).ok_or_else(|| {
                DuetError::recording_failed(format!("encoder pipeline has no '{name}' element"))
            })
        }

        fn push_buffer(src: &gst::Element, bytes: Vec<u8>, pts: Duration, duration: Duration) -> DuetResult<()> {
            let mut buffer = gst::Buffer::from_mut_slice(bytes);
            if let Some(buffer) = buffer.get_mut() {
                buffer.set_pts(gst::ClockTime::from_nseconds(pts.as_nanos() as u64));
                buffer.set_duration(gst::ClockTime::from_nseconds(duration.as_nanos() as u64));
            }
            let flow = src.emit_by_name::<gst::FlowReturn>("push-buffer", &[&buffer]);
            if flow != gst::FlowReturn::Ok {
                return Err(DuetError::recording_failed(format!("appsrc refused buffer: {flow:?}")));
            }
            Ok(())
        }

        /// Pull whatever the muxer has produced so far and cut chunks.
        fn drain_sink(&mut self, pts: Duration) {
            let Some(sink) = self.sink.clone() else {
                return;
            };
            while let Some(sample) = sink.emit_by_name::<Option<gst::Sample>>("try-pull-sample", &[&0u64]) {
                let Some(buffer) = sample.buffer() else {
                    continue;
                };
                if let Ok(map) = buffer.map_readable() {
                    if self.pending_start.is_none() {
                        self.pending_start = Some(pts);
                    }
                    self.pending.extend_from_slice(map.as_slice());
                }
            }
            if let Some(start) = self.pending_start {
                if pts.saturating_sub(start) >= self.config.timeslice {
                    self.flush(pts);
                }
            }
        }

        fn flush(&mut self, end: Duration) {
            let Some(start) = self.pending_start.take() else {
                return;
            };
            if self.pending.is_empty() {
                return;
            }
            let chunk = Chunk {
                seq: self.seq,
                start,
                duration: end.saturating_sub(start),
                data: std::mem::take(&mut self.pending),
            };
            self.seq += 1;
            self.stats.chunks_emitted += 1;
            self.stats.bytes_emitted += chunk.data.len() as u64;
            if let Some(events) = &self.events {
                let _ = events.send(EncoderEvent::Chunk(chunk));
            }
        }

        /// Surface bus errors as a terminal encoder failure.
        fn check_bus(&mut self) -> DuetResult<()> {
            let Some(bus) = self.pipeline.as_ref().and_then(|p| p.bus()) else {
                return Ok(());
            };
            while let Some(msg) = bus.pop() {
                if let gst::MessageView::Error(e) = msg.view() {
                    let message = e.error().to_string();
                    tracing::warn!(encoder = "gstreamer", error = %message, "Encoder pipeline error");
                    if let Some(events) = self.events.take() {
                        let _ = events.send(EncoderEvent::Failed(message.clone()));
                    }
                    self.teardown();
                    return Err(DuetError::recording_failed(message));
                }
            }
            Ok(())
        }

        fn teardown(&mut self) {
            if let Some(pipeline) = self.pipeline.take() {
                let _ = pipeline.set_state(gst::State::Null);
            }
            self.video_src = None;
            self.audio_src = None;
            self.sink = None;
        }
    }

    impl Default for GstEncoder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Encoder for GstEncoder {
        fn name(&self) -> &str {
            "gstreamer"
        }

        fn mime_type(&self) -> &str {
            "video/x-matroska"
        }

        fn start(&mut self, config: &EncoderConfig, events: EncoderEvents) -> DuetResult<()> {
            if self.pipeline.is_some() {
                return Err(DuetError::invalid_state("encoder already running"));
            }
            init_gstreamer()?;

            let launch = Self::launch_line(config);
            let element = gst::parse::launch(&launch).map_err(|e| {
                DuetError::recording_failed(format!("Failed to build encoder pipeline: {e}"))
            })?;
            let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
                DuetError::recording_failed("Launch string did not produce a pipeline")
            })?;

            self.video_src = Some(Self::element(&pipeline, "video")?);
            self.audio_src = Some(Self::element(&pipeline, "audio")?);
            self.sink = Some(Self::element(&pipeline, "sink")?);

            pipeline.set_state(gst::State::Playing).map_err(|e| {
                DuetError::recording_failed(format!("Failed to start encoder pipeline: {e:?}"))
            })?;

            self.config = *config;
            self.events = Some(events);
            self.pipeline = Some(pipeline);
            self.pending.clear();
            self.pending_start = None;
            self.last_pts = Duration::ZERO;
            self.seq = 0;
            self.paused = false;
            self.stats = EncoderStats::default();
            tracing::info!(quality = %config.quality, "GStreamer encoder started");
            Ok(())
        }

        fn push_video(&mut self, frame: &Frame, pts: Duration) -> DuetResult<()> {
            self.check_bus()?;
            let Some(src) = self.video_src.clone() else {
                self.stats.frames_dropped += 1;
                return Ok(());
            };
            if self.paused {
                self.stats.frames_dropped += 1;
                return Ok(());
            }
            let frame_time = Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
            Self::push_buffer(&src, frame.data().to_vec(), pts, frame_time)?;
            self.stats.frames_encoded += 1;
            self.last_pts = self.last_pts.max(pts);
            self.drain_sink(pts);
            Ok(())
        }

        fn push_audio(&mut self, samples: &[f32], pts: Duration) -> DuetResult<()> {
            let Some(src) = self.audio_src.clone() else {
                return Ok(());
            };
            if self.paused {
                return Ok(());
            }
            let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
            let duration = Duration::from_secs_f64(samples.len() as f64 / self.config.sample_rate.max(1) as f64);
            Self::push_buffer(&src, bytes, pts, duration)?;
            self.stats.audio_blocks += 1;
            Ok(())
        }

        fn pause(&mut self) -> DuetResult<()> {
            self.paused = true;
            Ok(())
        }

        fn resume(&mut self) -> DuetResult<()> {
            self.paused = false;
            Ok(())
        }

        fn stop(&mut self) -> DuetResult<()> {
            let Some(pipeline) = self.pipeline.clone() else {
                return Ok(());
            };
            for src in [&self.video_src, &self.audio_src].into_iter().flatten() {
                let _ = src.emit_by_name::<gst::FlowReturn>("end-of-stream", &[]);
            }

            // Wait for EOS so the muxer writes its tail before the last chunk is cut.
            if let Some(bus) = pipeline.bus() {
                let deadline = std::time::Instant::now() + Duration::from_secs(10);
                loop {
                    let remaining = deadline.saturating_duration_since(std::time::Instant::now());
                    if remaining.is_zero() {
                        tracing::warn!(encoder = "gstreamer", "EOS drain timed out after 10s");
                        break;
                    }
                    let timeout = gst::ClockTime::from_nseconds(remaining.as_nanos() as u64);
                    match bus.timed_pop(timeout) {
                        Some(msg) => match msg.view() {
                            gst::MessageView::Eos(_) => break,
                            gst::MessageView::Error(e) => {
                                tracing::warn!(encoder = "gstreamer", error = %e.error(), "Pipeline error during EOS drain");
                                break;
                            }
                            _ => {}
                        },
                        None => break,
                    }
                }
            }

            let end = self.last_pts + Duration::from_secs_f64(1.0 / self.config.fps.max(1) as f64);
            self.drain_sink(end);
            self.flush(end);
            self.teardown();
            self.events = None;
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.pipeline.is_some()
        }

        fn stats(&self) -> EncoderStats {
            self.stats
        }
    }

    fn init_gstreamer() -> DuetResult<()> {
        static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
        match GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string())) {
            Ok(()) => Ok(()),
            Err(e) => Err(DuetError::recording_failed(format!(
                "Failed to initialize GStreamer: {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn config(timeslice_ms: u64) -> EncoderConfig {
        EncoderConfig {
            quality: QualityTier::Low,
            fps: 10,
            sample_rate: 1000,
            timeslice: Duration::from_millis(timeslice_ms),
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EncoderEvent>) -> Vec<EncoderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn chunks_are_time_sliced_and_ordered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut encoder = MemoryEncoder::new();
        encoder.start(&config(250), tx).unwrap();
        let frame = Frame::new(16, 16);
        for i in 0..10u64 {
            let pts = Duration::from_millis(i * 100);
            encoder.push_video(&frame, pts).unwrap();
            encoder.push_audio(&[0.25; 100], pts).unwrap();
        }
        encoder.stop().unwrap();

        let chunks: Vec<Chunk> = drain(&mut rx)
            .into_iter()
            .map(|e| match e {
                EncoderEvent::Chunk(c) => c,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert!(chunks.len() >= 3, "got {} chunks", chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i as u64);
        }
        assert!(chunks[0].data.starts_with(PROXY_MAGIC));
        let covered: Duration = chunks.iter().map(|c| c.duration).sum();
        assert_eq!(covered, Duration::from_secs(1));
        assert_eq!(encoder.stats().frames_encoded, 10);
        assert_eq!(encoder.stats().chunks_emitted, chunks.len() as u64);
    }

    #[test]
    fn paused_encoder_drops_frames() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut encoder = MemoryEncoder::new();
        encoder.start(&config(250), tx).unwrap();
        encoder.pause().unwrap();
        encoder.push_video(&Frame::new(4, 4), Duration::ZERO).unwrap();
        encoder.resume().unwrap();
        encoder
            .push_video(&Frame::new(4, 4), Duration::from_millis(100))
            .unwrap();
        assert_eq!(encoder.stats().frames_dropped, 1);
        assert_eq!(encoder.stats().frames_encoded, 1);
        assert!((encoder.stats().drop_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn injected_failure_is_reported_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut encoder = MemoryEncoder::failing_after(3);
        encoder.start(&config(10_000), tx).unwrap();
        for i in 0..3u64 {
            encoder
                .push_video(&Frame::new(4, 4), Duration::from_millis(i * 100))
                .unwrap();
        }
        encoder
            .push_video(&Frame::new(4, 4), Duration::from_millis(300))
            .unwrap();
        assert!(encoder
            .push_video(&Frame::new(4, 4), Duration::from_millis(400))
            .is_err());
        assert!(!encoder.is_running());

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], EncoderEvent::Failed(_)));
    }

    #[test]
    fn proxy_video_averages_blocks() {
        let frame = Frame::filled(10, 3, duet_media_model::frame::Rgba::rgb(10, 20, 30));
        let proxy = proxy_video(&frame);
        assert_eq!(&proxy[..4], &2u32.to_le_bytes());
        assert_eq!(&proxy[4..8], &1u32.to_le_bytes());
        assert_eq!(&proxy[8..], &[10, 20, 30, 10, 20, 30]);
    }

    #[test]
    fn double_start_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut encoder = MemoryEncoder::new();
        encoder.start(&config(250), tx.clone()).unwrap();
        assert!(encoder.start(&config(250), tx).is_err());
    }
}
