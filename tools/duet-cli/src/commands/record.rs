//! Record a headless session from the synthetic camera.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use duet_capture_engine::backend::default_facility;
use duet_capture_engine::{
    ArtifactReceipt, CaptureAcquisition, DownloadSink, Encoder, MemoryEncoder, RecordingConfig,
    RecordingState, ReferenceClip, Studio, StudioConfig,
};
use duet_common::config::AppConfig;
use duet_common::error::DuetError;
use duet_effects::Entitlements;
use duet_media_model::anchor::{AnchorFrame, FixedAnchor};
use duet_media_model::effect::EffectDescriptor;
use duet_media_model::geometry::Rect;
use duet_media_model::layout::LayoutMode;

const DEFAULT_INTENSITY: u8 = 70;

pub struct RecordArgs {
    pub layout: String,
    pub duration: Option<f64>,
    pub quality: Option<String>,
    pub effects: Vec<String>,
    pub premium: bool,
    pub anchor: bool,
    pub encoder: String,
    pub realtime: bool,
    pub output: Option<PathBuf>,
}

pub async fn run(args: RecordArgs) -> anyhow::Result<()> {
    let app = AppConfig::load();
    let layout: LayoutMode = args.layout.parse()?;

    let mut recording = RecordingConfig::from_defaults(&app.recording)?;
    if let Some(secs) = args.duration {
        anyhow::ensure!(secs.is_finite() && secs > 0.0, "duration must be positive");
        let max = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("duration {secs}s is out of range"))?;
        recording = recording.with_max_duration(max);
    }
    if let Some(quality) = &args.quality {
        recording = recording.with_quality(quality.parse()?);
    }

    let mut config = StudioConfig::new(layout, recording);
    config.constraints.mirror = app.recording.mirror_camera;
    config.entitlements = if args.premium {
        Entitlements::premium()
    } else {
        Entitlements::free()
    };

    let (width, height) = config.output_size();
    tracing::debug!(layout = %layout, effects = ?args.effects, realtime = args.realtime, "Record command");
    println!("Recording {layout} session");
    println!("  Quality: {} ({width}x{height})", recording.quality);
    println!("  Max duration: {:.1}s", recording.max_duration.as_secs_f64());
    println!("  Encoder: {}", args.encoder);
    println!();

    let clip = layout.uses_reference_clip().then(|| {
        ReferenceClip::synthetic(
            "reference",
            width,
            height,
            recording.fps,
            recording.max_duration + Duration::from_secs(1),
            recording.sample_rate,
        )
    });

    let acquisition = CaptureAcquisition::new(Arc::from(default_facility()));
    let encoder = build_encoder(&args.encoder)?;
    let mut studio = match Studio::open(&acquisition, config, clip, encoder).await {
        Ok(studio) => studio,
        Err(e) if e.is_user_recoverable() => {
            anyhow::bail!("{}", e.notice());
        }
        Err(e) => return Err(e.into()),
    };

    if args.anchor {
        let face = Rect::new(0.35, 0.2, 0.3, 0.45);
        studio.set_anchor_provider(Box::new(FixedAnchor(AnchorFrame::from_face_box(face))));
    }

    for arg in &args.effects {
        let descriptor = parse_effect(arg)?;
        match studio.activate_effect(descriptor) {
            Ok(true) => println!("  Effect: {arg}"),
            Ok(false) => println!("  Effect {arg} already active"),
            Err(e @ DuetError::NotEntitled { .. }) => println!("  [SKIP] {}", e.notice()),
            Err(e) => return Err(e.into()),
        }
    }

    let tick = recording.tick_interval();
    let max_ticks = ((recording.max_duration.as_secs_f64() * recording.fps as f64).ceil() as u64)
        .saturating_add(u64::from(recording.fps));

    let mut now = Duration::ZERO;
    if args.realtime {
        studio.start_recording(studio.host_now())?;
        println!("Recording... press Ctrl+C to stop early");
        let interrupted = tokio::select! {
            result = studio.run(max_ticks) => {
                result?;
                false
            }
            _ = tokio::signal::ctrl_c() => true,
        };
        if interrupted {
            println!();
            println!("Stopping early");
        }
    } else {
        studio.start_recording(Duration::ZERO)?;
        for k in 1..=max_ticks {
            now = tick_time(tick, k);
            let report = studio.tick(now)?;
            if report.state != RecordingState::Recording {
                break;
            }
        }
    }

    if matches!(studio.state(), RecordingState::Recording | RecordingState::Paused) {
        if args.realtime {
            now = studio.host_now();
        }
        studio.stop_recording(now)?;
    }

    let Some(artifact) = studio.controller().artifact().cloned() else {
        let reason = studio.controller().failure().unwrap_or("no artifact produced");
        anyhow::bail!("Recording failed: {reason}");
    };

    let stats = studio.render_stats();
    let encoder_stats = studio.controller().encoder_stats();
    println!();
    println!("Recorded {}", artifact.meta().duration_label());
    println!("  Session: {}", artifact.meta().session_id);
    println!("  Bytes: {}", artifact.meta().byte_len);
    println!("  Chunks: {}", artifact.meta().chunk_count);
    println!(
        "  Ticks: {} ({} composed, {} reused)",
        stats.ticks, stats.composed, stats.reused
    );
    println!("  Encoder drop rate: {:.1}%", encoder_stats.drop_rate());

    let dir = args.output.unwrap_or(app.output_dir);
    let receipt = studio
        .accept_into(&DownloadSink::new(&dir))
        .await
        .with_context(|| format!("Failed to save artifact to {}", dir.display()))?;
    if let ArtifactReceipt::Downloaded { path, .. } = receipt {
        println!("Saved to: {}", path.display());
    }

    studio.close();
    Ok(())
}

/// Host time of simulated tick `k`, saturating instead of wrapping.
fn tick_time(tick: Duration, k: u64) -> Duration {
    let nanos = u64::try_from(tick.as_nanos()).unwrap_or(u64::MAX);
    Duration::from_nanos(nanos.saturating_mul(k))
}

/// Parse `id` or `id:intensity`.
fn parse_effect(arg: &str) -> anyhow::Result<EffectDescriptor> {
    let (id, intensity) = match arg.split_once(':') {
        Some((id, value)) => {
            let intensity: u8 = value
                .parse()
                .with_context(|| format!("invalid intensity in '{arg}'"))?;
            (id, intensity)
        }
        None => (arg, DEFAULT_INTENSITY),
    };
    anyhow::ensure!(!id.is_empty(), "empty effect id in '{arg}'");
    Ok(EffectDescriptor::new(id, intensity))
}

fn build_encoder(name: &str) -> anyhow::Result<Box<dyn Encoder>> {
    match name {
        "memory" => Ok(Box::new(MemoryEncoder::new())),
        #[cfg(feature = "gstreamer")]
        "gstreamer" => Ok(Box::new(duet_capture_engine::GstEncoder::new())),
        #[cfg(not(feature = "gstreamer"))]
        "gstreamer" => anyhow::bail!("this build has no GStreamer support (enable the `gstreamer` feature)"),
        other => anyhow::bail!("unknown encoder '{other}' (expected memory or gstreamer)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_args_parse_with_optional_intensity() {
        let blur = parse_effect("blur:40").unwrap();
        assert_eq!(blur.id, "blur");
        assert_eq!(blur.intensity, 40);
        assert_eq!(parse_effect("sepia").unwrap().intensity, DEFAULT_INTENSITY);
        assert!(parse_effect("blur:loud").is_err());
        assert!(parse_effect(":10").is_err());
    }

    #[test]
    fn tick_time_does_not_wrap_past_u32_ticks() {
        let tick = Duration::from_nanos(33_333_333);
        assert_eq!(tick_time(tick, 30), Duration::from_nanos(999_999_990));
        let far = u64::from(u32::MAX) + 10;
        assert_eq!(tick_time(tick, far), Duration::from_nanos(33_333_333 * far));
        assert!(tick_time(tick, far) > tick_time(tick, u64::from(u32::MAX)));
        assert_eq!(tick_time(tick, u64::MAX), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn unknown_encoder_is_rejected() {
        assert!(build_encoder("memory").is_ok());
        assert!(build_encoder("vhs").is_err());
    }
}
