//! Check the capture and encode environment.

use std::sync::Arc;

use duet_capture_engine::backend::default_facility;
use duet_capture_engine::{CaptureAcquisition, SourceStream};
use duet_common::config::AppConfig;
use duet_media_model::source::CaptureConstraints;

pub async fn run() -> anyhow::Result<()> {
    println!("Duet System Check");
    println!("{}", "=".repeat(50));

    let mut ok = true;
    let acquisition = CaptureAcquisition::new(Arc::from(default_facility()));
    match acquisition.acquire(CaptureConstraints::default()).await {
        Ok(mut lease) => {
            let info = lease.info().clone();
            let has_frame = lease.latest_frame().is_some();
            println!(
                "[OK] Capture facility '{}': {}x{} @ {}fps, audio: {}",
                acquisition.facility_name(),
                info.width,
                info.height,
                info.fps,
                info.has_audio
            );
            if !has_frame {
                println!("[WARN] Camera granted but produced no frame yet");
            }
            lease.release();
        }
        Err(e) => {
            ok = false;
            println!("[FAIL] Capture facility '{}': {e}", acquisition.facility_name());
            println!("       {}", e.notice());
        }
    }

    if cfg!(feature = "gstreamer") {
        println!("[OK] GStreamer encoder compiled in");
    } else {
        println!("[INFO] GStreamer encoder not compiled in; using the in-memory encoder");
    }

    let config_path = AppConfig::path();
    if config_path.exists() {
        println!("[OK] Config: {}", config_path.display());
    } else {
        println!("[INFO] Config: defaults ({} not found)", config_path.display());
    }

    let app = AppConfig::load();
    match std::fs::create_dir_all(&app.output_dir) {
        Ok(()) => println!("[OK] Output directory: {}", app.output_dir.display()),
        Err(e) => {
            ok = false;
            println!("[FAIL] Output directory {}: {e}", app.output_dir.display());
        }
    }

    println!();
    if ok {
        println!("Everything needed to record is available.");
    } else {
        println!("Some checks failed. See above for fixes.");
    }
    Ok(())
}
