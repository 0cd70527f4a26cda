//! List output quality tiers.

use duet_media_model::quality::QualityTier;

pub fn run() -> anyhow::Result<()> {
    println!("{:<10} {:>11} {:>12} {:>12}", "TIER", "RESOLUTION", "VIDEO", "AUDIO");
    for tier in QualityTier::ALL {
        let profile = tier.profile();
        println!(
            "{:<10} {:>11} {:>9}kbps {:>9}kbps",
            tier.as_str(),
            format!("{}x{}", profile.width, profile.height),
            profile.video_bitrate_kbps,
            profile.audio_bitrate_kbps
        );
    }
    Ok(())
}
