//! Show a device profile.

use autogain_common::config::AppConfig;
use autogain_profile_model::{GainCurve, BIN_SIZE};

use super::{load_profile, open_store};

pub fn run(config: &AppConfig, device: String) -> anyhow::Result<()> {
    let store = open_store(config);
    let profile = load_profile(&store, &device)?;
    let snapshots = store
        .snapshots(&device)
        .map_err(|e| anyhow::anyhow!("Failed to list snapshots: {e}"))?;

    println!("Device: {}", profile.device_id);
    println!("  Polling rate: {} Hz", profile.polling_rate_hz);
    println!("  CPI: {}", profile.cpi);
    println!("  PPI: {}", profile.ppi);
    println!();

    let gains = &profile.curve.values()[1..];
    let min = gains.iter().copied().fold(f64::INFINITY, f64::min);
    let max = gains.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = gains.iter().sum::<f64>() / gains.len() as f64;
    println!("Curve:");
    println!(
        "  Bins: {} x {} m/s (up to {:.3} m/s)",
        profile.curve.len(),
        BIN_SIZE,
        GainCurve::bin_speed(profile.curve.len() - 1)
    );
    println!("  Gain: min {min:.4}, mean {mean:.4}, max {max:.4}");
    println!();

    println!("Snapshots: {}", snapshots.len());
    if let Some(latest) = snapshots.last() {
        println!("  Latest: {}", latest.display());
    }

    Ok(())
}
