//! Create a default profile for a device.

use autogain_common::config::{AppConfig, DeviceDefaults};
use autogain_profile_model::{CurveStore, DeviceProfile};

use super::open_store;

pub fn run(
    config: &AppConfig,
    device: String,
    cpi: Option<f64>,
    ppi: Option<f64>,
    rate: Option<f64>,
    gain: Option<f64>,
    force: bool,
) -> anyhow::Result<()> {
    let defaults = &config.device_defaults;
    let params = DeviceDefaults {
        cpi: cpi.unwrap_or(defaults.cpi),
        ppi: ppi.unwrap_or(defaults.ppi),
        polling_rate_hz: rate.unwrap_or(defaults.polling_rate_hz),
        default_gain: gain.unwrap_or(defaults.default_gain),
    };
    params
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid profile parameters: {e}"))?;

    let store = open_store(config);
    let existing = store
        .load_latest(&device)
        .map_err(|e| anyhow::anyhow!("Failed to read existing profile: {e}"))?;
    if existing.is_some() && !force {
        anyhow::bail!("A profile for {device} already exists (use --force to replace it)");
    }

    let profile = DeviceProfile::new(
        &device,
        params.polling_rate_hz,
        params.cpi,
        params.ppi,
        params.default_gain,
    );
    store
        .save(&profile)
        .map_err(|e| anyhow::anyhow!("Failed to save profile: {e}"))?;

    println!("Created profile for {device}:");
    println!("  Directory: {}", store.device_dir(&device).display());
    println!("  Polling rate: {} Hz", profile.polling_rate_hz);
    println!("  CPI: {}", profile.cpi);
    println!("  PPI: {}", profile.ppi);
    println!("  Gain: {} (flat, {} bins)", params.default_gain, profile.curve.len());

    Ok(())
}
