//! Print a device's gain curve for charting.

use autogain_common::config::AppConfig;
use autogain_profile_model::GainCurve;
use serde::Serialize;

use super::{load_profile, open_store};

#[derive(Serialize)]
struct CurveRow {
    bin: usize,
    speed_m_s: f64,
    gain: f64,
}

pub fn run(config: &AppConfig, device: String, json: bool) -> anyhow::Result<()> {
    let profile = load_profile(&open_store(config), &device)?;
    let rows: Vec<CurveRow> = profile
        .curve
        .values()
        .iter()
        .enumerate()
        .map(|(bin, &gain)| CurveRow {
            bin,
            speed_m_s: GainCurve::bin_speed(bin),
            gain,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("bin,speed_m_s,gain");
    for row in rows {
        println!("{},{:.3},{}", row.bin, row.speed_m_s, row.gain);
    }
    Ok(())
}
