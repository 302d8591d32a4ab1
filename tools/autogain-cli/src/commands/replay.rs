//! Replay a recorded sample log through the controller.

use std::collections::BTreeSet;
use std::path::PathBuf;

use autogain_common::config::AppConfig;
use autogain_gain_core::{LearningOutcome, SessionRegistry};
use autogain_profile_model::{
    parse_samples, CurveStore, FileCurveStore, MemoryCurveStore, MotionSample,
};

use super::open_store;

pub fn run(
    mut config: AppConfig,
    log: PathBuf,
    no_learning: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(&log)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", log.display()))?;
    let samples = parse_samples(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {e}", log.display()))?;
    println!("Replaying {} samples from {}", samples.len(), log.display());

    if no_learning {
        config.learning.enabled = false;
    }

    let store = open_store(&config);
    if dry_run {
        let seeded = seed_from_disk(&store, &samples)?;
        replay(SessionRegistry::new(seeded, config)?, &samples)
    } else {
        replay(SessionRegistry::new(store, config)?, &samples)
    }
}

/// In-memory store holding the saved profile of every device in `samples`,
/// so a dry run starts from the same curves as a real one.
fn seed_from_disk(
    store: &FileCurveStore,
    samples: &[MotionSample],
) -> anyhow::Result<MemoryCurveStore> {
    let seeded = MemoryCurveStore::new();
    let devices: BTreeSet<&str> = samples.iter().map(|s| s.source_id.as_str()).collect();
    for device in devices {
        let profile = store
            .load_latest(device)
            .map_err(|e| anyhow::anyhow!("Failed to load profile for {device}: {e}"))?;
        if let Some(profile) = profile {
            seeded
                .save(&profile)
                .map_err(|e| anyhow::anyhow!("Failed to stage profile for {device}: {e}"))?;
        }
    }
    Ok(seeded)
}

fn replay<S: CurveStore>(
    mut registry: SessionRegistry<S>,
    samples: &[MotionSample],
) -> anyhow::Result<()> {
    let mut clicks = 0;
    let mut applied = 0;

    for sample in samples {
        registry.tick(sample.timestamp_us);
        let (_, outcome) = registry.process(sample);
        let Some(outcome) = outcome else {
            continue;
        };
        clicks += 1;
        match outcome {
            LearningOutcome::Skipped(reason) => {
                println!("  t={}us {}: skipped ({reason})", sample.timestamp_us, sample.source_id);
            }
            LearningOutcome::Applied(report) => {
                applied += 1;
                println!(
                    "  t={}us {}: {} submovements, {} scored, {} bins changed, aim {:.4}",
                    sample.timestamp_us,
                    sample.source_id,
                    report.submovements,
                    report.scored,
                    report.changed_bins,
                    report.aim_point
                );
            }
        }
    }

    println!();
    println!("Clicks: {clicks} ({applied} learned)");
    for status in registry.statuses() {
        println!("  {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use autogain_profile_model::DeviceProfile;

    #[test]
    fn test_dry_run_starts_from_saved_profiles() {
        let dir = std::env::temp_dir().join(format!("autogain_replay_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let store = FileCurveStore::new(&dir);
        let saved = DeviceProfile::new("dev", 1000.0, 1600.0, 109.0, 1.0);
        store.save(&saved).unwrap();

        let samples = vec![
            MotionSample::motion("dev", 8_000, 40, 0, 1.0),
            MotionSample::motion("fresh", 8_000, 40, 0, 8.0),
        ];
        let seeded = seed_from_disk(&store, &samples).unwrap();
        assert_eq!(seeded.load_latest("dev").unwrap(), Some(saved));
        assert_eq!(seeded.load_latest("fresh").unwrap(), None);

        let mut registry = SessionRegistry::new(seeded, AppConfig::default()).unwrap();
        registry.process(&samples[0]);
        let status = &registry.statuses()[0];
        assert_eq!(status.cpi, 1600.0);
        assert_eq!(status.polling_rate_hz, 1000.0);

        // Nothing reached the disk beyond the original snapshot.
        assert_eq!(store.snapshots("dev").unwrap().len(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
