pub mod curve;
pub mod info;
pub mod init;
pub mod replay;

use autogain_common::config::AppConfig;
use autogain_profile_model::{CurveStore, DeviceProfile, FileCurveStore};

/// File store rooted at the configured profiles directory.
pub fn open_store(config: &AppConfig) -> FileCurveStore {
    FileCurveStore::new(&config.profiles_dir)
}

/// Load the newest profile for `device`, failing when there is none.
pub fn load_profile(store: &FileCurveStore, device: &str) -> anyhow::Result<DeviceProfile> {
    store
        .load_latest(device)
        .map_err(|e| anyhow::anyhow!("Failed to load profile for {device}: {e}"))?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No profile for {device} under {} (run `autogain init {device}`)",
                store.root().display()
            )
        })
}
