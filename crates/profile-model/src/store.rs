//! Profile persistence.
//!
//! The controller only sees the [`CurveStore`] trait. [`FileCurveStore`]
//! keeps one directory per device under a root directory, writing a new
//! `yyyyMMdd_HHmmss.csv` snapshot (UTC) on every save; the lexicographically
//! greatest file name is the current profile. A save always sorts after the
//! existing snapshots, so a corrupt or future-stamped file cannot shadow it. [`MemoryCurveStore`] keeps
//! snapshots in memory for tests and embedding hosts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use autogain_common::clock::{snapshot_stamp, stamp_after};

use crate::profile::{DeviceProfile, ProfileError};

/// File extension of profile snapshots.
pub const SNAPSHOT_EXTENSION: &str = "csv";

/// Storage collaborator for device profiles.
pub trait CurveStore {
    /// Persist the profile as the newest snapshot for its device.
    fn save(&self, profile: &DeviceProfile) -> Result<(), ProfileError>;

    /// Load the newest snapshot for `device_id`.
    ///
    /// Returns `Ok(None)` when no snapshot exists or the newest one is
    /// corrupt; `Err` is reserved for storage failures.
    fn load_latest(&self, device_id: &str) -> Result<Option<DeviceProfile>, ProfileError>;
}

/// Directory-per-device store of timestamped text snapshots.
#[derive(Debug, Clone)]
pub struct FileCurveStore {
    root: PathBuf,
}

impl FileCurveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding snapshots for `device_id`.
    pub fn device_dir(&self, device_id: &str) -> PathBuf {
        self.root.join(sanitize_device_id(device_id))
    }

    /// Write a snapshot under an explicit stamp and return its path.
    pub fn save_at(&self, profile: &DeviceProfile, stamp: &str) -> Result<PathBuf, ProfileError> {
        let dir = self.device_dir(&profile.device_id);
        std::fs::create_dir_all(&dir).map_err(|e| ProfileError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let path = dir.join(format!("{stamp}.{SNAPSHOT_EXTENSION}"));
        std::fs::write(&path, profile.to_text()).map_err(|e| ProfileError::Io {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(device = %profile.device_id, path = %path.display(), "Profile saved");
        Ok(path)
    }

    /// Stamp for a save at `now`: `now` itself, or the stamp just after the
    /// newest snapshot when that one sorts after `now`.
    pub fn next_stamp(&self, device_id: &str, now: &str) -> Result<String, ProfileError> {
        let newest = self
            .snapshots(device_id)?
            .pop()
            .and_then(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string));

        match newest {
            Some(newest) if newest.as_str() > now => {
                let stamp = stamp_after(&newest).unwrap_or_else(|| format!("{newest}_{now}"));
                tracing::warn!(
                    device = device_id,
                    newest = %newest,
                    stamp = %stamp,
                    "Newest snapshot is stamped ahead of the clock; saving after it"
                );
                Ok(stamp)
            }
            _ => Ok(now.to_string()),
        }
    }

    /// Snapshot paths for `device_id`, oldest first.
    pub fn snapshots(&self, device_id: &str) -> Result<Vec<PathBuf>, ProfileError> {
        let dir = self.device_dir(device_id);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ProfileError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let mut paths = vec![];
        for entry in entries {
            let entry = entry.map_err(|e| ProfileError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some(SNAPSHOT_EXTENSION)
            {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }
}

impl CurveStore for FileCurveStore {
    fn save(&self, profile: &DeviceProfile) -> Result<(), ProfileError> {
        let now = snapshot_stamp(&chrono::Utc::now());
        let stamp = self.next_stamp(&profile.device_id, &now)?;
        self.save_at(profile, &stamp).map(|_| ())
    }

    fn load_latest(&self, device_id: &str) -> Result<Option<DeviceProfile>, ProfileError> {
        let Some(path) = self.snapshots(device_id)?.pop() else {
            return Ok(None);
        };

        let text = std::fs::read_to_string(&path).map_err(|e| ProfileError::Io {
            path: path.clone(),
            source: e,
        })?;

        match DeviceProfile::from_text(&text) {
            Ok(profile) if profile.device_id == device_id => Ok(Some(profile)),
            Ok(profile) => {
                tracing::warn!(
                    path = %path.display(),
                    expected = device_id,
                    found = %profile.device_id,
                    "Profile snapshot belongs to another device; ignoring"
                );
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt profile snapshot; ignoring");
                Ok(None)
            }
        }
    }
}

/// In-memory store keeping every saved snapshot.
#[derive(Debug, Default)]
pub struct MemoryCurveStore {
    snapshots: Mutex<HashMap<String, Vec<DeviceProfile>>>,
}

impl MemoryCurveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves recorded for `device_id`.
    pub fn save_count(&self, device_id: &str) -> usize {
        self.lock().get(device_id).map_or(0, Vec::len)
    }

    /// All snapshots for `device_id`, oldest first.
    pub fn history(&self, device_id: &str) -> Vec<DeviceProfile> {
        self.lock().get(device_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<DeviceProfile>>> {
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CurveStore for MemoryCurveStore {
    fn save(&self, profile: &DeviceProfile) -> Result<(), ProfileError> {
        self.lock()
            .entry(profile.device_id.clone())
            .or_default()
            .push(profile.clone());
        Ok(())
    }

    fn load_latest(&self, device_id: &str) -> Result<Option<DeviceProfile>, ProfileError> {
        Ok(self
            .lock()
            .get(device_id)
            .and_then(|history| history.last().cloned()))
    }
}

impl<S: CurveStore + ?Sized> CurveStore for &S {
    fn save(&self, profile: &DeviceProfile) -> Result<(), ProfileError> {
        (**self).save(profile)
    }

    fn load_latest(&self, device_id: &str) -> Result<Option<DeviceProfile>, ProfileError> {
        (**self).load_latest(device_id)
    }
}

/// Map a device identifier onto a safe directory name.
///
/// Characters outside `[A-Za-z0-9._-]` become `_`; an empty id maps to
/// `unknown`.
pub fn sanitize_device_id(device_id: &str) -> String {
    let sanitized: String = device_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    match sanitized.as_str() {
        "" | "." | ".." => "unknown".to_string(),
        _ => sanitized,
    }
}
