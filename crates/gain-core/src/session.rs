//! Per-device controller sessions and the registry that owns them.
//!
//! A [`DeviceSession`] holds everything one device needs: its profile, event
//! window, aim-point filter, learning scratch and polling-rate meter. The
//! [`SessionRegistry`] creates sessions on first sight of a device, loading
//! the newest saved profile or creating and saving a default one.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --motion--> Accumulating --primary down--> (learn) --> Idle
//!                       |
//!                       +--silent longer than the window--> Idle
//! ```

use std::collections::HashMap;
use std::fmt;

use autogain_common::clock::PollingRateMeter;
use autogain_common::config::{AppConfig, DeviceDefaults, LearningConfig};
use autogain_common::error::{AutogainError, AutogainResult};
use autogain_profile_model::{CurveStore, DeviceProfile, GainCurve, MotionSample, TimestampUs};
use serde::Serialize;

use crate::adapter::{GainAdapter, LearningOutcome, LearningScratch, SkipReason};
use crate::aim_point::AimPointEstimator;
use crate::translator;
use crate::window::EventWindow;

/// Where a session is in the motion-to-click cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing buffered.
    Idle,
    /// Motion buffered, waiting for a click.
    Accumulating,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Accumulating => write!(f, "accumulating"),
        }
    }
}

/// Human-readable summary of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceStatus {
    pub device_id: String,
    pub polling_rate_hz: f64,
    pub cpi: f64,
    pub ppi: f64,
    /// Motor speed of the last translated report (m/s).
    pub last_speed_ms: f64,
    /// Curve bin of the last translated report.
    pub last_bin: usize,
    pub aim_point: f64,
    pub state: SessionState,
    pub buffered_samples: usize,
    pub translation_enabled: bool,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.0} Hz, {} cpi, {} ppi, speed {:.4} m/s (bin {}), aim {:.4}, {} ({} buffered)",
            self.device_id,
            self.polling_rate_hz,
            self.cpi,
            self.ppi,
            self.last_speed_ms,
            self.last_bin,
            self.aim_point,
            self.state,
            self.buffered_samples,
        )?;
        if !self.translation_enabled {
            write!(f, ", translation off")?;
        }
        Ok(())
    }
}

/// Controller state for one physical device.
#[derive(Debug)]
pub struct DeviceSession {
    profile: DeviceProfile,
    window: EventWindow,
    adapter: GainAdapter,
    aim: AimPointEstimator,
    scratch: LearningScratch,
    meter: PollingRateMeter,
    last_speed_ms: f64,
    last_bin: usize,
    translation_enabled: bool,
}

impl DeviceSession {
    pub fn new(profile: DeviceProfile, learning: &LearningConfig) -> Self {
        Self {
            profile,
            window: EventWindow::new(learning.time_window_us()),
            adapter: GainAdapter::new(learning),
            aim: AimPointEstimator::new(),
            scratch: LearningScratch::new(),
            meter: PollingRateMeter::per_second(),
            last_speed_ms: 0.0,
            last_bin: 0,
            translation_enabled: true,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.profile.device_id
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Read-only view of the learned curve.
    pub fn curve(&self) -> &GainCurve {
        &self.profile.curve
    }

    pub fn aim_point(&self) -> f64 {
        self.aim.aim_point()
    }

    pub fn state(&self) -> SessionState {
        if self.window.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Accumulating
        }
    }

    pub fn buffered_samples(&self) -> usize {
        self.window.len()
    }

    pub fn translation_enabled(&self) -> bool {
        self.translation_enabled
    }

    /// Switch translation on or off. While off, reports pass through at the
    /// plain density ratio and clicks do not learn.
    pub fn set_translation_enabled(&mut self, enabled: bool) {
        if self.translation_enabled != enabled {
            tracing::info!(device = %self.profile.device_id, enabled, "Translation toggled");
        }
        self.translation_enabled = enabled;
    }

    /// Translate one report into display pixels.
    pub fn translate(&mut self, dx: i32, dy: i32, timespan_ms: f64) -> (f64, f64) {
        let profile = &self.profile;
        if !self.translation_enabled {
            let ratio = profile.ppi / profile.cpi;
            return (f64::from(dx) * ratio, f64::from(dy) * ratio);
        }
        let speed =
            translator::motor_speed(dx, dy, timespan_ms, profile.cpi, profile.polling_rate_hz);
        let gain = translator::gain_at(speed, &profile.curve, profile.cpi, profile.ppi);
        self.last_speed_ms = speed;
        self.last_bin = GainCurve::speed_bin(speed);
        (f64::from(dx) * gain, f64::from(dy) * gain)
    }

    /// Buffer a translated sample; a primary-button press runs a learning
    /// pass over the buffered gesture.
    ///
    /// Returns the outcome when a pass ran. The profile is saved through
    /// `store` when the curve changed; a failed save is logged and the
    /// in-memory curve stays authoritative.
    pub fn on_motion_sample<S: CurveStore + ?Sized>(
        &mut self,
        sample: &MotionSample,
        store: &S,
    ) -> Option<LearningOutcome> {
        self.meter.record_sample();

        if self.window.is_idle(sample.timestamp_us) {
            tracing::debug!(
                device = %self.profile.device_id,
                dropped = self.window.len(),
                "Idle timeout; discarding buffered motion"
            );
            self.window.clear();
        }

        let trigger = sample.is_primary_down();
        if !trigger || sample.has_motion() {
            self.buffer(sample.clone());
        }
        if !trigger {
            return None;
        }

        let samples = self.window.drain();
        if !self.translation_enabled {
            tracing::debug!(device = %self.profile.device_id, "Translation off; click ignored");
            return Some(LearningOutcome::Skipped(SkipReason::Disabled));
        }

        let outcome = self
            .adapter
            .learn(&samples, &mut self.profile, &mut self.aim, &mut self.scratch);
        match &outcome {
            LearningOutcome::Skipped(reason) => {
                tracing::debug!(
                    device = %self.profile.device_id,
                    samples = samples.len(),
                    %reason,
                    "Learning pass skipped"
                );
            }
            LearningOutcome::Applied(report) => {
                tracing::debug!(
                    device = %self.profile.device_id,
                    samples = samples.len(),
                    submovements = report.submovements,
                    scored = report.scored,
                    changed_bins = report.changed_bins,
                    aim_point = report.aim_point,
                    "Learning pass applied"
                );
                if report.changed() {
                    self.persist(store);
                }
            }
        }
        Some(outcome)
    }

    /// Translate a raw report, attach the display motion and feed it.
    pub fn process<S: CurveStore + ?Sized>(
        &mut self,
        sample: &MotionSample,
        store: &S,
    ) -> ((f64, f64), Option<LearningOutcome>) {
        let (tx, ty) = self.translate(sample.device_dx, sample.device_dy, sample.timespan_ms);
        let translated = sample.clone().with_display(tx, ty);
        ((tx, ty), self.on_motion_sample(&translated, store))
    }

    /// Advance time without a sample: measure the polling rate and expire an
    /// idle window.
    pub fn tick<S: CurveStore + ?Sized>(&mut self, now_us: TimestampUs, store: &S) {
        if let Some(measured) = self.meter.tick(now_us) {
            let previous = self.profile.polling_rate_hz;
            if self.profile.raise_polling_rate(measured) {
                tracing::info!(
                    device = %self.profile.device_id,
                    previous_hz = previous,
                    measured_hz = measured,
                    "Polling rate raised"
                );
                self.persist(store);
            }
        }

        if self.window.is_idle(now_us) {
            tracing::debug!(
                device = %self.profile.device_id,
                dropped = self.window.len(),
                "Idle timeout; discarding buffered motion"
            );
            self.window.clear();
        }
    }

    pub fn status(&self) -> DeviceStatus {
        DeviceStatus {
            device_id: self.profile.device_id.clone(),
            polling_rate_hz: self.profile.polling_rate_hz,
            cpi: self.profile.cpi,
            ppi: self.profile.ppi,
            last_speed_ms: self.last_speed_ms,
            last_bin: self.last_bin,
            aim_point: self.aim.aim_point(),
            state: self.state(),
            buffered_samples: self.window.len(),
            translation_enabled: self.translation_enabled,
        }
    }

    fn buffer(&mut self, sample: MotionSample) {
        let timestamp_us = sample.timestamp_us;
        if !self.window.push(sample) {
            tracing::debug!(
                device = %self.profile.device_id,
                timestamp_us,
                newest_us = ?self.window.newest_timestamp(),
                "Out-of-order sample not buffered"
            );
        }
    }

    fn persist<S: CurveStore + ?Sized>(&self, store: &S) {
        match store.save(&self.profile) {
            Ok(()) => tracing::info!(device = %self.profile.device_id, "Profile saved"),
            Err(e) => {
                tracing::warn!(device = %self.profile.device_id, error = %e, "Failed to save profile")
            }
        }
    }
}

/// Owns one [`DeviceSession`] per device id and the store they persist to.
#[derive(Debug)]
pub struct SessionRegistry<S: CurveStore> {
    sessions: HashMap<String, DeviceSession>,
    store: S,
    config: AppConfig,
}

impl<S: CurveStore> SessionRegistry<S> {
    /// Create a registry after validating `config`.
    pub fn new(store: S, config: AppConfig) -> AutogainResult<Self> {
        config.validate()?;
        Ok(Self {
            sessions: HashMap::new(),
            store,
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceSession> {
        self.sessions.get(device_id)
    }

    /// The session for `device_id`, creating it on first use.
    pub fn session_for(&mut self, device_id: &str) -> &mut DeviceSession {
        self.session_and_store(device_id).0
    }

    /// Translate one report from `device_id`.
    pub fn translate(&mut self, device_id: &str, dx: i32, dy: i32, timespan_ms: f64) -> (f64, f64) {
        if let Some(session) = self.sessions.get_mut(device_id) {
            return session.translate(dx, dy, timespan_ms);
        }
        self.session_for(device_id).translate(dx, dy, timespan_ms)
    }

    /// Feed an already translated sample to its device's session.
    pub fn on_motion_sample(&mut self, sample: &MotionSample) -> Option<LearningOutcome> {
        let (session, store) = self.session_and_store(&sample.source_id);
        session.on_motion_sample(sample, store)
    }

    /// Translate and feed a raw sample.
    pub fn process(&mut self, sample: &MotionSample) -> ((f64, f64), Option<LearningOutcome>) {
        let (session, store) = self.session_and_store(&sample.source_id);
        session.process(sample, store)
    }

    /// Drive every session's clock.
    pub fn tick(&mut self, now_us: TimestampUs) {
        for session in self.sessions.values_mut() {
            session.tick(now_us, &self.store);
        }
    }

    fn session_and_store(&mut self, device_id: &str) -> (&mut DeviceSession, &S) {
        let store = &self.store;
        let config = &self.config;
        let session = self
            .sessions
            .entry(device_id.to_string())
            .or_insert_with(|| {
                let profile = load_or_create(store, device_id, &config.device_defaults);
                DeviceSession::new(profile, &config.learning)
            });
        (session, store)
    }

    /// Status of every session, ordered by device id.
    pub fn statuses(&self) -> Vec<DeviceStatus> {
        let mut statuses: Vec<DeviceStatus> =
            self.sessions.values().map(DeviceSession::status).collect();
        statuses.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        statuses
    }

    /// Save every session's profile.
    pub fn persist_all(&self) -> AutogainResult<()> {
        for session in self.sessions.values() {
            self.store.save(session.profile()).map_err(|e| {
                AutogainError::storage(format!("saving {}: {e}", session.device_id()))
            })?;
        }
        Ok(())
    }
}

/// Newest saved profile for `device_id`, or a fresh default that is saved
/// immediately so a corrupt file on disk is replaced.
fn load_or_create<S: CurveStore + ?Sized>(
    store: &S,
    device_id: &str,
    defaults: &DeviceDefaults,
) -> DeviceProfile {
    match store.load_latest(device_id) {
        Ok(Some(profile)) => {
            tracing::info!(device = device_id, "Loaded profile");
            return profile;
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(device = device_id, error = %e, "Failed to load profile; using defaults");
        }
    }

    let profile = DeviceProfile::new(
        device_id,
        defaults.polling_rate_hz,
        defaults.cpi,
        defaults.ppi,
        defaults.default_gain,
    );
    tracing::info!(device = device_id, "Created default profile");
    if let Err(e) = store.save(&profile) {
        tracing::warn!(device = device_id, error = %e, "Failed to save default profile");
    }
    profile
}
