//! Motion samples delivered by the input source.
//!
//! Sample logs are stored as JSONL, one sample per line. Lines starting
//! with `#` are comments (used for a header describing the recording).

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Monotonic timestamp in microseconds.
pub type TimestampUs = u64;

/// Raw button transition flags reported alongside a motion sample.
///
/// Bit layout follows the common raw-input convention: one bit per
/// down/up transition per button.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonFlags(u16);

impl ButtonFlags {
    pub const NONE: Self = Self(0);
    pub const PRIMARY_DOWN: Self = Self(0x0001);
    pub const PRIMARY_UP: Self = Self(0x0002);
    pub const SECONDARY_DOWN: Self = Self(0x0004);
    pub const SECONDARY_UP: Self = Self(0x0008);
    pub const MIDDLE_DOWN: Self = Self(0x0010);
    pub const MIDDLE_UP: Self = Self(0x0020);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::PRIMARY_DOWN, "PRIMARY_DOWN"),
        (Self::PRIMARY_UP, "PRIMARY_UP"),
        (Self::SECONDARY_DOWN, "SECONDARY_DOWN"),
        (Self::SECONDARY_UP, "SECONDARY_UP"),
        (Self::MIDDLE_DOWN, "MIDDLE_DOWN"),
        (Self::MIDDLE_UP, "MIDDLE_UP"),
    ];

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ButtonFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for ButtonFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("ButtonFlags(NONE)");
        }
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "ButtonFlags({})", names.join(" | "))
    }
}

/// One relative motion report from a pointing device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Button transitions reported with this sample.
    #[serde(rename = "buttons", default)]
    pub button_flags: ButtonFlags,

    /// Horizontal device displacement in counts.
    #[serde(rename = "dx")]
    pub device_dx: i32,

    /// Vertical device displacement in counts.
    #[serde(rename = "dy")]
    pub device_dy: i32,

    /// Horizontal display displacement in pixels, after gain.
    #[serde(rename = "tx", default)]
    pub display_dx: f64,

    /// Vertical display displacement in pixels, after gain.
    #[serde(rename = "ty", default)]
    pub display_dy: f64,

    /// Monotonic microseconds.
    #[serde(rename = "t")]
    pub timestamp_us: TimestampUs,

    /// Gap from the previous sample of the same device, in milliseconds.
    #[serde(rename = "span")]
    pub timespan_ms: f64,

    /// Identifier of the device that produced the sample.
    #[serde(rename = "src")]
    pub source_id: String,
}

impl MotionSample {
    /// Create a motion-only sample with no display displacement yet.
    pub fn motion(
        source_id: impl Into<String>,
        timestamp_us: TimestampUs,
        device_dx: i32,
        device_dy: i32,
        timespan_ms: f64,
    ) -> Self {
        Self {
            button_flags: ButtonFlags::NONE,
            device_dx,
            device_dy,
            display_dx: 0.0,
            display_dy: 0.0,
            timestamp_us,
            timespan_ms,
            source_id: source_id.into(),
        }
    }

    /// Create a primary-button press without motion.
    pub fn click(source_id: impl Into<String>, timestamp_us: TimestampUs, timespan_ms: f64) -> Self {
        Self::motion(source_id, timestamp_us, 0, 0, timespan_ms)
            .with_buttons(ButtonFlags::PRIMARY_DOWN)
    }

    /// Attach the display displacement produced by the translator.
    pub fn with_display(mut self, display_dx: f64, display_dy: f64) -> Self {
        self.display_dx = display_dx;
        self.display_dy = display_dy;
        self
    }

    /// Attach button transition flags.
    pub fn with_buttons(mut self, flags: ButtonFlags) -> Self {
        self.button_flags = flags;
        self
    }

    /// Whether the device moved at all.
    pub fn has_motion(&self) -> bool {
        self.device_dx != 0 || self.device_dy != 0
    }

    /// Whether this sample carries a primary-button press edge.
    pub fn is_primary_down(&self) -> bool {
        self.button_flags.contains(ButtonFlags::PRIMARY_DOWN)
    }

    /// Device displacement magnitude in counts.
    pub fn device_magnitude(&self) -> f64 {
        f64::from(self.device_dx).hypot(f64::from(self.device_dy))
    }

    /// Display displacement magnitude in pixels.
    pub fn display_magnitude(&self) -> f64 {
        self.display_dx.hypot(self.display_dy)
    }
}

/// Parse samples from JSONL content (one JSON object per line).
pub fn parse_samples(jsonl: &str) -> Result<Vec<MotionSample>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize samples to JSONL format.
pub fn serialize_samples(samples: &[MotionSample]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for sample in samples {
        output.push_str(&serde_json::to_string(sample)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_flags_contains() {
        let flags = ButtonFlags::PRIMARY_DOWN | ButtonFlags::SECONDARY_UP;
        assert!(flags.contains(ButtonFlags::PRIMARY_DOWN));
        assert!(flags.contains(ButtonFlags::SECONDARY_UP));
        assert!(!flags.contains(ButtonFlags::PRIMARY_UP));
        assert!(!flags.contains(ButtonFlags::NONE));
        assert_eq!(flags.bits(), 0x0009);
    }

    #[test]
    fn test_button_flags_debug() {
        let flags = ButtonFlags::PRIMARY_DOWN | ButtonFlags::MIDDLE_UP;
        assert_eq!(
            format!("{flags:?}"),
            "ButtonFlags(PRIMARY_DOWN | MIDDLE_UP)"
        );
        assert_eq!(format!("{:?}", ButtonFlags::NONE), "ButtonFlags(NONE)");
    }

    #[test]
    fn test_click_sample() {
        let click = MotionSample::click("046D_C077", 10_000, 8.0);
        assert!(click.is_primary_down());
        assert!(!click.has_motion());

        let release = click.clone().with_buttons(ButtonFlags::PRIMARY_UP);
        assert!(!release.is_primary_down());
    }

    #[test]
    fn test_magnitudes() {
        let sample = MotionSample::motion("dev", 0, 3, -4, 1.0).with_display(6.0, -8.0);
        assert!((sample.device_magnitude() - 5.0).abs() < 1e-12);
        assert!((sample.display_magnitude() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_json_field_names() {
        let sample = MotionSample::motion("dev", 1234, 2, -1, 8.0);
        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"t\":1234"));
        assert!(json.contains("\"dx\":2"));
        assert!(json.contains("\"src\":\"dev\""));
        assert!(json.contains("\"buttons\":0"));
    }

    #[test]
    fn test_parse_defaults_display_and_buttons() {
        let jsonl = "# {\"schema_version\":\"1.0\"}\n\
                     {\"t\":8000,\"dx\":4,\"dy\":0,\"span\":8.0,\"src\":\"dev\"}\n\
                     \n\
                     {\"t\":16000,\"dx\":0,\"dy\":0,\"span\":8.0,\"src\":\"dev\",\"buttons\":1}\n";
        let parsed = parse_samples(jsonl).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].display_dx, 0.0);
        assert!(!parsed[0].is_primary_down());
        assert!(parsed[1].is_primary_down());
    }

    #[test]
    fn test_jsonl_serialization_is_parseable() {
        let samples = vec![
            MotionSample::motion("dev", 1_000, 1, 2, 1.0).with_display(1.5, 3.0),
            MotionSample::click("dev", 2_000, 1.0),
        ];
        let jsonl = serialize_samples(&samples).unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        assert_eq!(parse_samples(&jsonl).unwrap(), samples);
    }
}
