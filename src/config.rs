use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Duration;

use crate::grade::Grade;
use crate::sorter_hal::MAX_ANGLE;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("{name} angle {angle} exceeds {max}", max = MAX_ANGLE)]
  AngleOutOfRange { name: &'static str, angle: u8 },
  #[error("{0} must be non-zero")]
  ZeroInterval(&'static str),
  #[error("servo pulse range {min_us}..{max_us}us is empty")]
  EmptyPulseRange { min_us: u32, max_us: u32 },
  #[error("max_line_bytes must be non-zero")]
  ZeroLineBuffer,
  #[error("reading config: {0}")]
  Io(#[from] std::io::Error),
  #[error("parsing config: {0}")]
  Parse(#[from] serde_json::Error),
}

/// Everything tunable about the line.  Any field missing from the JSON file keeps its default,
/// and the defaults describe the mechanism as built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
  pub timing: TimingConfig,
  pub diverter: DiverterAngles,
  pub pusher: PusherAngles,
  pub hardware: HardwareConfig,
  pub max_line_bytes: usize,
}

impl Default for SorterConfig {
  fn default() -> Self {
    Self {
      timing: TimingConfig::default(),
      diverter: DiverterAngles::default(),
      pusher: PusherAngles::default(),
      hardware: HardwareConfig::default(),
      max_line_bytes: 256,
    }
  }
}

impl SorterConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let file = File::open(path)?;
    Self::from_reader(BufReader::new(file))
  }

  pub fn from_reader(reader: impl Read) -> Result<Self, ConfigError> {
    let config: SorterConfig = serde_json::from_reader(reader)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let angles = [
      ("diverter idle", self.diverter.idle),
      ("diverter AA", self.diverter.aa),
      ("diverter A", self.diverter.a),
      ("diverter B", self.diverter.b),
      ("diverter inedible", self.diverter.inedible),
      ("pusher idle", self.pusher.idle),
      ("pusher push", self.pusher.push),
    ];
    for (name, angle) in angles {
      if angle > MAX_ANGLE {
        return Err(ConfigError::AngleOutOfRange { name, angle });
      }
    }

    let intervals = [
      ("sensor_poll_ms", self.timing.sensor_poll_ms),
      ("command_idle_ms", self.timing.command_idle_ms),
      ("push_dwell_ms", self.timing.push_dwell_ms),
      ("retract_settle_ms", self.timing.retract_settle_ms),
    ];
    for (name, ms) in intervals {
      if ms == 0 {
        return Err(ConfigError::ZeroInterval(name));
      }
    }

    let hw = &self.hardware;
    if hw.servo_min_pulse_us >= hw.servo_max_pulse_us {
      return Err(ConfigError::EmptyPulseRange {
        min_us: hw.servo_min_pulse_us,
        max_us: hw.servo_max_pulse_us,
      });
    }
    if self.max_line_bytes == 0 {
      return Err(ConfigError::ZeroLineBuffer);
    }
    Ok(())
  }
}

/// These encode the physical timing of the mechanism: belt travel from the sensor to the pusher,
/// and clearance after the object leaves the sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
  pub sensor_poll_ms: u64,
  pub command_idle_ms: u64,
  pub push_dwell_ms: u64,
  pub retract_settle_ms: u64,
}

impl Default for TimingConfig {
  fn default() -> Self {
    Self {
      sensor_poll_ms: 50,
      command_idle_ms: 20,
      push_dwell_ms: 1000,
      retract_settle_ms: 200,
    }
  }
}

impl TimingConfig {
  pub fn sensor_poll(&self) -> Duration {
    Duration::from_millis(self.sensor_poll_ms)
  }

  pub fn command_idle(&self) -> Duration {
    Duration::from_millis(self.command_idle_ms)
  }

  pub fn push_dwell(&self) -> Duration {
    Duration::from_millis(self.push_dwell_ms)
  }

  pub fn retract_settle(&self) -> Duration {
    Duration::from_millis(self.retract_settle_ms)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiverterAngles {
  pub idle: u8,
  pub aa: u8,
  pub a: u8,
  pub b: u8,
  pub inedible: u8,
}

impl Default for DiverterAngles {
  fn default() -> Self {
    Self { idle: 0, aa: 63, a: 43, b: 20, inedible: 0 }
  }
}

impl DiverterAngles {
  pub fn angle_for(&self, grade: Grade) -> u8 {
    match grade {
      Grade::AA => self.aa,
      Grade::A => self.a,
      Grade::B => self.b,
      Grade::Inedible => self.inedible,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PusherAngles {
  pub idle: u8,
  pub push: u8,
}

impl Default for PusherAngles {
  fn default() -> Self {
    Self { idle: 90, push: 0 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PwmChannel {
  pub chip: u32,
  pub channel: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
  pub sensor_gpio: u32,
  /// The IR break-beam module pulls its output LOW while something is in front of it.
  pub sensor_active_low: bool,
  pub pusher_pwm: PwmChannel,
  pub diverter_pwm: PwmChannel,
  pub servo_min_pulse_us: u32,
  pub servo_max_pulse_us: u32,
}

impl Default for HardwareConfig {
  fn default() -> Self {
    Self {
      sensor_gpio: 19,
      sensor_active_low: true,
      pusher_pwm: PwmChannel { chip: 0, channel: 0 },
      diverter_pwm: PwmChannel { chip: 0, channel: 1 },
      servo_min_pulse_us: 500,
      servo_max_pulse_us: 2500,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_match_mechanism() {
    let config = SorterConfig::default();
    assert_eq!(config.timing.sensor_poll(), Duration::from_millis(50));
    assert_eq!(config.timing.command_idle(), Duration::from_millis(20));
    assert_eq!(config.timing.push_dwell(), Duration::from_millis(1000));
    assert_eq!(config.timing.retract_settle(), Duration::from_millis(200));
    assert_eq!(config.diverter.angle_for(Grade::AA), 63);
    assert_eq!(config.diverter.angle_for(Grade::A), 43);
    assert_eq!(config.diverter.angle_for(Grade::B), 20);
    assert_eq!(config.diverter.angle_for(Grade::Inedible), 0);
    assert_eq!(config.pusher, PusherAngles { idle: 90, push: 0 });
    config.validate().unwrap();
  }

  #[test]
  fn test_partial_file_keeps_defaults() {
    let json = br#"{ "timing": { "push_dwell_ms": 1500 }, "diverter": { "b": 25 } }"#;
    let config = SorterConfig::from_reader(&json[..]).unwrap();
    assert_eq!(config.timing.push_dwell_ms, 1500);
    assert_eq!(config.timing.retract_settle_ms, 200);
    assert_eq!(config.diverter.b, 25);
    assert_eq!(config.diverter.aa, 63);
    assert_eq!(config.hardware, HardwareConfig::default());
  }

  #[test]
  fn test_rejects_out_of_range_angle() {
    let json = br#"{ "pusher": { "push": 200 } }"#;
    let err = SorterConfig::from_reader(&json[..]).unwrap_err();
    assert!(matches!(err, ConfigError::AngleOutOfRange { name: "pusher push", angle: 200 }));
  }

  #[test]
  fn test_rejects_zero_poll_interval() {
    let mut config = SorterConfig::default();
    config.timing.sensor_poll_ms = 0;
    assert!(matches!(config.validate(), Err(ConfigError::ZeroInterval("sensor_poll_ms"))));
  }

  #[test]
  fn test_rejects_zero_dwell() {
    let json = br#"{ "timing": { "push_dwell_ms": 0 } }"#;
    let err = SorterConfig::from_reader(&json[..]).unwrap_err();
    assert!(matches!(err, ConfigError::ZeroInterval("push_dwell_ms")));

    let json = br#"{ "timing": { "retract_settle_ms": 0 } }"#;
    let err = SorterConfig::from_reader(&json[..]).unwrap_err();
    assert!(matches!(err, ConfigError::ZeroInterval("retract_settle_ms")));
  }

  #[test]
  fn test_rejects_malformed_json() {
    let err = SorterConfig::from_reader(&b"{ timing: "[..]).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }
}
