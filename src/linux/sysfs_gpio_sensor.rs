use std::fs;
use std::path::PathBuf;

use crate::sorter_hal::{HalError, HalResult, PresenceSensor, SensorState};

pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// IR presence sensor on an already-exported sysfs GPIO line.
pub struct SysfsPresenceSensor {
    value_path: PathBuf,
    active_low: bool,
}

impl SysfsPresenceSensor {
    pub fn value_path(gpio: u32) -> PathBuf {
        PathBuf::from(format!("{SYSFS_GPIO_ROOT}/gpio{gpio}/value"))
    }

    pub fn new(gpio: u32, active_low: bool) -> HalResult<Self> {
        let value_path = Self::value_path(gpio);
        if !value_path.exists() {
            return Err(HalError::DeviceNotConnected(format!(
                "gpio{gpio} not exported at {}", value_path.display())));
        }
        Ok(Self { value_path, active_low })
    }
}

fn level_to_state(high: bool, active_low: bool) -> SensorState {
    if high != active_low {
        SensorState::Present
    } else {
        SensorState::Absent
    }
}

impl PresenceSensor for SysfsPresenceSensor {
    fn sample(&self) -> HalResult<SensorState> {
        let raw = fs::read_to_string(&self.value_path)?;
        let high = match raw.trim() {
            "1" => true,
            "0" => false,
            other => return Err(HalError::InternalError(format!("unexpected gpio value: {other:?}"))),
        };
        Ok(level_to_state(high, self.active_low))
    }
}
