use std::fs;
use std::path::PathBuf;

use conv::{ConvUtil, RoundToNearest};
use log::trace;

use crate::config::PwmChannel;
use crate::sorter_hal::{check_angle, Actuator, HalError, HalResult, MAX_ANGLE};

pub const SYSFS_PWM_ROOT: &str = "/sys/class/pwm";

/// Hobby servo on an exported, enabled sysfs PWM channel with a 20ms period.  Only the duty cycle
/// is touched here.
pub struct SysfsServo {
    duty_cycle_path: PathBuf,
    min_pulse_us: u32,
    max_pulse_us: u32,
}

impl SysfsServo {
    pub fn channel_path(pwm: PwmChannel) -> PathBuf {
        PathBuf::from(format!("{SYSFS_PWM_ROOT}/pwmchip{}/pwm{}", pwm.chip, pwm.channel))
    }

    pub fn new(pwm: PwmChannel, min_pulse_us: u32, max_pulse_us: u32) -> HalResult<Self> {
        let channel_path = Self::channel_path(pwm);
        if !channel_path.exists() {
            return Err(HalError::DeviceNotConnected(format!(
                "pwm channel not exported at {}", channel_path.display())));
        }
        Ok(Self {
            duty_cycle_path: channel_path.join("duty_cycle"),
            min_pulse_us,
            max_pulse_us,
        })
    }
}

/// Linear map of 0..=180 degrees onto the servo's pulse range, in nanoseconds.
fn angle_to_pulse_ns(angle: u8, min_pulse_us: u32, max_pulse_us: u32) -> HalResult<u32> {
    let span_us = f64::from(max_pulse_us) - f64::from(min_pulse_us);
    let pulse_us = f64::from(min_pulse_us) + span_us * f64::from(angle) / f64::from(MAX_ANGLE);
    (pulse_us * 1000.0)
        .approx_as_by::<u32, RoundToNearest>()
        .map_err(|e| HalError::InternalError(format!("pulse width for {angle} out of range: {e:?}")))
}

impl Actuator for SysfsServo {
    fn move_to(&mut self, angle: u8) -> HalResult<()> {
        let angle = check_angle(angle)?;
        let pulse_ns = angle_to_pulse_ns(angle, self.min_pulse_us, self.max_pulse_us)?;
        trace!("{}: duty_cycle {pulse_ns}", self.duty_cycle_path.display());
        fs::write(&self.duty_cycle_path, pulse_ns.to_string())?;
        Ok(())
    }
}
