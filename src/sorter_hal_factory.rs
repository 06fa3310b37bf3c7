use log::info;

use crate::config::HardwareConfig;
use crate::linux::sysfs_gpio_sensor::SysfsPresenceSensor;
use crate::linux::sysfs_pwm_servo::SysfsServo;
use crate::sorter_hal::SorterHal;
use crate::sorter_hal_mock::MockSorterHal;

#[derive(Default)]
pub struct SorterHalFactory {
    force_mock: bool,
}

impl SorterHalFactory {
    pub fn new_maybe_mock(force_mock: bool) -> Self {
        Self { force_mock }
    }

    pub fn create_hal(&self, hw: &HardwareConfig) -> anyhow::Result<SorterHal> {
        let hardware_present = SysfsPresenceSensor::value_path(hw.sensor_gpio).exists()
            && SysfsServo::channel_path(hw.diverter_pwm).exists();
        if !self.force_mock && hardware_present {
            Ok(SorterHal {
                sensor: Box::new(SysfsPresenceSensor::new(hw.sensor_gpio, hw.sensor_active_low)?),
                diverter: Box::new(SysfsServo::new(hw.diverter_pwm, hw.servo_min_pulse_us, hw.servo_max_pulse_us)?),
                pusher: Box::new(SysfsServo::new(hw.pusher_pwm, hw.servo_min_pulse_us, hw.servo_max_pulse_us)?),
            })
        } else {
            info!("Using mock sensor and servos");
            Ok(MockSorterHal::default().hal())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_mock_hal_is_usable() {
        let mut hal = SorterHalFactory::new_maybe_mock(true)
            .create_hal(&HardwareConfig::default())
            .unwrap();
        hal.diverter.move_to(63).unwrap();
        hal.pusher.move_to(90).unwrap();
        assert!(hal.sensor.sample().is_ok());
    }
}
