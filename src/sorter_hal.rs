use std::io;

use thiserror::Error;

/// Hobby servos on the line all take 0..=180 degrees.
pub const MAX_ANGLE: u8 = 180;

#[derive(Error, PartialEq, Clone, Debug)]
pub enum HalError {
    #[error("{0}")]
    DeviceNotConnected(String),
    #[error("angle {0} outside of 0..={max}", max = MAX_ANGLE)]
    AngleOutOfRange(u8),
    #[error("{0}")]
    InternalError(String),
}

impl From<io::Error> for HalError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => HalError::DeviceNotConnected(e.to_string()),
            _ => HalError::InternalError(e.to_string()),
        }
    }
}

pub type HalResult<T> = Result<T, HalError>;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum SensorState {
    Present,
    Absent,
}

pub trait PresenceSensor {
    fn sample(&self) -> HalResult<SensorState>;
}

pub trait Actuator {
    fn move_to(&mut self, angle: u8) -> HalResult<()>;
}

/// Non-blocking byte source for the grade command stream.  `Ok(None)` means nothing is pending
/// right now.
pub trait CommandSource {
    fn read_byte(&mut self) -> HalResult<Option<u8>>;
}

pub fn check_angle(angle: u8) -> HalResult<u8> {
    if angle > MAX_ANGLE {
        return Err(HalError::AngleOutOfRange(angle));
    }
    Ok(angle)
}

pub struct SorterHal {
    pub sensor: Box<dyn PresenceSensor + Send>,
    pub diverter: Box<dyn Actuator + Send>,
    pub pusher: Box<dyn Actuator + Send>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_angle_bounds() {
        assert_eq!(check_angle(0), Ok(0));
        assert_eq!(check_angle(MAX_ANGLE), Ok(MAX_ANGLE));
        assert_eq!(check_angle(181), Err(HalError::AngleOutOfRange(181)));
    }

    #[test]
    fn test_missing_device_maps_to_not_connected() {
        let err = HalError::from(io::Error::new(io::ErrorKind::NotFound, "no such file"));
        assert!(matches!(err, HalError::DeviceNotConnected(_)));
        let err = HalError::from(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(err, HalError::InternalError(_)));
    }
}
