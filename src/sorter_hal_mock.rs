use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_signals::signal::Mutable;
use log::debug;
use tokio::time::Instant;

use crate::sorter_hal::{check_angle, Actuator, CommandSource, HalResult, PresenceSensor, SensorState, SorterHal};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sensor line that tests (or the simulator) flip by hand.
#[derive(Debug, Clone)]
pub struct MockPresenceSensor {
    state: Mutable<SensorState>,
}

impl Default for MockPresenceSensor {
    fn default() -> Self {
        Self { state: Mutable::new(SensorState::Absent) }
    }
}

impl MockPresenceSensor {
    pub fn set(&self, state: SensorState) {
        self.state.set(state);
    }
}

impl PresenceSensor for MockPresenceSensor {
    fn sample(&self) -> HalResult<SensorState> {
        Ok(self.state.get())
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ActuatorMove {
    pub angle: u8,
    pub at: Instant,
}

/// Records every move it's asked to make.  Clones share the same history, so a test can keep
/// one handle while the controller owns the other.
#[derive(Debug, Clone)]
pub struct MockActuator {
    name: &'static str,
    moves: Arc<Mutex<Vec<ActuatorMove>>>,
}

impl MockActuator {
    pub fn new(name: &'static str) -> Self {
        Self { name, moves: Arc::default() }
    }

    pub fn moves(&self) -> Vec<ActuatorMove> {
        lock(&self.moves).clone()
    }

    pub fn angles(&self) -> Vec<u8> {
        lock(&self.moves).iter().map(|m| m.angle).collect()
    }

    pub fn angle(&self) -> Option<u8> {
        lock(&self.moves).last().map(|m| m.angle)
    }
}

impl Actuator for MockActuator {
    fn move_to(&mut self, angle: u8) -> HalResult<()> {
        let angle = check_angle(angle)?;
        debug!("{}: move_to {angle}", self.name);
        lock(&self.moves).push(ActuatorMove { angle, at: Instant::now() });
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockCommandSource {
    pending: Arc<Mutex<VecDeque<u8>>>,
}

impl MockCommandSource {
    pub fn push_bytes(&self, bytes: &[u8]) {
        lock(&self.pending).extend(bytes);
    }

    pub fn push_line(&self, line: &str) {
        let mut pending = lock(&self.pending);
        pending.extend(line.as_bytes());
        pending.push_back(b'\n');
    }
}

impl CommandSource for MockCommandSource {
    fn read_byte(&mut self) -> HalResult<Option<u8>> {
        Ok(lock(&self.pending).pop_front())
    }
}

#[derive(Debug, Clone)]
pub struct MockSorterHal {
    pub sensor: MockPresenceSensor,
    pub diverter: MockActuator,
    pub pusher: MockActuator,
}

impl Default for MockSorterHal {
    fn default() -> Self {
        Self {
            sensor: MockPresenceSensor::default(),
            diverter: MockActuator::new("diverter"),
            pusher: MockActuator::new("pusher"),
        }
    }
}

impl MockSorterHal {
    pub fn hal(&self) -> SorterHal {
        SorterHal {
            sensor: Box::new(self.sensor.clone()),
            diverter: Box::new(self.diverter.clone()),
            pusher: Box::new(self.pusher.clone()),
        }
    }
}
