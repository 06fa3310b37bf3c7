use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::ejector::EjectorSignal;
use crate::signal_slot::SignalSender;
use crate::sorter_hal::{PresenceSensor, SensorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEdge {
  Arrived,
  Departed,
}

impl PresenceEdge {
  /// The line sent to the vision host.  It captures and classifies on `OBJECT_DETECTED`.
  pub fn message(self) -> &'static str {
    match self {
      PresenceEdge::Arrived => "OBJECT_DETECTED",
      PresenceEdge::Departed => "OBJECT_GONE",
    }
  }
}

/// Compares each sample against the previous one.
#[derive(Debug)]
pub struct EdgeDetector {
  last: SensorState,
}

impl EdgeDetector {
  pub fn new(initial: SensorState) -> Self {
    Self { last: initial }
  }

  pub fn update(&mut self, current: SensorState) -> Option<PresenceEdge> {
    if current == self.last {
      return None;
    }
    self.last = current;
    Some(match current {
      SensorState::Present => PresenceEdge::Arrived,
      SensorState::Absent => PresenceEdge::Departed,
    })
  }
}

pub struct PresenceMonitor {
  sensor: Box<dyn PresenceSensor + Send>,
  ejector: SignalSender<EjectorSignal>,
  events: UnboundedSender<PresenceEdge>,
  poll_interval: Duration,
}

impl PresenceMonitor {
  pub fn new(
      sensor: Box<dyn PresenceSensor + Send>,
      ejector: SignalSender<EjectorSignal>,
      events: UnboundedSender<PresenceEdge>,
      poll_interval: Duration) -> Self {
    Self { sensor, ejector, events, poll_interval }
  }

  pub async fn run(self) {
    info!("Presence monitor started");
    let initial = self.sensor.sample().unwrap_or_else(|e| {
      warn!("Initial sensor sample failed, assuming nothing present: {e}");
      SensorState::Absent
    });
    let mut detector = EdgeDetector::new(initial);

    let mut ticker = interval(self.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
      ticker.tick().await;
      let state = match self.sensor.sample() {
        Ok(state) => state,
        Err(e) => {
          warn!("Sensor sample failed: {e}");
          continue;
        },
      };
      let edge = match detector.update(state) {
        Some(edge) => edge,
        None => continue,
      };
      info!("{}", edge.message());
      if edge == PresenceEdge::Departed {
        if let Some(pending) = self.ejector.signal(EjectorSignal::Retract) {
          debug!("Retract overwrote unconsumed {pending:?}");
        }
      }
      if self.events.send(edge).is_err() {
        debug!("Nobody listening for presence events");
      }
    }
  }
}
