//! Wires the three tasks of the sorting line together.
//!
//! ```text
//!   PresenceMonitor --(Retract on departure)--+
//!         |                                   |
//!         +--> OBJECT_DETECTED / OBJECT_GONE  |
//!                                             +--> [signal slot] --> Ejector --> pusher
//!   GradeDispatcher --(Push after diverter)---+
//!         |
//!         +--> diverter
//! ```
//!
//! Each actuator has exactly one writer, so neither needs a lock.  The slot keeps only the most
//! recent signal: a departure and a new command landing in the same ejector cycle means the
//! earlier one is lost.  With one object in the ejection zone at a time that can't happen.

use log::{error, info};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinError, JoinHandle};

use crate::config::SorterConfig;
use crate::ejector::Ejector;
use crate::grade_dispatcher::GradeDispatcher;
use crate::presence_monitor::{PresenceEdge, PresenceMonitor};
use crate::signal_slot;
use crate::sorter_hal::{Actuator, CommandSource, SorterHal};

pub struct SortingController;

impl SortingController {
  /// Parks both actuators at idle and spawns the tasks.  Must be called from within a tokio
  /// runtime.  Every presence edge is also sent to `presence_events` for the vision host.
  pub fn start(
      hal: SorterHal,
      commands: Box<dyn CommandSource + Send>,
      presence_events: UnboundedSender<PresenceEdge>,
      config: &SorterConfig) -> ControllerHandle {
    let SorterHal { sensor, mut diverter, mut pusher } = hal;
    park(pusher.as_mut(), "pusher", config.pusher.idle);
    park(diverter.as_mut(), "diverter", config.diverter.idle);
    info!("Setup complete, both servos at idle");

    let (ejector_tx, ejector_rx) = signal_slot::channel();
    let ejector = Ejector::new(
      pusher,
      ejector_rx,
      config.pusher.clone(),
      config.timing.push_dwell(),
      config.timing.retract_settle());
    let presence_monitor = PresenceMonitor::new(
      sensor,
      ejector_tx.clone(),
      presence_events,
      config.timing.sensor_poll());
    let grade_dispatcher = GradeDispatcher::new(
      commands,
      diverter,
      ejector_tx,
      config.diverter.clone(),
      config.timing.command_idle(),
      config.max_line_bytes);

    ControllerHandle {
      presence_monitor: tokio::spawn(presence_monitor.run()),
      ejector: tokio::spawn(ejector.run()),
      grade_dispatcher: tokio::spawn(grade_dispatcher.run()),
    }
  }
}

fn park(actuator: &mut (dyn Actuator + Send), name: &str, angle: u8) {
  if let Err(e) = actuator.move_to(angle) {
    error!("Failed to park {name} at {angle}: {e}");
  }
}

pub struct ControllerHandle {
  presence_monitor: JoinHandle<()>,
  ejector: JoinHandle<()>,
  grade_dispatcher: JoinHandle<()>,
}

impl ControllerHandle {
  /// The tasks never finish on their own, so this only returns if one of them panics.
  pub async fn run_forever(self) -> Result<(), JoinError> {
    tokio::try_join!(self.presence_monitor, self.ejector, self.grade_dispatcher)?;
    Ok(())
  }

  pub async fn shutdown(self) {
    let handles = [self.presence_monitor, self.ejector, self.grade_dispatcher];
    for handle in &handles {
      handle.abort();
    }
    for handle in handles {
      if let Err(e) = handle.await {
        if !e.is_cancelled() {
          error!("Controller task failed: {e}");
        }
      }
    }
    info!("Controller shut down");
  }
}
