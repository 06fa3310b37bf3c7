use log::{error, info, trace};
use tokio::time::{sleep, Duration};

use crate::config::PusherAngles;
use crate::signal_slot::SignalReceiver;
use crate::sorter_hal::Actuator;

/// What the pusher is told to do next: 0 comes from the sensor side, 1 from the command side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EjectorSignal {
  Retract = 0,
  Push = 1,
}

impl EjectorSignal {
  pub fn value(self) -> u32 {
    self as u32
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EjectorState {
  Idle,
  WaitingAfterPushSignal,
  WaitingAfterRetractSignal,
}

pub struct Ejector {
  pusher: Box<dyn Actuator + Send>,
  signals: SignalReceiver<EjectorSignal>,
  angles: PusherAngles,
  push_dwell: Duration,
  retract_settle: Duration,
  state: EjectorState,
}

impl Ejector {
  pub fn new(
      pusher: Box<dyn Actuator + Send>,
      signals: SignalReceiver<EjectorSignal>,
      angles: PusherAngles,
      push_dwell: Duration,
      retract_settle: Duration) -> Self {
    Self { pusher, signals, angles, push_dwell, retract_settle, state: EjectorState::Idle }
  }

  pub async fn run(mut self) {
    info!("Ejector started");
    loop {
      let signal = self.signals.wait().await;
      self.handle(signal).await;
    }
  }

  /// The wait always runs to completion.  Anything signalled meanwhile sits in the slot (and may
  /// itself be overwritten) until the next trip around `run`.
  async fn handle(&mut self, signal: EjectorSignal) {
    let (next_state, delay, angle) = match signal {
      EjectorSignal::Push => (EjectorState::WaitingAfterPushSignal, self.push_dwell, self.angles.push),
      EjectorSignal::Retract => (EjectorState::WaitingAfterRetractSignal, self.retract_settle, self.angles.idle),
    };
    self.move_to_state(next_state);
    info!("Ejector received {signal:?} ({}), waiting {delay:?}", signal.value());
    sleep(delay).await;

    match self.pusher.move_to(angle) {
      Ok(()) => info!("Pusher moved to {angle} ({signal:?})"),
      Err(e) => error!("Pusher move to {angle} failed: {e}"),
    }
    self.move_to_state(EjectorState::Idle);
  }

  fn move_to_state(&mut self, next: EjectorState) {
    trace!("Ejector: [{:?}] => [{:?}]", self.state, next);
    self.state = next;
  }
}
