use std::mem;

use log::{debug, error, info, warn};
use tokio::time::{sleep, Duration};

use crate::config::DiverterAngles;
use crate::ejector::EjectorSignal;
use crate::grade::Grade;
use crate::signal_slot::SignalSender;
use crate::sorter_hal::{Actuator, CommandSource};

pub struct GradeDispatcher {
  commands: Box<dyn CommandSource + Send>,
  diverter: Box<dyn Actuator + Send>,
  ejector: SignalSender<EjectorSignal>,
  angles: DiverterAngles,
  idle_interval: Duration,
  max_line_bytes: usize,
  line: Vec<u8>,
  overflowed: bool,
}

impl GradeDispatcher {
  pub fn new(
      commands: Box<dyn CommandSource + Send>,
      diverter: Box<dyn Actuator + Send>,
      ejector: SignalSender<EjectorSignal>,
      angles: DiverterAngles,
      idle_interval: Duration,
      max_line_bytes: usize) -> Self {
    Self {
      commands,
      diverter,
      ejector,
      angles,
      idle_interval,
      max_line_bytes,
      line: Vec::new(),
      overflowed: false,
    }
  }

  pub async fn run(mut self) {
    info!("Grade dispatcher started, listening for grade commands");
    loop {
      self.drain_input();
      sleep(self.idle_interval).await;
    }
  }

  fn drain_input(&mut self) {
    loop {
      match self.commands.read_byte() {
        Ok(Some(byte)) => self.on_byte(byte),
        Ok(None) => return,
        Err(e) => {
          warn!("Command input read failed: {e}");
          return;
        },
      }
    }
  }

  fn on_byte(&mut self, byte: u8) {
    if byte != b'\n' {
      if self.line.len() < self.max_line_bytes {
        self.line.push(byte);
      } else {
        self.overflowed = true;
      }
      return;
    }

    let line = mem::take(&mut self.line);
    if mem::take(&mut self.overflowed) {
      warn!("Dropped command line longer than {} bytes", self.max_line_bytes);
      return;
    }
    self.handle_line(&String::from_utf8_lossy(&line));
  }

  /// Acts on one complete line: a recognised grade moves the diverter and then asks the ejector
  /// to push.  Returns the grade acted on.
  pub fn handle_line(&mut self, line: &str) -> Option<Grade> {
    let command = line.trim();
    if command.is_empty() {
      return None;
    }
    info!("Received command: {command}");

    let grade = match Grade::parse(command) {
      Some(grade) => grade,
      None => {
        warn!("Unknown command: {}", command.to_uppercase());
        return None;
      },
    };

    let angle = self.angles.angle_for(grade);
    if let Err(e) = self.diverter.move_to(angle) {
      // Pushing now would drop the object into whatever lane the diverter was left in.
      error!("Diverter move to {angle} for {grade} failed, not pushing: {e}");
      return None;
    }
    info!("Diverter moved to {angle} for {grade}, notifying ejector");
    if let Some(pending) = self.ejector.signal(EjectorSignal::Push) {
      debug!("Push overwrote unconsumed {pending:?}");
    }
    Some(grade)
  }
}

#[cfg(test)]
mod tests {
  use crate::signal_slot::{self, SignalReceiver};
  use crate::sorter_hal::{HalError, HalResult};
  use crate::sorter_hal_mock::{MockActuator, MockCommandSource};

  use super::*;

  struct Fixture {
    commands: MockCommandSource,
    diverter: MockActuator,
    signals: SignalReceiver<EjectorSignal>,
    dispatcher: GradeDispatcher,
  }

  fn fixture_with(diverter: Box<dyn Actuator + Send>, observer: MockActuator) -> Fixture {
    let commands = MockCommandSource::default();
    let (tx, signals) = signal_slot::channel();
    let dispatcher = GradeDispatcher::new(
      Box::new(commands.clone()),
      diverter,
      tx,
      DiverterAngles::default(),
      Duration::from_millis(20),
      32);
    Fixture { commands, diverter: observer, signals, dispatcher }
  }

  fn fixture() -> Fixture {
    let diverter = MockActuator::new("diverter");
    fixture_with(Box::new(diverter.clone()), diverter)
  }

  struct JammedActuator;
  impl Actuator for JammedActuator {
    fn move_to(&mut self, _angle: u8) -> HalResult<()> {
      Err(HalError::InternalError(String::from("jammed")))
    }
  }

  #[test]
  fn test_aa_with_whitespace_and_lower_case() {
    let mut f = fixture();
    f.commands.push_bytes(b" grade_aa \n");
    f.dispatcher.drain_input();

    assert_eq!(f.diverter.angles(), vec![63]);
    assert_eq!(f.signals.try_take(), Some(EjectorSignal::Push));
  }

  #[test]
  fn test_every_grade_moves_to_its_angle() {
    let mut f = fixture();
    let angles = DiverterAngles::default();
    for grade in Grade::ALL {
      assert_eq!(f.dispatcher.handle_line(grade.command()), Some(grade));
      assert_eq!(f.diverter.angle(), Some(angles.angle_for(grade)));
      assert_eq!(f.signals.try_take(), Some(EjectorSignal::Push));
    }
  }

  #[test]
  fn test_repeated_command_is_not_collapsed() {
    let mut f = fixture();
    f.commands.push_line("GRADE_B");
    f.dispatcher.drain_input();
    assert_eq!(f.signals.try_take(), Some(EjectorSignal::Push));
    f.commands.push_line("GRADE_B");
    f.dispatcher.drain_input();
    assert_eq!(f.signals.try_take(), Some(EjectorSignal::Push));

    assert_eq!(f.diverter.angles(), vec![20, 20]);
  }

  #[test]
  fn test_unknown_command_then_valid_one() {
    let mut f = fixture();
    f.commands.push_line("GRADE_X");
    f.dispatcher.drain_input();
    assert!(f.diverter.angles().is_empty());
    assert_eq!(f.signals.try_take(), None);

    f.commands.push_line("GRADE_A");
    f.dispatcher.drain_input();
    assert_eq!(f.diverter.angles(), vec![43]);
    assert_eq!(f.signals.try_take(), Some(EjectorSignal::Push));
  }

  #[test]
  fn test_empty_lines_ignored() {
    let mut f = fixture();
    f.commands.push_bytes(b"\n  \r\n\n");
    f.dispatcher.drain_input();
    assert!(f.diverter.angles().is_empty());
    assert_eq!(f.signals.try_take(), None);
  }

  #[test]
  fn test_partial_line_waits_for_terminator() {
    let mut f = fixture();
    f.commands.push_bytes(b"GRADE_");
    f.dispatcher.drain_input();
    assert!(f.diverter.angles().is_empty());

    f.commands.push_bytes(b"INEDIBLE\r\n");
    f.dispatcher.drain_input();
    assert_eq!(f.diverter.angles(), vec![0]);
  }

  #[test]
  fn test_overlong_line_dropped_and_buffer_recovers() {
    let mut f = fixture();
    f.commands.push_line(&format!("GRADE_AA{}", "x".repeat(64)));
    f.commands.push_line("GRADE_B");
    f.dispatcher.drain_input();
    assert_eq!(f.diverter.angles(), vec![20]);
  }

  #[test]
  fn test_failed_diverter_move_does_not_push() {
    let mut f = fixture_with(Box::new(JammedActuator), MockActuator::new("unused"));
    assert_eq!(f.dispatcher.handle_line("GRADE_AA"), None);
    assert_eq!(f.signals.try_take(), None);
  }

  #[tokio::test(start_paused = true)]
  async fn test_run_picks_up_input_within_idle_interval() {
    let Fixture { commands, diverter, mut signals, dispatcher } = fixture();
    let handle = tokio::spawn(dispatcher.run());

    sleep(Duration::from_millis(100)).await;
    commands.push_line("GRADE_AA");
    sleep(Duration::from_millis(25)).await;

    assert_eq!(diverter.angles(), vec![63]);
    assert_eq!(signals.try_take(), Some(EjectorSignal::Push));
    handle.abort();
  }
}
