use std::io::{self, BufReader, Read};
use std::thread;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::mpsc::error::TryRecvError;

use crate::sorter_hal::{CommandSource, HalResult};

/// Grade commands arriving on stdin (the serial console on the real line).  A reader thread does
/// the blocking reads so `read_byte` never blocks the runtime.
pub struct StdinCommandSource {
    rx: UnboundedReceiver<u8>,
    closed: bool,
}

impl StdinCommandSource {
    pub fn spawn() -> HalResult<Self> {
        Self::from_reader(io::stdin())
    }

    pub fn from_reader(reader: impl Read + Send + 'static) -> HalResult<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name(String::from("stdin-reader"))
            .spawn(move || {
                for byte in BufReader::new(reader).bytes() {
                    match byte {
                        Ok(byte) => {
                            if tx.send(byte).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("stdin read failed: {e}");
                            break;
                        }
                    }
                }
                debug!("stdin reader exiting");
            })?;
        Ok(Self { rx, closed: false })
    }
}

impl CommandSource for StdinCommandSource {
    fn read_byte(&mut self) -> HalResult<Option<u8>> {
        match self.rx.try_recv() {
            Ok(byte) => Ok(Some(byte)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    info!("Command input closed, no further grade commands");
                    self.closed = true;
                }
                Ok(None)
            }
        }
    }
}
