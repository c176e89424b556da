use std::io::{self, Write};
use std::time::Duration;

use serialport::SerialPort;

use super::error::MotorError;

/// One-way byte link to the servo board.
pub trait Transport: Send {
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens the port. Writes give up after `timeout` with `ErrorKind::TimedOut`.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, MotorError> {
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        log::info!("Opened servo link on {} at {} baud", path, baud_rate);
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Records every frame; can be switched into a failing state.
    #[derive(Clone, Default)]
    pub struct MemoryTransport {
        frames: Arc<Mutex<Vec<Vec<u8>>>>,
        broken: Arc<AtomicBool>,
    }

    impl MemoryTransport {
        pub fn frames(&self) -> Vec<Vec<u8>> {
            self.frames.lock().unwrap().clone()
        }

        /// Frames sent to one motor, as the angle byte only.
        pub fn angles_for(&self, motor: u8) -> Vec<u8> {
            self.frames()
                .iter()
                .filter(|f| f[1] == motor)
                .map(|f| f[2])
                .collect()
        }

        pub fn clear(&self) {
            self.frames.lock().unwrap().clear();
        }

        pub fn set_broken(&self, broken: bool) {
            self.broken.store(broken, Ordering::SeqCst);
        }
    }

    impl Transport for MemoryTransport {
        fn send(&mut self, frame: &[u8]) -> io::Result<()> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "link stalled"));
            }
            self.frames.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }
}
