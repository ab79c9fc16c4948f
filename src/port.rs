// src/port.rs
//
// Serial port session: open a device node at a baud rate and perform single
// bounded reads from it. There is no read loop and no reassembly; callers poll.
//
// Framing, parity and flow control stay at the serialport crate's defaults
// (8N1, no flow control).

use std::io::Read;
use std::time::Duration;

use crate::error::{BridgeError, BridgeResult};

// ============================================================================
// Constants
// ============================================================================

/// Size of the buffer used for one read
pub const READ_BUFFER_SIZE: usize = 256;

// ============================================================================
// Opening
// ============================================================================

/// Byte source returned by an opened port
pub type PortStream = Box<dyn Read + Send>;

/// Opens device paths as serial connections.
pub trait PortOpener {
    fn open(&self, path: &str, baud_rate: u32) -> BridgeResult<PortStream>;
}

/// Opens real serial ports through the serialport crate.
pub struct SystemPortOpener {
    read_timeout: Duration,
}

impl SystemPortOpener {
    pub fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }
}

impl PortOpener for SystemPortOpener {
    fn open(&self, path: &str, baud_rate: u32) -> BridgeResult<PortStream> {
        let port = serialport::new(path, baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| BridgeError::PortOpen {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(SystemPort(port)))
    }
}

struct SystemPort(Box<dyn serialport::SerialPort>);

impl Read for SystemPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

// ============================================================================
// Session
// ============================================================================

/// An open port. Dropping the session closes the underlying handle.
pub struct PortSession {
    path: String,
    baud_rate: u32,
    stream: PortStream,
}

impl PortSession {
    pub fn open(opener: &dyn PortOpener, path: &str, baud_rate: u32) -> BridgeResult<Self> {
        if baud_rate == 0 {
            return Err(BridgeError::PortOpen {
                path: path.to_string(),
                reason: "baud rate must be greater than zero".to_string(),
            });
        }

        let stream = opener.open(path, baud_rate)?;
        tlog!("[port] Opened {} at {} baud", path, baud_rate);

        Ok(Self {
            path: path.to_string(),
            baud_rate,
            stream,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// One read attempt into a `READ_BUFFER_SIZE` buffer.
    /// `Ok(None)` when nothing arrived (end of stream, timeout, interrupted).
    pub fn read_chunk(&mut self) -> BridgeResult<Option<Vec<u8>>> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        match self.stream.read(&mut buffer) {
            Ok(0) => Ok(None),
            Ok(n) => Ok(Some(buffer[..n].to_vec())),
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(BridgeError::Read(e)),
        }
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        tlog!("[port] Closed {}", self.path);
    }
}

// ============================================================================
// Test support
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// One scripted outcome per read call
    pub enum Step {
        Data(Vec<u8>),
        Error(std::io::ErrorKind),
    }

    struct ScriptedPort(VecDeque<Step>);

    impl Read for ScriptedPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.pop_front() {
                Some(Step::Data(bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Some(Step::Error(kind)) => Err(std::io::Error::new(kind, "scripted")),
                None => Ok(0),
            }
        }
    }

    /// Records every open call and hands out scripted ports.
    #[derive(Clone, Default)]
    pub struct ScriptedOpener {
        opened: Arc<Mutex<Vec<(String, u32)>>>,
        scripts: Arc<Mutex<VecDeque<Vec<Step>>>>,
        fail_with: Option<String>,
    }

    impl ScriptedOpener {
        pub fn with_script(self, steps: Vec<Step>) -> Self {
            self.scripts.lock().unwrap().push_back(steps);
            self
        }

        pub fn failing(reason: &str) -> Self {
            Self {
                fail_with: Some(reason.to_string()),
                ..Self::default()
            }
        }

        pub fn opened(&self) -> Vec<(String, u32)> {
            self.opened.lock().unwrap().clone()
        }
    }

    impl PortOpener for ScriptedOpener {
        fn open(&self, path: &str, baud_rate: u32) -> BridgeResult<PortStream> {
            if let Some(reason) = &self.fail_with {
                return Err(BridgeError::PortOpen {
                    path: path.to_string(),
                    reason: reason.clone(),
                });
            }
            self.opened.lock().unwrap().push((path.to_string(), baud_rate));
            let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
            Ok(Box::new(ScriptedPort(steps.into())))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::testing::{ScriptedOpener, Step};
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn test_read_chunk_outcomes() {
        let opener = ScriptedOpener::default().with_script(vec![
            Step::Data(b"AT\r\n".to_vec()),
            Step::Error(ErrorKind::TimedOut),
            Step::Error(ErrorKind::Interrupted),
            Step::Error(ErrorKind::BrokenPipe),
        ]);
        let mut session = PortSession::open(&opener, "/dev/ttyS0", 9600).unwrap();

        assert_eq!(session.read_chunk().unwrap(), Some(b"AT\r\n".to_vec()));
        assert_eq!(session.read_chunk().unwrap(), None);
        assert_eq!(session.read_chunk().unwrap(), None);
        assert_eq!(session.read_chunk().unwrap_err().kind(), "read_failure");
        // Script exhausted: end of stream
        assert_eq!(session.read_chunk().unwrap(), None);
    }

    #[test]
    fn test_read_is_bounded_by_buffer_size() {
        let opener = ScriptedOpener::default().with_script(vec![Step::Data(vec![0xAA; 1000])]);
        let mut session = PortSession::open(&opener, "/dev/ttyUSB0", 115200).unwrap();

        let chunk = session.read_chunk().unwrap().unwrap();
        assert_eq!(chunk.len(), READ_BUFFER_SIZE);
    }

    #[test]
    fn test_zero_baud_rejected_before_open() {
        let opener = ScriptedOpener::default();
        let err = PortSession::open(&opener, "/dev/ttyS0", 0).err().unwrap();
        assert_eq!(err.kind(), "port_open_failure");
        assert!(opener.opened().is_empty());
    }

    #[test]
    fn test_session_reports_path_and_baud() {
        let opener = ScriptedOpener::default();
        let session = PortSession::open(&opener, "/dev/ttyACM0", 57600).unwrap();
        assert_eq!(session.path(), "/dev/ttyACM0");
        assert_eq!(session.baud_rate(), 57600);
        assert_eq!(opener.opened(), vec![("/dev/ttyACM0".to_string(), 57600)]);
    }

    #[test]
    fn test_system_opener_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttyNOPE0");
        let opener = SystemPortOpener::new(Duration::from_millis(10));

        let err = PortSession::open(&opener, &path.to_string_lossy(), 9600).err().unwrap();
        assert_eq!(err.kind(), "port_open_failure");
        assert!(err.to_string().contains("ttyNOPE0"));
    }
}
