// src/bridge.rs
//
// Method-call bridge exposed to the host application.
//
// A host sends `MethodCall { method, arguments }` and gets back one of:
//   - success with a JSON value
//   - an `ERROR` result with a taxonomy kind, a headline and details
//   - a distinct "not implemented" result for unknown methods
//
// Discovery and inspection degrade silently (empty list, null, false).
// Port open/read failures and missing arguments are reported.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::devices::DeviceEnumerator;
use crate::error::{BridgeError, BridgeResult};
use crate::inspect::{self, DeviceInfo};
use crate::port::{PortOpener, PortSession, SystemPortOpener};
use crate::settings::BridgeSettings;

// ============================================================================
// Constants
// ============================================================================

/// Code carried by every error result
pub const ERROR_CODE: &str = "ERROR";

const ARG_DEVICE_PATH: &str = "devicePath";
const ARG_BAUD_RATE: &str = "baudRate";
/// Spelling used by older hosts
const ARG_BAUD_RATE_LEGACY: &str = "baudrate";

// ============================================================================
// Types
// ============================================================================

/// A request from the host
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Named argument; `null` counts as absent
    fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key).filter(|v| !v.is_null())
    }

    fn device_path(&self) -> BridgeResult<String> {
        match self.argument(ARG_DEVICE_PATH) {
            None => Err(BridgeError::MissingArgument(ARG_DEVICE_PATH)),
            Some(Value::String(path)) => Ok(path.clone()),
            Some(other) => Err(BridgeError::InvalidArgument {
                name: ARG_DEVICE_PATH,
                reason: format!("expected a string, got {}", other),
            }),
        }
    }

    fn baud_rate(&self) -> BridgeResult<Option<u32>> {
        let value = match self
            .argument(ARG_BAUD_RATE)
            .or_else(|| self.argument(ARG_BAUD_RATE_LEGACY))
        {
            Some(v) => v,
            None => return Ok(None),
        };

        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .map(Some)
            .ok_or_else(|| BridgeError::InvalidArgument {
                name: ARG_BAUD_RATE,
                reason: format!("expected a positive integer, got {}", value),
            })
    }
}

/// Response to a `MethodCall`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResult {
    Success {
        value: Value,
    },
    Error {
        code: String,
        kind: String,
        message: String,
        details: Option<String>,
    },
    NotImplemented {
        method: String,
    },
}

impl MethodResult {
    pub fn success(value: Value) -> Self {
        MethodResult::Success { value }
    }

    /// Error result with `headline` as the message. Argument errors use their
    /// own message since they describe what the caller got wrong.
    pub fn failure(headline: &str, err: &BridgeError) -> Self {
        let (message, details) = match err {
            BridgeError::MissingArgument(ARG_DEVICE_PATH) => {
                ("Device path is required".to_string(), None)
            }
            BridgeError::MissingArgument(_) => (err.to_string(), None),
            BridgeError::InvalidArgument { .. } => (err.to_string(), None),
            _ => (headline.to_string(), Some(err.to_string())),
        };
        MethodResult::Error {
            code: ERROR_CODE.to_string(),
            kind: err.kind().to_string(),
            message,
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodResult::Success { .. })
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Owns the enumerator caches and the single active port session.
pub struct SerialBridge {
    enumerator: DeviceEnumerator,
    opener: Box<dyn PortOpener>,
    session: Option<PortSession>,
    default_baud_rate: u32,
}

impl SerialBridge {
    /// Bridge backed by real serial ports.
    pub fn new(settings: &BridgeSettings) -> Self {
        let opener = SystemPortOpener::new(Duration::from_millis(settings.read_timeout_ms));
        Self::with_opener(settings, Box::new(opener))
    }

    pub fn with_opener(settings: &BridgeSettings, opener: Box<dyn PortOpener>) -> Self {
        Self {
            enumerator: DeviceEnumerator::from_settings(settings),
            opener,
            session: None,
            default_baud_rate: settings.default_baud_rate,
        }
    }

    /// Dispatch one call from the host.
    pub fn handle(&mut self, call: &MethodCall) -> MethodResult {
        match call.method.as_str() {
            "listAllDeviceLabels" | "getAllDevices" => {
                MethodResult::success(json!(self.list_all_device_labels()))
            }
            "listAllDevicePaths" | "getAllDevicesPath" => {
                MethodResult::success(json!(self.list_all_device_paths()))
            }
            "isDeviceAccessible" => match call.device_path() {
                Ok(path) => MethodResult::success(json!(self.is_device_accessible(&path))),
                Err(e) => MethodResult::failure("Failed to check device", &e),
            },
            "getDeviceInfo" => match call.device_path() {
                Ok(path) => MethodResult::success(json!(self.device_info(&path))),
                Err(e) => MethodResult::failure("Failed to get device info", &e),
            },
            "openPort" => {
                let opened = call.device_path().and_then(|path| {
                    let baud_rate = call.baud_rate()?;
                    self.open_port(&path, baud_rate)
                });
                match opened {
                    Ok(()) => MethodResult::success(json!(true)),
                    Err(e) => {
                        tlog!("[bridge] openPort failed: {}", e);
                        MethodResult::failure("Failed to open port", &e)
                    }
                }
            }
            "readData" => match self.read_data() {
                Ok(data) => MethodResult::success(json!(data)),
                Err(e) => {
                    tlog!("[bridge] readData failed: {}", e);
                    MethodResult::failure("Failed to read data", &e)
                }
            },
            other => {
                tlog!("[bridge] Method '{}' is not implemented", other);
                MethodResult::NotImplemented {
                    method: other.to_string(),
                }
            }
        }
    }

    pub fn list_all_device_labels(&mut self) -> Vec<String> {
        self.enumerator.list_all_device_labels()
    }

    pub fn list_all_device_paths(&mut self) -> Vec<String> {
        self.enumerator.list_all_device_paths()
    }

    pub fn is_device_accessible(&self, path: &str) -> bool {
        inspect::is_accessible(path)
    }

    pub fn device_info(&self, path: &str) -> Option<DeviceInfo> {
        inspect::inspect(path)
    }

    /// Open `path` and make it the active session. On failure the previous
    /// session (if any) stays active.
    pub fn open_port(&mut self, path: &str, baud_rate: Option<u32>) -> BridgeResult<()> {
        let baud_rate = baud_rate.unwrap_or(self.default_baud_rate);
        let session = PortSession::open(self.opener.as_ref(), path, baud_rate)?;
        self.session = Some(session);
        Ok(())
    }

    /// Single read from the active session. No session means no data.
    pub fn read_data(&mut self) -> BridgeResult<Option<Vec<u8>>> {
        match self.session.as_mut() {
            Some(session) => session.read_chunk(),
            None => Ok(None),
        }
    }

    pub fn active_session(&self) -> Option<&PortSession> {
        self.session.as_ref()
    }

    pub fn enumerator(&self) -> &DeviceEnumerator {
        &self.enumerator
    }
}

// ============================================================================
// Tests
// ============================================================================
