// src/drivers.rs
//
// Serial driver discovery from the kernel TTY driver table (/proc/tty/drivers).
//
// Line format (columns are space padded):
//   <driver name, 21 chars> <node prefix> <major> <minor range> <type>
//   serial               /dev/ttyS       4 64-111 serial
//   usbserial            /dev/ttyUSB   188 0-511 serial
//
// Driver names may contain spaces, so the name is taken from the fixed-width
// column rather than from the split fields.

use serde::Serialize;
use std::io::BufRead;
use std::path::Path;

use crate::error::{BridgeError, BridgeResult};

// ============================================================================
// Constants
// ============================================================================

/// Width of the driver name column
const NAME_COLUMN_WIDTH: usize = 0x15;

/// Minimum number of fields for a usable line
const MIN_FIELDS: usize = 5;

/// Type tag of serial-capable drivers (last field)
const SERIAL_TAG: &str = "serial";

// ============================================================================
// Types
// ============================================================================

/// A registered character-device driver that exposes serial ports.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Driver {
    pub name: String,
    /// Prefix of the absolute path of every device node this driver owns
    pub device_root_prefix: String,
}

// ============================================================================
// Parsing
// ============================================================================

/// Split on runs of spaces. A leading run yields an empty first field and
/// trailing empty fields are dropped.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = line;
    loop {
        match rest.find(' ') {
            Some(idx) => {
                fields.push(&rest[..idx]);
                rest = rest[idx..].trim_start_matches(' ');
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Parse one table line. Returns `None` for anything that is not a serial driver.
pub fn parse_driver_line(line: &str) -> Option<Driver> {
    let fields = split_fields(line);
    if fields.len() < MIN_FIELDS || fields[fields.len() - 1] != SERIAL_TAG {
        return None;
    }

    let name_column: String = line.chars().take(NAME_COLUMN_WIDTH).collect();
    Some(Driver {
        name: name_column.trim().to_string(),
        device_root_prefix: fields[fields.len() - 4].to_string(),
    })
}

/// Parse a whole table, keeping file order and skipping lines that don't qualify.
pub fn parse_driver_table(content: &str) -> Vec<Driver> {
    content.lines().filter_map(parse_driver_line).collect()
}

/// Read and parse the driver table at `path`.
pub fn read_driver_table(path: &Path) -> BridgeResult<Vec<Driver>> {
    let file = std::fs::File::open(path).map_err(|e| BridgeError::io(path, e))?;
    let reader = std::io::BufReader::new(file);

    let mut drivers = Vec::new();
    for raw in reader.split(b'\n') {
        let raw = raw.map_err(|e| BridgeError::io(path, e))?;
        let line = String::from_utf8_lossy(&raw);
        if let Some(driver) = parse_driver_line(line.trim_end_matches('\r')) {
            tlog!(
                "[drivers] Found new driver {} on {}",
                driver.name,
                driver.device_root_prefix
            );
            drivers.push(driver);
        }
    }

    Ok(drivers)
}

// ============================================================================
// Tests
// ============================================================================
