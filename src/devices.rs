// src/devices.rs
//
// Serial device enumeration: expands each serial driver into the device nodes
// found directly under the device root (/dev).
//
// Everything is computed lazily and kept for the life of the enumerator. A
// device attached after the first listing only shows up in a new enumerator.
// A failed read leaves its cell empty, so the next call tries again.
//
// Matching is a plain string prefix on the absolute path, so a driver rooted
// at /dev/tty also claims /dev/ttyUSB0.

use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::drivers::{read_driver_table, Driver};
use crate::error::{BridgeError, BridgeResult};
use crate::settings::BridgeSettings;

/// A device node found under the device root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceNode {
    pub absolute_path: String,
    /// Entry name under the device root (e.g. "ttyUSB0")
    pub name: String,
}

pub struct DeviceEnumerator {
    driver_table_path: PathBuf,
    device_root: PathBuf,
    drivers: OnceCell<Vec<Driver>>,
    root_entries: OnceCell<Vec<DeviceNode>>,
    devices: HashMap<Driver, Vec<DeviceNode>>,
}

impl DeviceEnumerator {
    pub fn new(driver_table_path: impl Into<PathBuf>, device_root: impl Into<PathBuf>) -> Self {
        Self {
            driver_table_path: driver_table_path.into(),
            device_root: device_root.into(),
            drivers: OnceCell::new(),
            root_entries: OnceCell::new(),
            devices: HashMap::new(),
        }
    }

    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self::new(&settings.driver_table_path, &settings.device_root)
    }

    /// Serial drivers from the driver table, read on first use.
    pub fn list_serial_drivers(&self) -> BridgeResult<&[Driver]> {
        self.drivers
            .get_or_try_init(|| read_driver_table(&self.driver_table_path))
            .map(Vec::as_slice)
    }

    /// Device nodes owned by `driver`, memoized per driver.
    pub fn list_devices(&mut self, driver: &Driver) -> BridgeResult<Vec<DeviceNode>> {
        if let Some(devices) = self.devices.get(driver) {
            return Ok(devices.clone());
        }

        let devices: Vec<DeviceNode> = self
            .root_entries()?
            .iter()
            .filter(|node| node.absolute_path.starts_with(&driver.device_root_prefix))
            .cloned()
            .collect();

        for device in &devices {
            tlog!("[devices] Found new device: {}", device.absolute_path);
        }

        self.devices.insert(driver.clone(), devices.clone());
        Ok(devices)
    }

    /// `"<device name> (<driver name>)"` for every device of every serial driver.
    pub fn list_all_device_labels(&mut self) -> Vec<String> {
        self.collect_all("labels", |driver, device| {
            format!("{} ({})", device.name, driver.name)
        })
    }

    /// Absolute path of every device of every serial driver.
    pub fn list_all_device_paths(&mut self) -> Vec<String> {
        self.collect_all("paths", |_, device| device.absolute_path.clone())
    }

    /// Walk drivers × devices. Failures are logged and whatever was
    /// collected so far is returned.
    fn collect_all<F>(&mut self, what: &str, mut render: F) -> Vec<String>
    where
        F: FnMut(&Driver, &DeviceNode) -> String,
    {
        let mut out = Vec::new();

        let drivers = match self.list_serial_drivers() {
            Ok(drivers) => drivers.to_vec(),
            Err(e) => {
                tlog!("[devices] Error getting all device {}: {}", what, e);
                return out;
            }
        };

        for driver in &drivers {
            match self.list_devices(driver) {
                Ok(devices) => out.extend(devices.iter().map(|device| render(driver, device))),
                Err(e) => {
                    tlog!(
                        "[devices] Error listing devices for driver {}: {}",
                        driver.name,
                        e
                    );
                }
            }
        }

        out
    }

    fn root_entries(&self) -> BridgeResult<&[DeviceNode]> {
        self.root_entries
            .get_or_try_init(|| list_root(&self.device_root))
            .map(Vec::as_slice)
    }
}

/// List entries directly under `root`, sorted by name.
fn list_root(root: &Path) -> BridgeResult<Vec<DeviceNode>> {
    let root = std::path::absolute(root).map_err(|e| BridgeError::io(root, e))?;
    let entries = std::fs::read_dir(&root).map_err(|e| BridgeError::io(&root, e))?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BridgeError::io(&root, e))?;
        nodes.push(DeviceNode {
            absolute_path: entry.path().to_string_lossy().to_string(),
            name: entry.file_name().to_string_lossy().to_string(),
        });
    }
    nodes.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fake /proc/tty/drivers + /dev pair. Driver prefixes point into the fake dev dir.
    fn fixture(prefixes: &[(&str, &str)], nodes: &[&str]) -> (TempDir, DeviceEnumerator) {
        let dir = tempfile::tempdir().unwrap();
        let dev = dir.path().join("dev");
        std::fs::create_dir(&dev).unwrap();
        for node in nodes {
            std::fs::write(dev.join(node), b"").unwrap();
        }

        let mut table = String::new();
        for (name, prefix) in prefixes {
            table.push_str(&format!(
                "{:<21}{}   188 0-511 serial\n",
                name,
                format!("{}/{}", dev.display(), prefix)
            ));
        }
        table.push_str("pty_slave            /dev/pts      136 0-1048575 pty:slave\n");
        let table_path = dir.path().join("drivers");
        std::fs::write(&table_path, table).unwrap();

        let enumerator = DeviceEnumerator::new(&table_path, &dev);
        (dir, enumerator)
    }

    fn driver_named(e: &DeviceEnumerator, name: &str) -> Driver {
        e.list_serial_drivers()
            .unwrap()
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_list_devices_filters_by_prefix() {
        let (dir, mut e) = fixture(&[("serial", "ttyS")], &["ttyS0", "ttyS1", "ttyUSB0", "null"]);
        let serial = driver_named(&e, "serial");

        let devices = e.list_devices(&serial).unwrap();
        let names: Vec<_> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ttyS0", "ttyS1"]);
        for device in &devices {
            assert!(device.absolute_path.starts_with(&serial.device_root_prefix));
        }
        assert_eq!(
            devices[0].absolute_path,
            dir.path().join("dev").join("ttyS0").to_string_lossy()
        );
    }

    #[test]
    fn test_prefix_match_is_not_segment_aware() {
        let (_dir, mut e) = fixture(&[("tty", "tty")], &["tty", "ttyS0", "ttyUSB0", "ttyfoo", "null"]);
        let tty = driver_named(&e, "tty");

        let names: Vec<_> = e.list_devices(&tty).unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["tty", "ttyS0", "ttyUSB0", "ttyfoo"]);
    }

    #[test]
    fn test_device_lists_are_memoized() {
        let (dir, mut e) = fixture(&[("serial", "ttyS")], &["ttyS0"]);
        let serial = driver_named(&e, "serial");

        let first = e.list_devices(&serial).unwrap();
        // Attached after the first listing: must not appear
        std::fs::write(dir.path().join("dev").join("ttyS1"), b"").unwrap();
        let second = e.list_devices(&serial).unwrap();
        assert_eq!(first, second);
        assert_eq!(e.list_all_device_paths().len(), 1);

        // A new enumerator sees it
        let mut fresh = DeviceEnumerator::new(dir.path().join("drivers"), dir.path().join("dev"));
        assert_eq!(fresh.list_all_device_paths().len(), 2);
    }

    #[test]
    fn test_driver_list_is_memoized() {
        let (dir, e) = fixture(&[("serial", "ttyS")], &[]);
        assert_eq!(e.list_serial_drivers().unwrap().len(), 1);
        std::fs::remove_file(dir.path().join("drivers")).unwrap();
        assert_eq!(e.list_serial_drivers().unwrap().len(), 1);
    }

    #[test]
    fn test_labels_and_paths_cover_all_drivers() {
        let (dir, mut e) = fixture(
            &[("usbserial", "ttyUSB"), ("serial", "ttyS")],
            &["ttyS0", "ttyUSB0", "ttyUSB1", "console"],
        );

        assert_eq!(
            e.list_all_device_labels(),
            vec![
                "ttyUSB0 (usbserial)".to_string(),
                "ttyUSB1 (usbserial)".to_string(),
                "ttyS0 (serial)".to_string(),
            ]
        );

        let dev = dir.path().join("dev");
        let expected: Vec<String> = ["ttyUSB0", "ttyUSB1", "ttyS0"]
            .iter()
            .map(|n| dev.join(n).to_string_lossy().to_string())
            .collect();
        assert_eq!(e.list_all_device_paths(), expected);
    }

    #[test]
    fn test_missing_driver_table_yields_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let mut e = DeviceEnumerator::new(dir.path().join("missing"), dir.path());
        assert!(e.list_serial_drivers().is_err());
        assert!(e.list_all_device_labels().is_empty());
        assert!(e.list_all_device_paths().is_empty());
    }

    #[test]
    fn test_missing_device_root_is_swallowed_by_aggregates() {
        let (dir, mut e) = fixture(&[("serial", "ttyS")], &["ttyS0"]);
        std::fs::remove_dir_all(dir.path().join("dev")).unwrap();

        let serial = driver_named(&e, "serial");
        assert_eq!(e.list_devices(&serial).unwrap_err().kind(), "io_failure");
        assert!(e.list_all_device_paths().is_empty());
    }
}
