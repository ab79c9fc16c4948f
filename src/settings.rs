// src/settings.rs
//
// Bridge configuration persisted as JSON in the user config directory.
// Every field has a default so older or partial files keep loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Kernel table listing registered TTY drivers
pub const DEFAULT_DRIVER_TABLE: &str = "/proc/tty/drivers";
/// Directory holding device nodes
pub const DEFAULT_DEVICE_ROOT: &str = "/dev";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BridgeSettings {
    #[serde(default = "default_driver_table_path")]
    pub driver_table_path: PathBuf,
    #[serde(default = "default_device_root")]
    pub device_root: PathBuf,
    #[serde(default = "default_baud_rate")]
    pub default_baud_rate: u32,
    /// How long a single read waits for data before reporting "no data"
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_driver_table_path() -> PathBuf {
    PathBuf::from(DEFAULT_DRIVER_TABLE)
}
fn default_device_root() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE_ROOT)
}
fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            driver_table_path: default_driver_table_path(),
            device_root: default_device_root(),
            default_baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            log_dir: None,
        }
    }
}

/// `<config dir>/ttyprobe/settings.json`
pub fn default_settings_path() -> Result<PathBuf, String> {
    let config_dir =
        dirs::config_dir().ok_or_else(|| "Failed to get user config dir".to_string())?;
    Ok(config_dir.join("ttyprobe").join("settings.json"))
}

pub fn load_settings(settings_path: &Path) -> Result<BridgeSettings, String> {
    if settings_path.exists() {
        let content = std::fs::read_to_string(settings_path)
            .map_err(|e| format!("Failed to read settings: {}", e))?;

        serde_json::from_str(&content).map_err(|e| format!("Failed to parse settings: {}", e))
    } else {
        // First run: write defaults so the file can be edited
        let settings = BridgeSettings::default();
        save_settings(settings_path, &settings)?;
        tlog!(
            "[settings] Created default settings at {}",
            settings_path.display()
        );
        Ok(settings)
    }
}

pub fn save_settings(settings_path: &Path, settings: &BridgeSettings) -> Result<(), String> {
    if let Some(parent) = settings_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config dir: {}", e))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;

    std::fs::write(settings_path, content).map_err(|e| format!("Failed to write settings: {}", e))
}
