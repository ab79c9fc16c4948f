// src/inspect.rs
//
// Best-effort probe of a single device path. Nothing here surfaces errors:
// a missing path or a failed probe is reported as "absent" / false.

use serde::Serialize;
use std::fs::Metadata;
use std::path::Path;

/// Coarse classification of a filesystem entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    File,
    Directory,
    /// Character/block devices, sockets, FIFOs
    Other,
}

/// Point-in-time snapshot of a device path. Never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub exists: bool,
    pub readable: bool,
    pub writable: bool,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "modified")]
    pub modified_at_epoch_ms: i64,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
}

/// True iff `path` exists (following symlinks).
pub fn is_accessible(path: &str) -> bool {
    match Path::new(path).try_exists() {
        Ok(exists) => exists,
        Err(e) => {
            tlog!("[inspect] Error checking device accessibility of {}: {}", path, e);
            false
        }
    }
}

/// Snapshot of `path`, or `None` if it does not exist or cannot be probed.
pub fn inspect(path: &str) -> Option<DeviceInfo> {
    let file_path = Path::new(path);
    let metadata = match std::fs::metadata(file_path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tlog!("[inspect] Error getting device info for {}: {}", path, e);
            return None;
        }
    };

    let name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Some(DeviceInfo {
        path: path.to_string(),
        name,
        exists: true,
        readable: can_read(file_path, &metadata),
        writable: can_write(file_path, &metadata),
        size_bytes: metadata.len(),
        modified_at_epoch_ms: modified_ms(&metadata),
        kind: classify(&metadata),
    })
}

fn classify(metadata: &Metadata) -> DeviceKind {
    if metadata.is_file() {
        DeviceKind::File
    } else if metadata.is_dir() {
        DeviceKind::Directory
    } else {
        DeviceKind::Other
    }
}

fn modified_ms(metadata: &Metadata) -> i64 {
    metadata
        .modified()
        .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis())
        .unwrap_or(0)
}

// Effective rights of this process, as access(2) reports them
#[cfg(unix)]
fn can_read(path: &Path, _metadata: &Metadata) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::R_OK).is_ok()
}

#[cfg(unix)]
fn can_write(path: &Path, _metadata: &Metadata) -> bool {
    nix::unistd::access(path, nix::unistd::AccessFlags::W_OK).is_ok()
}

#[cfg(not(unix))]
fn can_read(_path: &Path, _metadata: &Metadata) -> bool {
    true
}

#[cfg(not(unix))]
fn can_write(_path: &Path, metadata: &Metadata) -> bool {
    !metadata.permissions().readonly()
}
