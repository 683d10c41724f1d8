use crate::types::{AccessMode, ImageRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A host device file exposed inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBinding {
    pub host_path: PathBuf,
    pub container_path: PathBuf,
    pub mode: AccessMode,
}

impl DeviceBinding {
    /// Expose `path` at the same location inside the container, read-write.
    pub fn identity(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            container_path: path.clone(),
            host_path: path,
            mode: AccessMode::ReadWrite,
        }
    }
}

impl fmt::Display for DeviceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.host_path.display(),
            self.container_path.display(),
            self.mode
        )
    }
}

/// A host directory bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeBinding {
    pub host_dir: PathBuf,
    pub container_dir: PathBuf,
    pub mode: AccessMode,
}

impl fmt::Display for VolumeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.host_dir.display(),
            self.container_dir.display(),
            self.mode
        )
    }
}

/// Everything a runtime backend needs to start one container.
///
/// `None` for `devices`, `group_add` or `volume` means the constraint is not
/// set at all. An empty list is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchConfig {
    pub image: ImageRef,
    pub detach: bool,
    pub devices: Option<Vec<DeviceBinding>>,
    pub group_add: Option<Vec<u32>>,
    pub volume: Option<VolumeBinding>,
    pub tty: bool,
    pub auto_remove: bool,
}
