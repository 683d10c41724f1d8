//! Configuration and launch-plan types for the tacpho launcher.
//!
//! This crate defines the schema layer: the TOML launcher configuration
//! (`LauncherConfig`), image references (`ImageRef`), the logical device maps
//! (`DeviceGroupMap`, `ResolvedDeviceMap`), and the immutable `LaunchConfig`
//! handed to a container runtime backend.

pub mod config;
pub mod devices;
pub mod launch;
pub mod types;

pub use config::{
    default_config_path, parse_config_file, parse_config_str, ConfigError, ContainerSection,
    ImageSection, LauncherConfig, RuntimeSection, CONFIG_VERSION, DEFAULT_IMAGE_NAME,
    DEFAULT_IMAGE_TAG, DEFAULT_USERDATA_DIR,
};
pub use devices::{DeviceGroupMap, ResolvedDeviceMap};
pub use launch::{DeviceBinding, LaunchConfig, VolumeBinding};
pub use types::{AccessMode, ImageRef};
