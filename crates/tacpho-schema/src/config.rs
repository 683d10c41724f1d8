use crate::devices::DeviceGroupMap;
use crate::types::ImageRef;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;
pub const DEFAULT_IMAGE_NAME: &str = "kmdouglass/rpi-micromanager";
pub const DEFAULT_IMAGE_TAG: &str = "latest";
/// Mount point of the script directory inside the Micro-Manager image.
pub const DEFAULT_USERDATA_DIR: &str = "/home/micro-manager/app/userdata";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("unsupported config_version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("image.{0} must not be empty")]
    EmptyImageField(&'static str),
    #[error("container.userdata_dir must be an absolute path: '{0}'")]
    RelativeUserdataDir(String),
    #[error("device group name must not be empty")]
    EmptyGroupName,
}

/// Process-wide launcher settings. Built once, then read-only.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LauncherConfig {
    #[serde(default = "default_version")]
    pub config_version: u32,
    #[serde(default)]
    pub image: ImageSection,
    #[serde(default)]
    pub container: ContainerSection,
    #[serde(default)]
    pub runtime: RuntimeSection,
    #[serde(default = "DeviceGroupMap::raspberry_pi")]
    pub devices: DeviceGroupMap,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ImageSection {
    #[serde(default = "default_image_name")]
    pub name: String,
    #[serde(default = "default_image_tag")]
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ContainerSection {
    #[serde(default = "default_userdata_dir")]
    pub userdata_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RuntimeSection {
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION,
            image: ImageSection::default(),
            container: ContainerSection::default(),
            runtime: RuntimeSection::default(),
            devices: DeviceGroupMap::raspberry_pi(),
        }
    }
}

impl Default for ImageSection {
    fn default() -> Self {
        Self {
            name: default_image_name(),
            tag: default_image_tag(),
        }
    }
}

impl Default for ContainerSection {
    fn default() -> Self {
        Self {
            userdata_dir: default_userdata_dir(),
        }
    }
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

impl LauncherConfig {
    /// Apply command-line overrides on top of the configured image.
    pub fn image_ref(&self, name: Option<&str>, tag: Option<&str>) -> ImageRef {
        ImageRef::new(
            name.unwrap_or(&self.image.name),
            tag.unwrap_or(&self.image.tag),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.config_version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.config_version));
        }
        if self.image.name.trim().is_empty() {
            return Err(ConfigError::EmptyImageField("name"));
        }
        if self.image.tag.trim().is_empty() {
            return Err(ConfigError::EmptyImageField("tag"));
        }
        if !self.container.userdata_dir.is_absolute() {
            return Err(ConfigError::RelativeUserdataDir(
                self.container.userdata_dir.display().to_string(),
            ));
        }
        if self.devices.iter().any(|(group, _)| group.trim().is_empty()) {
            return Err(ConfigError::EmptyGroupName);
        }
        Ok(())
    }

    /// Load the file at `path`, or the defaults when `path` is `None` and the
    /// default location holds no file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => parse_config_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => parse_config_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_image_name() -> String {
    DEFAULT_IMAGE_NAME.to_owned()
}

fn default_image_tag() -> String {
    DEFAULT_IMAGE_TAG.to_owned()
}

fn default_userdata_dir() -> PathBuf {
    PathBuf::from(DEFAULT_USERDATA_DIR)
}

fn default_backend() -> String {
    "docker".to_owned()
}

/// `~/.config/tacpho/launcher.toml`, when `HOME` is set.
pub fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config/tacpho/launcher.toml"))
}

pub fn parse_config_str(input: &str) -> Result<LauncherConfig, ConfigError> {
    let config: LauncherConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_config_file(path: impl AsRef<Path>) -> Result<LauncherConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(&content)
}
