//! Launch orchestration for the tacpho launcher.
//!
//! This crate ties together the launcher configuration, host device discovery,
//! group resolution, and runtime backends into the `Launcher`: the API behind
//! `mm pull` and `mm run`. It also owns the launch planner and the public
//! error taxonomy every command reports through.

pub mod launcher;
pub mod plan;

pub use launcher::{Launcher, Outcome};
pub use plan::{script_command, script_dir, LaunchPlanner};

use tacpho_runtime::RuntimeError;
use tacpho_schema::ConfigError;
use thiserror::Error;

/// Stable classification of a `CoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    GroupNotFound,
    Configuration,
    RuntimeUnavailable,
    RuntimeApi,
    Generic,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("the UNIX group '{group}' cannot be found on this system")]
    GroupNotFound {
        group: String,
        #[source]
        source: RuntimeError,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("config file error: {0}")]
    Config(#[from] ConfigError),
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(#[source] RuntimeError),
    #[error("container runtime error: {0}")]
    RuntimeApi(#[source] RuntimeError),
    #[error("command failed: {0}")]
    Command(#[source] RuntimeError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GroupNotFound { .. } => ErrorKind::GroupNotFound,
            Self::Configuration(_) | Self::Config(_) => ErrorKind::Configuration,
            Self::RuntimeUnavailable(_) => ErrorKind::RuntimeUnavailable,
            Self::RuntimeApi(_) => ErrorKind::RuntimeApi,
            Self::Command(_) | Self::Io(_) | Self::Serialization(_) => ErrorKind::Generic,
        }
    }

    /// The runtime reported the requested image or resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RuntimeApi(RuntimeError::ImageNotFound(_)))
    }
}

impl From<RuntimeError> for CoreError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::GroupNotFound(group) => Self::GroupNotFound {
                source: RuntimeError::GroupNotFound(group.clone()),
                group,
            },
            RuntimeError::Unavailable(_) => Self::RuntimeUnavailable(err),
            RuntimeError::ImageNotFound(_) | RuntimeError::Api(_) => Self::RuntimeApi(err),
            RuntimeError::UnknownBackend(_) => Self::Configuration(err.to_string()),
            RuntimeError::Io(_) => Self::Command(err),
        }
    }
}
