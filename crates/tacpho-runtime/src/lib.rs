//! Host integration and container runtime backends for the tacpho launcher.
//!
//! This crate implements the execution layer: peripheral device discovery
//! (`host`), UNIX group resolution (`groups`), the pluggable `ContainerRuntime`
//! trait with a CLI-driven docker/podman backend and an in-process mock, log
//! streaming from a started container, and prerequisite checking.

pub mod backend;
pub mod cli;
pub mod groups;
pub mod host;
pub mod mock;
pub mod prereq;
pub mod stream;

pub use backend::{select_backend, ContainerRuntime, ProcessHandle};
pub use groups::{resolve_group_id, GroupLookup, SystemGroups};
pub use host::scan_devices;
pub use prereq::{check_runtime_prereqs, format_missing, MissingPrereq};
pub use stream::stream_logs;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("container runtime '{0}' is not available on this system")]
    Unavailable(String),
    #[error("image not found: {0}")]
    ImageNotFound(String),
    #[error("container runtime API error: {0}")]
    Api(String),
    #[error("the UNIX group '{0}' cannot be found on this system")]
    GroupNotFound(String),
    #[error("unknown runtime backend '{0}'")]
    UnknownBackend(String),
}
