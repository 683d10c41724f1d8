use crate::RuntimeError;
use std::io::Read;
use std::process::Child;
use tacpho_schema::{ImageRef, LaunchConfig};
use tracing::debug;

/// Decides, after the attached process exited with a non-zero code, whether
/// the container failed to start at all.
type ExitCheck = Box<dyn FnOnce(&str, i32) -> Result<(), RuntimeError> + Send>;

/// A started container process.
///
/// Owned by the caller of `start_container`. The log stream, if any, is read
/// once by `stream_logs`; `wait` reaps whatever local process backs it.
pub struct ProcessHandle {
    container_id: String,
    pub(crate) logs: Option<Box<dyn Read + Send>>,
    child: Option<Child>,
    exit_check: Option<ExitCheck>,
}

impl ProcessHandle {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            logs: None,
            child: None,
            exit_check: None,
        }
    }

    #[must_use]
    pub fn with_logs(mut self, logs: impl Read + Send + 'static) -> Self {
        self.logs = Some(Box::new(logs));
        self
    }

    /// Attach a local process (e.g. `docker start --attach`) whose stdout is
    /// the container's output.
    #[must_use]
    pub fn with_child(mut self, mut child: Child) -> Self {
        if let Some(stdout) = child.stdout.take() {
            self.logs = Some(Box::new(stdout));
        }
        self.child = Some(child);
        self
    }

    /// Run `check` from `wait` when the attached process exits non-zero. An
    /// error from `check` replaces the exit code.
    #[must_use]
    pub fn with_exit_check(
        mut self,
        check: impl FnOnce(&str, i32) -> Result<(), RuntimeError> + Send + 'static,
    ) -> Self {
        self.exit_check = Some(Box::new(check));
        self
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn has_logs(&self) -> bool {
        self.logs.is_some()
    }

    /// Release the log stream and wait for the backing process.
    ///
    /// Returns the exit code of the attached process, or `None` when there is
    /// no local process or it was killed by a signal. Fails when the exit
    /// check reports that the container never started.
    pub fn wait(mut self) -> Result<Option<i32>, RuntimeError> {
        self.logs = None;
        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        let status = child.wait()?;
        debug!("container {} attach exited with {status}", self.container_id);
        let code = status.code();
        if code != Some(0) {
            if let Some(check) = self.exit_check.take() {
                check(&self.container_id, code.unwrap_or(-1))?;
            }
        }
        Ok(code)
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("container_id", &self.container_id)
            .field("has_logs", &self.logs.is_some())
            .field("attached", &self.child.is_some())
            .field("exit_check", &self.exit_check.is_some())
            .finish()
    }
}

pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Download `image` into the local image store.
    fn pull_image(&self, image: &ImageRef) -> Result<(), RuntimeError>;

    /// Start a container from `config.image`, running `command` if given.
    fn start_container(
        &self,
        command: Option<&str>,
        config: LaunchConfig,
    ) -> Result<ProcessHandle, RuntimeError>;
}

pub fn select_backend(name: &str) -> Result<Box<dyn ContainerRuntime>, RuntimeError> {
    match name {
        "docker" | "podman" => Ok(Box::new(crate::cli::CliBackend::new(name))),
        "mock" => Ok(Box::new(crate::mock::MockRuntime::new())),
        other => Err(RuntimeError::UnknownBackend(other.to_owned())),
    }
}
