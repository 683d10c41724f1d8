//! Container runtime backend driving the `docker` (or CLI-compatible
//! `podman`) command-line client.

use crate::backend::{ContainerRuntime, ProcessHandle};
use crate::RuntimeError;
use std::process::{Command, Output, Stdio};
use tacpho_schema::{ImageRef, LaunchConfig};
use tracing::{debug, info, warn};

pub struct CliBackend {
    program: String,
}

impl CliBackend {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn output(&self, args: &[String]) -> Result<Output, RuntimeError> {
        debug!("{} {}", self.program, args.join(" "));
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(&e))
    }

    fn spawn_error(&self, err: &std::io::Error) -> RuntimeError {
        if err.kind() == std::io::ErrorKind::NotFound {
            RuntimeError::Unavailable(self.program.clone())
        } else {
            RuntimeError::Api(format!("failed to execute {}: {err}", self.program))
        }
    }

    /// `create` the container, then `start --attach` it with its output
    /// piped into the returned handle.
    fn start_attached(
        &self,
        command: Option<&str>,
        config: &LaunchConfig,
    ) -> Result<ProcessHandle, RuntimeError> {
        let output = self.output(&container_args(command, config))?;
        if !output.status.success() {
            return Err(classify_failure(&self.program, &output));
        }
        let container_id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
        if container_id.is_empty() {
            return Err(RuntimeError::Api(format!(
                "{} create returned no container id",
                self.program
            )));
        }
        info!("created container {}", short_id(&container_id));

        let child = Command::new(&self.program)
            .args(["start", "--attach", &container_id])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                remove_container(&self.program, &container_id);
                return Err(self.spawn_error(&e));
            }
        };

        let program = self.program.clone();
        Ok(ProcessHandle::new(container_id)
            .with_child(child)
            .with_exit_check(move |id, code| check_started(&program, id, code)))
    }
}

/// Called once `start --attach` has exited with `code`. A container that ran
/// and exited non-zero is fine; one that never started is removed (`--rm`
/// does not apply to it) and reported as an error.
fn check_started(program: &str, container_id: &str, code: i32) -> Result<(), RuntimeError> {
    let output = Command::new(program)
        .args([
            "inspect",
            "--format",
            "{{.State.StartedAt}}|{{.State.Error}}",
            container_id,
        ])
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if stderr.contains("no such") {
            debug!("container {} already removed", short_id(container_id));
            return Ok(());
        }
        return Err(classify_failure(program, &output));
    }

    let state = String::from_utf8_lossy(&output.stdout);
    let state = state.trim();
    let (started_at, state_error) = state.split_once('|').unwrap_or((state, ""));
    if !never_started(started_at) {
        return Ok(());
    }

    remove_container(program, container_id);
    let reason = if state_error.is_empty() {
        format!("exit code {code}")
    } else {
        state_error.to_owned()
    };
    Err(RuntimeError::Api(format!(
        "container {} failed to start: {reason}",
        short_id(container_id)
    )))
}

/// Both docker and podman report the zero time for a container that was
/// created but never started.
fn never_started(started_at: &str) -> bool {
    started_at.is_empty() || started_at.starts_with("0001-01-01")
}

fn remove_container(program: &str, container_id: &str) {
    let removed = Command::new(program)
        .args(["rm", "--force", container_id])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match removed {
        Ok(status) if status.success() => {
            debug!("removed container {}", short_id(container_id));
        }
        Ok(status) => warn!(
            "could not remove container {} ({status})",
            short_id(container_id)
        ),
        Err(e) => warn!("could not remove container {}: {e}", short_id(container_id)),
    }
}

impl ContainerRuntime for CliBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|s| s.success())
    }

    fn pull_image(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        let output = self.output(&["pull".to_owned(), image.to_string()])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(classify_failure(&self.program, &output))
        }
    }

    fn start_container(
        &self,
        command: Option<&str>,
        config: LaunchConfig,
    ) -> Result<ProcessHandle, RuntimeError> {
        self.start_attached(command, &config)
    }
}

/// Arguments for `create`. The output is always read back through
/// `start --attach`, so `config.detach` adds no flag.
pub fn container_args(command: Option<&str>, config: &LaunchConfig) -> Vec<String> {
    let mut args = vec!["create".to_owned()];
    if config.auto_remove {
        args.push("--rm".to_owned());
    }
    if config.tty {
        args.push("--tty".to_owned());
    }
    for device in config.devices.iter().flatten() {
        args.push("--device".to_owned());
        args.push(device.to_string());
    }
    for gid in config.group_add.iter().flatten() {
        args.push("--group-add".to_owned());
        args.push(gid.to_string());
    }
    if let Some(volume) = &config.volume {
        args.push("--volume".to_owned());
        args.push(volume.to_string());
    }
    args.push(config.image.to_string());
    if let Some(command) = command {
        args.push(command.to_owned());
    }
    args
}

/// Map a failed client invocation onto a runtime error kind.
fn classify_failure(program: &str, output: &Output) -> RuntimeError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    let lower = stderr.to_lowercase();
    if lower.contains("cannot connect to the docker daemon")
        || lower.contains("is the docker daemon running")
        || lower.contains("cannot connect to podman")
    {
        return RuntimeError::Unavailable(format!("{program} ({stderr})"));
    }
    if (!lower.contains("executable file not found") && lower.contains("not found"))
        || lower.contains("manifest unknown")
        || lower.contains("pull access denied")
        || lower.contains("repository does not exist")
        || lower.contains("no such image")
    {
        return RuntimeError::ImageNotFound(stderr);
    }
    if stderr.is_empty() {
        RuntimeError::Api(format!(
            "{program} exited with code {}",
            output.status.code().unwrap_or(1)
        ))
    } else {
        RuntimeError::Api(stderr)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
