use super::{json_pretty, EXIT_SUCCESS};
use std::io::Write;
use std::path::Path;
use tacpho_core::{script_command, CoreError, Launcher, Outcome};
use tacpho_runtime::{stream_logs, ProcessHandle, RuntimeError};
use tacpho_schema::{ImageRef, LaunchConfig};
use tracing::{debug, info, warn};

pub fn run(
    launcher: &Launcher,
    image: &ImageRef,
    script: &Path,
    dry_run: bool,
    json: bool,
) -> Result<u8, CoreError> {
    if dry_run {
        let command = script_command(script)?;
        let plan = launcher.plan(image, Some(script))?;
        if json {
            let payload = serde_json::json!({
                "command": command,
                "launch": plan,
            });
            println!("{}", json_pretty(&payload)?);
        } else {
            print_plan(&command, &plan);
        }
        return Ok(EXIT_SUCCESS);
    }

    match launcher.run(image, script)? {
        Outcome::Started(handle) => {
            let container_id = handle.container_id().to_owned();
            let exited = stream_and_wait(handle, &mut std::io::stdout().lock())?;
            match exited {
                Some(0) | None => info!("container {container_id} finished"),
                Some(code) => warn!("container {container_id} exited with status {code}"),
            }
        }
        Outcome::Completed => debug!("no container output to stream"),
    }
    Ok(EXIT_SUCCESS)
}

/// Stream the container's output into `sink`, then wait for it. The attach
/// process is reaped even when writing to `sink` fails.
fn stream_and_wait<W: Write + ?Sized>(
    mut handle: ProcessHandle,
    sink: &mut W,
) -> Result<Option<i32>, RuntimeError> {
    let streamed =
        stream_logs(&mut handle, sink).and_then(|_| sink.flush().map_err(RuntimeError::from));
    let container_id = handle.container_id().to_owned();
    let exited = handle.wait();
    if let Err(e) = streamed {
        if let Err(wait_err) = exited {
            warn!("container {container_id}: {wait_err}");
        }
        return Err(e);
    }
    exited
}

fn print_plan(command: &str, plan: &LaunchConfig) {
    println!("image:      {}", plan.image);
    println!("command:    {command}");
    match &plan.volume {
        Some(volume) => println!("volume:     {volume}"),
        None => println!("volume:     (none)"),
    }
    match &plan.devices {
        Some(devices) => {
            for device in devices {
                println!("device:     {device}");
            }
        }
        None => println!("devices:    (none)"),
    }
    match &plan.group_add {
        Some(gids) => {
            let gids: Vec<String> = gids.iter().map(ToString::to_string).collect();
            println!("group-add:  {}", gids.join(", "));
        }
        None => println!("group-add:  (none)"),
    }
    println!(
        "detach: {}  tty: {}  auto-remove: {}",
        plan.detach, plan.tty, plan.auto_remove
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::process::{Command, Stdio};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn attached(script: &str, waited: &Arc<AtomicBool>) -> ProcessHandle {
        let child = Command::new("sh")
            .args(["-c", script])
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let waited = Arc::clone(waited);
        ProcessHandle::new("c1")
            .with_child(child)
            .with_exit_check(move |_, _| {
                waited.store(true, Ordering::SeqCst);
                Ok(())
            })
    }

    #[test]
    fn output_is_streamed_before_exit_code() {
        let waited = Arc::new(AtomicBool::new(false));
        let mut out = Vec::new();
        let code = stream_and_wait(attached("echo one; echo two; exit 4", &waited), &mut out)
            .unwrap();
        assert_eq!(out, b"one\ntwo\n");
        assert_eq!(code, Some(4));
        assert!(waited.load(Ordering::SeqCst));
    }

    #[test]
    fn failed_sink_still_reaps_process() {
        let waited = Arc::new(AtomicBool::new(false));
        let err = stream_and_wait(attached("echo one; exit 1", &waited), &mut ClosedPipe)
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Io(e) if e.kind() == io::ErrorKind::BrokenPipe));
        assert!(waited.load(Ordering::SeqCst));
    }
}
