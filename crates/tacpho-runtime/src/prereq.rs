use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check the host tools needed by the named runtime backend.
/// An empty list means all prerequisites are met.
pub fn check_runtime_prereqs(backend: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();
    match backend {
        "docker" if !command_exists("docker") => missing.push(MissingPrereq {
            name: "docker".to_owned(),
            purpose: "pulling and running the application image",
            install_hint: "curl -sSL https://get.docker.com | sh",
        }),
        "podman" if !command_exists("podman") => missing.push(MissingPrereq {
            name: "podman".to_owned(),
            purpose: "pulling and running the application image",
            install_hint: "apt install podman | dnf install podman",
        }),
        _ => {}
    }
    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nmm needs a container runtime to pull and run the Micro-Manager image.");
    msg
}
