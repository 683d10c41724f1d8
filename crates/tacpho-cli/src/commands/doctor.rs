use super::{colorize_status, json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use serde::Serialize;
use std::path::Path;
use tacpho_core::CoreError;
use tacpho_runtime::{
    check_runtime_prereqs, format_missing, resolve_group_id, scan_devices, select_backend,
};
use tacpho_schema::{default_config_path, LauncherConfig, ResolvedDeviceMap};

/// Diagnose the host. Unlike the other commands a broken config is reported
/// as a failed check rather than aborting, and the remaining checks run
/// against the defaults.
pub fn run(config_path: Option<&Path>, json_output: bool) -> Result<u8, CoreError> {
    let mut checks: Vec<Check> = Vec::new();
    let mut all_pass = true;

    let config = check_config(config_path, &mut checks, &mut all_pass);
    check_runtime(&config, &mut checks, &mut all_pass);
    let resolved = check_devices(&config, &mut checks);
    check_groups(&resolved, &mut checks, &mut all_pass);

    print_results(&checks, all_pass, json_output)
}

fn check_config(
    path: Option<&Path>,
    checks: &mut Vec<Check>,
    all_pass: &mut bool,
) -> LauncherConfig {
    let source = path
        .map(Path::to_path_buf)
        .or_else(|| default_config_path().filter(|p| p.exists()));
    match LauncherConfig::load(path) {
        Ok(config) => {
            let message = match &source {
                Some(p) => format!("Config loaded from {}", p.display()),
                None => "No config file; using built-in defaults".to_owned(),
            };
            checks.push(Check::pass("config", &message));
            config
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("config", &format!("Config is invalid: {e}")));
            LauncherConfig::default()
        }
    }
}

fn check_runtime(config: &LauncherConfig, checks: &mut Vec<Check>, all_pass: &mut bool) {
    let backend = &config.runtime.backend;
    let missing = check_runtime_prereqs(backend);
    if !missing.is_empty() {
        *all_pass = false;
        checks.push(Check::fail("runtime_prereqs", &format_missing(&missing)));
        return;
    }

    match select_backend(backend) {
        Ok(runtime) if runtime.available() => checks.push(Check::pass(
            "runtime",
            &format!("Container runtime '{}' is available", runtime.name()),
        )),
        Ok(runtime) => {
            *all_pass = false;
            checks.push(Check::fail(
                "runtime",
                &format!("Container runtime '{}' does not respond", runtime.name()),
            ));
        }
        Err(e) => {
            *all_pass = false;
            checks.push(Check::fail("runtime", &e.to_string()));
        }
    }
}

fn check_devices(config: &LauncherConfig, checks: &mut Vec<Check>) -> ResolvedDeviceMap {
    let resolved = scan_devices(&config.devices);
    if resolved.is_empty() {
        checks.push(Check::warn(
            "devices",
            "No configured devices are present; the container will run without peripherals",
        ));
    } else {
        let found: Vec<String> = resolved
            .devices()
            .map(|p| p.display().to_string())
            .collect();
        checks.push(Check::pass(
            "devices",
            &format!("Devices present: {}", found.join(", ")),
        ));
    }
    resolved
}

fn check_groups(resolved: &ResolvedDeviceMap, checks: &mut Vec<Check>, all_pass: &mut bool) {
    for group in resolved.groups() {
        match resolve_group_id(group) {
            Ok(gid) => checks.push(Check::pass(
                "groups",
                &format!("Group '{group}' has gid {gid}"),
            )),
            Err(e) => {
                *all_pass = false;
                checks.push(Check::fail("groups", &e.to_string()));
            }
        }
    }
}

fn print_results(
    checks: &[Check],
    all_pass: bool,
    json_output: bool,
) -> Result<u8, CoreError> {
    if json_output {
        let json = serde_json::json!({
            "healthy": all_pass,
            "checks": checks,
        });
        println!("{}", json_pretty(&json)?);
    } else {
        println!("mm doctor\n");
        for check in checks {
            let icon = match check.status {
                "pass" => "✓",
                "fail" => "✗",
                "warn" => "⚠",
                _ => "ℹ",
            };
            println!(
                "  {icon} {:<5} {}",
                colorize_status(check.status),
                check.message
            );
        }
        println!();
        if all_pass {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if all_pass { EXIT_SUCCESS } else { EXIT_FAILURE })
}

#[derive(Debug, Serialize)]
struct Check {
    name: &'static str,
    status: &'static str,
    message: String,
}

impl Check {
    fn pass(name: &'static str, message: &str) -> Self {
        Self::new(name, "pass", message)
    }

    fn fail(name: &'static str, message: &str) -> Self {
        Self::new(name, "fail", message)
    }

    fn warn(name: &'static str, message: &str) -> Self {
        Self::new(name, "warn", message)
    }

    fn new(name: &'static str, status: &'static str, message: &str) -> Self {
        Self {
            name,
            status,
            message: message.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacpho_schema::DeviceGroupMap;

    #[test]
    fn invalid_config_fails_and_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("launcher.toml");
        std::fs::write(&path, "config_version = 7\n").unwrap();

        let mut checks = Vec::new();
        let mut all_pass = true;
        let config = check_config(Some(&path), &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert_eq!(checks[0].status, "fail");
        assert_eq!(config, LauncherConfig::default());
    }

    #[test]
    fn mock_runtime_passes() {
        let mut config = LauncherConfig::default();
        config.runtime.backend = "mock".to_owned();
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_runtime(&config, &mut checks, &mut all_pass);
        assert!(all_pass);
        assert_eq!(checks[0].status, "pass");
    }

    #[test]
    fn unknown_backend_fails() {
        let mut config = LauncherConfig::default();
        config.runtime.backend = "lxc".to_owned();
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_runtime(&config, &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert!(checks[0].message.contains("lxc"));
    }

    #[test]
    fn absent_devices_only_warn() {
        let dir = tempfile::tempdir().unwrap();
        let mut devices = DeviceGroupMap::new();
        devices.insert("gpio", [dir.path().join("gpiomem")]);
        let config = LauncherConfig {
            devices,
            ..LauncherConfig::default()
        };
        let mut checks = Vec::new();
        let resolved = check_devices(&config, &mut checks);
        assert!(resolved.is_empty());
        assert_eq!(checks[0].status, "warn");
    }

    #[test]
    fn unknown_group_fails() {
        let mut resolved = ResolvedDeviceMap::new();
        resolved.insert(
            "tacpho-no-such-group",
            vec![std::path::PathBuf::from("/dev/null")],
        );
        let mut checks = Vec::new();
        let mut all_pass = true;
        check_groups(&resolved, &mut checks, &mut all_pass);
        assert!(!all_pass);
        assert_eq!(checks[0].status, "fail");
    }
}
