use super::{colorize_status, json_pretty, EXIT_SUCCESS};
use serde::Serialize;
use std::path::PathBuf;
use tacpho_core::{CoreError, Launcher};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GroupReport {
    group: String,
    present: Vec<PathBuf>,
    missing: Vec<PathBuf>,
    gid: Option<u32>,
    error: Option<String>,
}

/// Report every configured group: which of its devices exist and, for
/// groups that will be granted, the resolved gid.
pub fn run(launcher: &Launcher, json: bool) -> Result<u8, CoreError> {
    let resolved = launcher.scan();
    let mut reports = Vec::new();
    for (group, configured) in launcher.config().devices.iter() {
        let present = resolved.get(group).unwrap_or_default().to_vec();
        let missing = configured
            .iter()
            .filter(|path| !present.contains(*path))
            .cloned()
            .collect();
        let (gid, error) = if present.is_empty() {
            (None, None)
        } else {
            match launcher.group_id(group) {
                Ok(gid) => (Some(gid), None),
                Err(e) => {
                    debug!("group '{group}' did not resolve: {e}");
                    (None, Some(e.to_string()))
                }
            }
        };
        reports.push(GroupReport {
            group: group.to_owned(),
            present,
            missing,
            gid,
            error,
        });
    }

    if json {
        println!("{}", json_pretty(&reports)?);
    } else if reports.is_empty() {
        println!("no device groups configured");
    } else {
        print_reports(&reports);
    }
    Ok(EXIT_SUCCESS)
}

fn print_reports(reports: &[GroupReport]) {
    println!("{:<10} {:<8} {:<12} DEVICE", "GROUP", "GID", "STATUS");
    for report in reports {
        let gid = match (report.gid, &report.error) {
            (Some(gid), _) => gid.to_string(),
            (None, Some(_)) => "?".to_owned(),
            (None, None) => "-".to_owned(),
        };
        for path in &report.present {
            let status = if report.error.is_some() {
                "unresolved"
            } else {
                "present"
            };
            println!(
                "{:<10} {:<8} {:<12} {}",
                report.group,
                gid,
                colorize_status(status),
                path.display()
            );
        }
        for path in &report.missing {
            println!(
                "{:<10} {:<8} {:<12} {}",
                report.group,
                "-",
                colorize_status("missing"),
                path.display()
            );
        }
    }
}
