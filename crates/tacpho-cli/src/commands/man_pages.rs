use super::EXIT_SUCCESS;
use clap::CommandFactory;
use std::path::Path;
use tacpho_core::CoreError;
use tracing::info;

/// Write `mm.1` plus one page per subcommand into `dir`.
pub fn run<C: CommandFactory>(dir: &Path) -> Result<u8, CoreError> {
    std::fs::create_dir_all(dir)?;
    let cmd = C::command();
    render(&cmd, &dir.join("mm.1"))?;
    for sub in cmd.get_subcommands() {
        render(sub, &dir.join(format!("mm-{}.1", sub.get_name())))?;
    }
    info!("man pages written to {}", dir.display());
    Ok(EXIT_SUCCESS)
}

fn render(cmd: &clap::Command, path: &Path) -> Result<(), CoreError> {
    let mut buf = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut buf)?;
    std::fs::write(path, &buf)?;
    Ok(())
}
