use super::EXIT_SUCCESS;
use clap::CommandFactory;
use clap_complete::Shell;
use tacpho_core::CoreError;

#[allow(clippy::unnecessary_wraps)]
pub fn run<C: CommandFactory>(shell: Shell) -> Result<u8, CoreError> {
    clap_complete::generate(shell, &mut C::command(), "mm", &mut std::io::stdout());
    Ok(EXIT_SUCCESS)
}
