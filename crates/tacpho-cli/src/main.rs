mod commands;

use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_SUCCESS};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tacpho_core::{CoreError, Launcher};
use tacpho_schema::{ImageRef, LauncherConfig};
use tracing::error;

#[derive(Debug, Parser)]
#[command(
    name = "mm",
    version,
    about = "Run the Micro-Manager application in a container on a Raspberry Pi",
    disable_version_flag = true
)]
struct Cli {
    /// Print the version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Print debugging information.
    #[arg(short, long, default_value_t = false, global = true)]
    debug: bool,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Launcher config file (default: ~/.config/tacpho/launcher.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args)]
struct ImageArgs {
    /// Name of the image (default: kmdouglass/rpi-micromanager).
    #[arg(short, long)]
    name: Option<String>,
    /// Tag of the image (default: latest).
    #[arg(short, long)]
    tag: Option<String>,
}

impl ImageArgs {
    /// Command-line values win over the config file.
    fn resolve(&self, config: &LauncherConfig) -> ImageRef {
        config.image_ref(self.name.as_deref(), self.tag.as_deref())
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download an image of the application.
    Pull {
        #[command(flatten)]
        image: ImageArgs,
    },
    /// Run a Micro-Manager script inside the application container.
    Run {
        #[command(flatten)]
        image: ImageArgs,
        /// Print the launch plan instead of starting a container.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Path to the script. Its directory is mounted into the container.
        script: PathBuf,
    },
    /// Show which peripheral devices are present and their groups.
    Devices,
    /// Run diagnostic checks on the host and the configuration.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("TACPHO_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(EXIT_SUCCESS);
    };

    let config = cli.config.as_deref();
    let json = cli.json;
    let result = match command {
        Commands::Pull { image } => launcher(config).and_then(|launcher| {
            let image = image.resolve(launcher.config());
            commands::pull::run(&launcher, &image, json)
        }),
        Commands::Run {
            image,
            dry_run,
            script,
        } => launcher(config).and_then(|launcher| {
            let image = image.resolve(launcher.config());
            commands::run::run(&launcher, &image, &script, dry_run, json)
        }),
        Commands::Devices => {
            launcher(config).and_then(|launcher| commands::devices::run(&launcher, json))
        }
        Commands::Doctor => commands::doctor::run(config, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("mm command failed: {e}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn launcher(config: Option<&Path>) -> Result<Launcher, CoreError> {
    Launcher::new(LauncherConfig::load(config)?)
}
