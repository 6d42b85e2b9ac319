use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

mod commands;

/// Kiln incremental build driver.
///
/// Builds a project and its project references in dependency order,
/// skipping every project whose inputs have not changed since its last build.
///
/// EXAMPLES:
///     kiln build                          Build the project in the current directory
///     kiln build src/App -c Release       Build another project in Release
///     kiln build --no-incremental         Compile everything
///     kiln lock merge kiln.lock a.lock    Merge lock file fragments
///
/// ENVIRONMENT VARIABLES:
///     KILN_LOG              Log filter (default: info)
///     KILN_CONFIGURATION    Default build configuration
///     KILN_RUNTIME          Default runtime identifier
///     KILN_OUTPUT           Default output directory
///     KILN_BUILD_BASE_PATH  Default build base path
///     KILN_COMPILE_COMMAND  Command invoked to compile one project
///     KILN_NO_INCREMENTAL   Set to '1' to always compile everything
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a project and its project dependencies
    ///
    /// EXAMPLES:
    ///     kiln build                          Incremental build
    ///     kiln build -f net10.0 -r linux-x64  Build one framework and runtime
    ///     kiln build --build-profile          List what disables incremental builds
    #[command(visible_alias = "b")]
    Build(commands::build::BuildArgs),

    /// Lock file maintenance
    #[command(subcommand)]
    Lock(commands::lock::LockCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build(args) => {
            if !commands::build::run(args)? {
                std::process::exit(1);
            }
        }
        Commands::Lock(command) => commands::lock::run(command)?,
    }

    Ok(())
}

/// Install the log subscriber; `KILN_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("KILN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();
}
