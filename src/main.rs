use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use yalc::config::Config;
use yalc::core::path::set_store_dir_override;
use yalc::core::YalcError;

mod cli;

use cli::Context;

#[derive(Parser)]
#[command(name = "yalc")]
#[command(about = "Publish packages to a local store and link them into projects")]
#[command(version)]
struct Cli {
    /// Only print errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Store directory to use instead of the default
    #[arg(long, global = true, value_name = "DIR")]
    store_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the package to the local store
    Publish(cli::publish::PublishArgs),
    /// Publish and update every project using the package
    Push(cli::publish::PublishArgs),
    /// Add packages from the store to this project
    Add(cli::add::AddArgs),
    /// Symlink packages from the store without editing package.json
    Link(cli::link::LinkArgs),
    /// Refresh packages from the store
    Update(cli::update::UpdateArgs),
    /// Bring back retreated packages
    Restore(cli::restore::RestoreArgs),
    /// Remove packages from this project
    Remove(cli::remove::RemoveArgs),
    /// Remove packages but keep them in yalc.lock
    Retreat(cli::retreat::RetreatArgs),
    /// Fail if package.json references .yalc packages
    Check(cli::check::CheckArgs),
    /// Show or clean the installations registry
    #[command(subcommand)]
    Installations(cli::installations::InstallationsCommand),
    /// List packages in the store
    List(cli::list::ListArgs),
    /// Show details of a stored package
    Info {
        /// Package name
        package: String,
    },
    /// Show which projects use a stored package
    Where {
        /// Package name
        package: String,
    },
    /// Remove unused packages from the store
    Clean(cli::clean::CleanArgs),
    /// Print the store directory
    Dir,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config is read again by Context::load once logging is up.
    let quiet = cli.quiet
        || cli::current_dir()
            .ok()
            .and_then(|dir| Config::load(&dir).ok())
            .is_some_and(|config| config.quiet);
    init_tracing(quiet);

    if let Some(folder) = &cli.store_folder {
        if let Ok(cwd) = cli::current_dir() {
            set_store_dir_override(cli::absolute(&cwd, folder));
        }
    }

    let result = match Context::load(quiet, cli.store_folder.clone()) {
        Ok(ctx) => run(&ctx, cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match &e {
            // The subprocess already reported its own failure
            YalcError::SubprocessExit(code) => ExitCode::from(*code as u8),
            YalcError::ScriptFailed { code, .. } => {
                eprintln!("\n{}", yalc::format_error_with_help(&e));
                ExitCode::from(*code as u8)
            }
            _ => {
                eprintln!("\n{}", yalc::format_error_with_help(&e));
                ExitCode::from(e.exit_code() as u8)
            }
        },
    }
}

async fn run(ctx: &Context, command: Commands) -> yalc::YalcResult<()> {
    match command {
        Commands::Publish(args) => cli::publish::run(ctx, args).await,
        Commands::Push(args) => cli::push::run(ctx, args).await,
        Commands::Add(args) => cli::add::run(ctx, args).await,
        Commands::Link(args) => cli::link::run(ctx, args).await,
        Commands::Update(args) => cli::update::run(ctx, args).await,
        Commands::Restore(args) => cli::restore::run(ctx, args).await,
        Commands::Remove(args) => cli::remove::run(ctx, args),
        Commands::Retreat(args) => cli::retreat::run(ctx, args),
        Commands::Check(args) => cli::check::run(ctx, args),
        Commands::Installations(command) => cli::installations::run(ctx, command),
        Commands::List(args) => cli::list::run(ctx, args),
        Commands::Info { package } => cli::info::run(ctx, &package),
        Commands::Where { package } => cli::where_used::run(ctx, &package),
        Commands::Clean(args) => cli::clean::run(ctx, args),
        Commands::Dir => cli::dir::run(ctx),
    }
}

fn init_tracing(quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
