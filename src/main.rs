use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use worktally::OutputFormat;
use worktally::commands::{self, Backend, require_config};
use worktally::config;
use worktally::error::TrackerError;
use worktally::report::GroupingMode;

#[derive(Parser)]
#[command(name = "wtally")]
#[command(about = "Track work sessions and see weekly, biweekly or monthly totals")]
#[command(version)]
struct Cli {
    #[arg(long, global = true, value_enum, default_value_t, help = "Output format")]
    format: OutputFormat,

    #[arg(short, long, global = true, help = "Show debug logs on stderr")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking a session
    Start {
        #[arg(help = "Project or job name (defaults to 'Unspecified Project')")]
        job: Vec<String>,
    },
    /// Stop the running session
    Stop,
    /// Show whether a session is running
    Status,
    /// List recorded sessions, newest first
    List {
        #[arg(long, default_value = "20", help = "Maximum sessions to show")]
        limit: usize,
    },
    /// Show totals grouped by period
    Totals {
        #[arg(long, value_enum, help = "Grouping (defaults to display.grouping)")]
        mode: Option<GroupingMode>,
    },
    /// Delete a session
    Delete {
        #[arg(help = "Session ID (see 'wtally list')")]
        id: String,
        #[arg(long, short = 'y', help = "Skip the confirmation prompt")]
        yes: bool,
    },
    /// Follow live updates until Ctrl+C
    Watch {
        #[arg(long, value_enum, help = "Grouping (defaults to display.grouping)")]
        mode: Option<GroupingMode>,
    },
    /// Identity management
    Auth(AuthArgs),
    /// Inspect or change configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct AuthArgs {
    #[command(subcommand)]
    action: AuthAction,
}

#[derive(Subcommand)]
enum AuthAction {
    /// Renew the sign-in, or sign in for the first time
    Login {
        #[arg(long, help = "Start a new anonymous account instead of renewing the current one")]
        new_account: bool,
    },
    /// Show the cached identity
    Status,
    /// Forget the cached identity
    Logout {
        #[arg(long, help = "Also remove the API key from the OS keyring")]
        forget_key: bool,
    },
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    List,
    Set { key: String, value: String },
    Get { key: String },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("worktally=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("worktally=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    let loaded = config::load();

    match &cli.command {
        Commands::Start { job } => {
            let mut backend = Backend::connect(&require_config(loaded)?)?;
            let snapshot = backend.snapshot()?;
            commands::session::start(
                &backend.store,
                &backend.identity.user_id,
                &snapshot,
                &job.join(" "),
                &backend.tz,
                format,
            )?;
        }
        Commands::Stop => {
            let mut backend = Backend::connect(&require_config(loaded)?)?;
            let snapshot = backend.snapshot()?;
            commands::session::stop(&backend.store, &backend.identity.user_id, &snapshot, format)?;
        }
        Commands::Status => {
            let mut backend = Backend::connect(&require_config(loaded)?)?;
            commands::session::status(&backend.snapshot()?, &backend.tz, format)?;
        }
        Commands::List { limit } => {
            let mut backend = Backend::connect(&require_config(loaded)?)?;
            commands::session::list(&backend.snapshot()?, *limit, &backend.tz, format)?;
        }
        Commands::Totals { mode } => {
            let config = require_config(loaded)?;
            let mode = mode.unwrap_or(config.display.grouping);
            let mut backend = Backend::connect(&config)?;
            commands::report::totals(&backend.snapshot()?, mode, &backend.tz, format)?;
        }
        Commands::Delete { id, yes } => {
            let mut backend = Backend::connect(&require_config(loaded)?)?;
            let snapshot = backend.snapshot()?;
            commands::session::delete(
                &backend.store,
                &backend.identity.user_id,
                &snapshot,
                id,
                *yes,
                &backend.tz,
                format,
            )?;
        }
        Commands::Watch { mode } => {
            let config = require_config(loaded)?;
            let mode = mode.unwrap_or(config.display.grouping);
            let interval = config.watch.poll_interval();
            commands::watch::watch(Backend::connect(&config)?, mode, interval, format)?;
        }
        Commands::Auth(args) => {
            let config = require_config(loaded)?;
            match &args.action {
                AuthAction::Login { new_account } => {
                    commands::auth::login(&config, *new_account, format)?
                }
                AuthAction::Status => commands::auth::status(&config, format)?,
                AuthAction::Logout { forget_key } => commands::auth::logout(&config, *forget_key)?,
            }
        }
        Commands::Config(args) => match &args.action {
            ConfigAction::Set { key, value } => commands::config::set(key, value)?,
            action => {
                let config = loaded.unwrap_or_else(|e| {
                    eprintln!("Warning: {:#}. Showing defaults.", e);
                    config::Config::default()
                });
                match action {
                    ConfigAction::Get { key } => commands::config::get(key, &config)?,
                    _ => commands::config::list(&config)?,
                }
            }
        },
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TrackerError>() {
                Some(tracker) => eprintln!("✗ {}", tracker.user_message()),
                None => eprintln!("✗ {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}
