//! taskflow: task management from the terminal.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taskflow::{ClientConfig, Taskflow};

mod commands;

/// Manage tasks on a taskflow backend
#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Manage tasks on a taskflow backend", long_about = None)]
#[command(version)]
struct Cli {
    /// API base URL (overrides the config file and TASKFLOW_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the saved session
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and save the session
    Login {
        /// Account name
        username: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register(commands::auth::RegisterArgs),

    /// Forget the saved session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// List tasks, optionally filtered
    List(commands::tasks::ListArgs),

    /// Show counters and the most recently updated tasks
    Dashboard,

    /// Show one task
    Show {
        /// Task id
        id: i64,
    },

    /// Create a task
    Create(commands::tasks::CreateArgs),

    /// Change fields of a task
    Update {
        /// Task id
        id: i64,

        #[command(flatten)]
        fields: commands::tasks::UpdateArgs,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let app = Taskflow::new(config).context("failed to initialize taskflow")?;
    match execute_command(&app, cli.command).await {
        Err(e) if e.downcast_ref::<commands::Reported>().is_some() => std::process::exit(1),
        result => result,
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "taskflow=debug,info",
        _ => "taskflow=trace,debug",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ClientConfig::from_env(),
    };
    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(dir) = &cli.storage_dir {
        config = config.with_storage_dir(dir);
    }
    if let Some(ms) = cli.timeout_ms {
        config = config.with_timeout(ms);
    }
    config.validate()?;
    Ok(config)
}

async fn execute_command(app: &Taskflow, command: Commands) -> Result<()> {
    match command {
        Commands::Login { username, password } => {
            commands::auth::login(app, username, password).await?;
        },
        Commands::Register(args) => {
            commands::auth::register(app, args).await?;
        },
        Commands::Logout => {
            commands::auth::logout(app)?;
        },
        Commands::Whoami => {
            commands::auth::whoami(app)?;
        },
        Commands::List(args) => {
            commands::tasks::list(app, args).await?;
        },
        Commands::Dashboard => {
            commands::tasks::dashboard(app).await?;
        },
        Commands::Show { id } => {
            commands::tasks::show(app, id).await?;
        },
        Commands::Create(args) => {
            commands::tasks::create(app, args).await?;
        },
        Commands::Update { id, fields } => {
            commands::tasks::update(app, id, fields).await?;
        },
        Commands::Delete { id } => {
            commands::tasks::delete(app, id).await?;
        },
    }
    Ok(())
}
