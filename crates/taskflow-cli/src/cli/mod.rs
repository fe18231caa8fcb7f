//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use taskflow_core::{Config, Taskflow, config};
use tracing_subscriber::EnvFilter;

mod commands;

/// Log filter for the binary; logs go to stderr.
const LOG_ENV: &str = "TASKFLOW_LOG";

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(version)]
#[command(about = "Taskflow task manager client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account; a 6-digit code is emailed to you
    Register {
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,
        /// Password confirmation (read from stdin if omitted)
        #[arg(long = "confirm-password")]
        confirm_password: Option<String>,
    },
    /// Confirm registration with the emailed code and log in
    Verify {
        #[arg(value_name = "OTP")]
        otp: String,
    },
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,
        /// Password (read from stdin if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Log out and forget stored credentials
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Manage tasks
    Tasks {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum TaskCommands {
    /// List tasks with a progress summary
    List,
    /// Create a task
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// RFC 3339 timestamp or an offset such as +30m, +2h, +1d
        #[arg(long, value_name = "WHEN", allow_hyphen_values = true)]
        due: String,
    },
    /// Flip a task between pending and completed
    Toggle {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
    /// Delete a task
    Delete {
        #[arg(value_name = "TASK_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing();

    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands work even when the config file is broken.
    let command = match cli.command {
        Commands::Config { command } => {
            return match command {
                ConfigCommands::Path => {
                    commands::config::path();
                    Ok(())
                }
                ConfigCommands::Init => commands::config::init(),
            };
        }
        command => command,
    };

    let config = Config::load().context("load config")?;
    let app = Taskflow::from_config(&config)?;
    app.start().await;
    tracing::debug!(
        base_url = app.client().base_url(),
        credentials = %config::paths::credentials_path().display(),
        "Client ready"
    );

    match command {
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => commands::auth::register(&app, name, email, password, confirm_password).await,
        Commands::Verify { otp } => commands::auth::verify(&app, &otp).await,
        Commands::Login { email, password } => commands::auth::login(&app, &email, password).await,
        Commands::Logout => commands::auth::logout(&app).await,
        Commands::Whoami => {
            commands::auth::whoami(&app);
            Ok(())
        }
        Commands::Tasks { command } => match command {
            TaskCommands::List => commands::tasks::list(&app).await,
            TaskCommands::Add {
                title,
                description,
                due,
            } => commands::tasks::add(&app, title, description, &due).await,
            TaskCommands::Toggle { id } => commands::tasks::toggle(&app, &id).await,
            TaskCommands::Delete { id } => commands::tasks::delete(&app, &id).await,
        },
        Commands::Config { .. } => unreachable!("config commands return before the client is built"),
    }
}
