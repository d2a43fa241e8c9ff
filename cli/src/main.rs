use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

mod commands;
mod config;
mod logging;

use config::{DEFAULT_CONFIG_PATH, DEFAULT_PORT};

/// Exit status for any failure before the server starts serving.
const STARTUP_FAILURE: u8 = 2;

/// teleview - a permission-aware viewer for telephony logs
#[derive(Parser)]
#[command(name = "teleview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, global = true, env = "TELEVIEW_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (the default)
    Serve,

    /// Print the version and exit
    Version,

    /// Validate the configuration and policy, then print the resolved users
    Check {
        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Serve);

    if let Commands::Version = command {
        println!("teleview version {}", web::VERSION);
        return ExitCode::SUCCESS;
    }

    let file_config = match config::load_file_config(&cli.config) {
        Ok(file_config) => file_config,
        Err(e) => {
            if logging::init_logging(cli.verbose, None).is_ok() {
                error!("{:#}", e);
            } else {
                eprintln!("Error: {:#}", e);
            }
            return ExitCode::from(STARTUP_FAILURE);
        }
    };

    let _guard = match logging::init_logging(cli.verbose, file_config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(STARTUP_FAILURE);
        }
    };

    if file_config.from_defaults {
        warn!(
            "Couldn't find {}, defaulting to localhost:{}",
            DEFAULT_CONFIG_PATH, DEFAULT_PORT
        );
    }

    let runtime = match file_config.build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(STARTUP_FAILURE);
        }
    };

    match command {
        Commands::Check { format } => match commands::check::execute(&runtime, &format) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{:#}", e);
                ExitCode::from(STARTUP_FAILURE)
            }
        },
        Commands::Serve | Commands::Version => {
            info!("Starting teleview {}", web::VERSION);
            match web::start_server(runtime.state, runtime.server).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!("Server error: {}", e);
                    ExitCode::from(STARTUP_FAILURE)
                }
            }
        }
    }
}
