mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::{Overrides, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "varlog",
    version,
    about = "Serve the newest entries of log files over HTTP"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Settings file (default: ~/.config/varlog/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the log directory over HTTP (default)
    Serve(ServeArgs),

    /// Print the newest lines of a file, newest first
    Tail {
        /// File to read
        file: PathBuf,

        /// Number of lines
        #[arg(short, default_value_t = 25)]
        n: usize,

        /// Only lines containing this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a syslog file into structured records
    Parse {
        /// File to parse
        file: PathBuf,

        /// Place timestamps in this year instead of year 0
        #[arg(long)]
        year: Option<i32>,

        /// Output one JSON object per record
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Directory to serve files from (default: /var/log)
    #[arg(long, alias = "logPath")]
    pub log_path: Option<String>,

    /// Port number (default: 8080)
    #[arg(long, alias = "httpPort")]
    pub http_port: Option<u16>,

    /// Bind address (default: 0.0.0.0)
    #[arg(short = 'H', long)]
    pub host: Option<String>,
}

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => serve(cli.config, ServeArgs::default()).await?,
        Some(Commands::Serve(args)) => serve(cli.config, args).await?,
        Some(Commands::Tail {
            file,
            n,
            filter,
            json,
        }) => {
            commands::tail_file(&file, n, filter.as_deref(), json)?;
        }
        Some(Commands::Parse { file, year, json }) => {
            commands::parse_file(&file, year, json)?;
        }
    }

    Ok(())
}

async fn serve(config: Option<PathBuf>, args: ServeArgs) -> Result<()> {
    let overrides = Overrides {
        log_path: args.log_path,
        host: args.host,
        port: args.http_port,
    };
    let settings = Settings::resolve(config.as_deref(), &overrides)?;
    tracing::debug!(?settings, "Resolved settings");

    crate::web::start_web_server(&settings).await
}
