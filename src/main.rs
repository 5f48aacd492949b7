mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskdeck::config::{self, Config};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "taskdeck", version, about = "Personal task manager with a REST API")]
struct Cli {
    /// Path to the database file (default: .taskdeck/taskdeck.db in current dir)
    #[arg(long, global = true, env = "TASKDECK_DB")]
    db: Option<PathBuf>,

    /// Output as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run migrations
    Init,
    /// Run the REST API server
    Serve {
        /// Address to bind
        #[arg(long, env = "TASKDECK_HOST", default_value = config::DEFAULT_HOST)]
        host: String,
        /// Port to listen on
        #[arg(short, long, env = "TASKDECK_PORT", default_value_t = config::DEFAULT_PORT)]
        port: u16,
        /// Secret used to sign bearer tokens (random per process when unset)
        #[arg(long, env = "TASKDECK_JWT_SECRET", hide_env_values = true)]
        jwt_secret: Option<String>,
        /// Token lifetime in hours
        #[arg(long, env = "TASKDECK_TOKEN_TTL_HOURS", default_value_t = config::DEFAULT_TOKEN_TTL_HOURS)]
        token_ttl_hours: i64,
        /// Directory with a built frontend to serve for non-API paths
        #[arg(long, env = "TASKDECK_STATIC_DIR")]
        static_dir: Option<PathBuf>,
        /// Allowed CORS origin (any origin when unset)
        #[arg(long, env = "TASKDECK_CORS_ORIGIN")]
        cors_origin: Option<String>,
    },
    /// List registered users with task counts
    Users,
    /// Show task counts for a user
    Stats {
        /// Email of the user
        #[arg(long)]
        email: String,
        /// Output a compact single-line summary
        #[arg(long)]
        oneline: bool,
    },
}

fn main() {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("taskdeck=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = cli
        .db
        .map_or_else(config::default_db_path, Ok)
        .and_then(|db_path| match cli.command {
            Commands::Init => commands::init::run(&db_path),
            Commands::Serve {
                host,
                port,
                jwt_secret,
                token_ttl_hours,
                static_dir,
                cors_origin,
            } => {
                let token_ttl = config::token_ttl_from_hours(token_ttl_hours)?;
                let mut config = Config::new(db_path, jwt_secret);
                config.host = host;
                config.port = port;
                config.token_ttl = token_ttl;
                config.static_dir = static_dir;
                config.cors_origin = cors_origin;
                commands::serve::run(config)
            }
            Commands::Users => commands::users::run(&db_path, cli.json),
            Commands::Stats { email, oneline } => {
                commands::stats::run(&db_path, &email, oneline, cli.json)
            }
        });

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
