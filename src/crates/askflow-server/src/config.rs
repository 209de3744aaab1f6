//! Server configuration.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line and environment configuration for the server binary.
#[derive(Debug, Parser)]
#[command(
    name = "askflow-server",
    about = "HTTP binding for the askflow questionnaire traversal engine"
)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "ASKFLOW_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// JSON graph description loaded into the in-memory store at startup.
    #[arg(long, env = "ASKFLOW_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ASKFLOW_LOG_JSON", default_value_t = false)]
    pub log_json: bool,

    /// Treat askWhen evaluation failures as false instead of failing the
    /// walk.
    #[arg(long, env = "ASKFLOW_LENIENT_PREDICATES", default_value_t = false)]
    pub lenient_predicates: bool,
}
