use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "firetest",
    about = "Firetest: an in-memory realtime database emulator for tests",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the emulator server
    Serve(ServeArgs),
    /// Sign an auth token for a running server's secret
    Token(TokenArgs),
    /// Print the effective server configuration
    Config(ConfigArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct ServerOptions {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on (port 0 picks a free port)
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
    /// Reject requests without a valid `auth` parameter
    #[arg(long)]
    pub require_auth: bool,
    /// Server secret; generated when omitted
    #[arg(long)]
    pub secret: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub server: ServerOptions,
}

#[derive(Args)]
pub struct TokenArgs {
    /// Secret the server was started with
    #[arg(long)]
    pub secret: String,
    /// uid carried in the token
    #[arg(long)]
    pub uid: String,
    /// Lifetime in seconds; the token never expires when omitted
    #[arg(long)]
    pub ttl: Option<u64>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub server: ServerOptions,
}
