use crate::server;
use clap::{Args, Parser, Subcommand};
use jinx::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "jinx-api",
    about = "Run the jinx job-tracker and curse feed API",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Apply pending database migrations and exit
    Migrate,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Keep all data in process memory instead of Postgres
    #[arg(long)]
    pub(crate) in_memory: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Migrate => server::migrate().await,
    }
}
