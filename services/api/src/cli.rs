use crate::demo::{run_demo, run_import, run_score, DemoArgs, ImportArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use ticket_review::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Ticket Review Desk",
    about = "Run and demonstrate the ticket risk review service from the command line",
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
    /// Score a single fee/tag combination and explain the result
    Score(ScoreArgs),
    /// Import a ticket CSV export, then run the high-risk re-tagging sweep
    Import(ImportArgs),
    /// Walk a sample ticket through intake, review, rejection, and the sweep
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::Import(args) => run_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
