use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod tasks;

#[derive(Parser)]
#[command(
    name = "hand-seg",
    about = "Hand segmentation in depth images",
    author,
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on one camera direction
    Train(tasks::train::TrainArgs),
    /// Visualize, export or score predictions of a trained model
    Eval(tasks::eval::EvalArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("info"),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match &cli.command {
        Commands::Train(args) => tasks::train::run(args),
        Commands::Eval(args) => tasks::eval::run(args),
    }
}
