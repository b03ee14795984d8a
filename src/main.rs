use clap::Parser;
use llm_tier_router::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Classify(args) => cli::classify::run(args).await,
    }
}
