use anyhow::Context;
use clap::Parser;

use sharpline::adapter::inbound::cli::command::{CheckCommand, Cli, Commands};
use sharpline::adapter::inbound::cli::output::{self, OutputConfig};
use sharpline::adapter::inbound::cli::{check, run};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    output::configure(OutputConfig::new(cli.json, cli.quiet, cli.verbose), &cli.color);

    if let Err(e) = dispatch(cli.command).await {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn dispatch(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => run::execute(&args)
            .await
            .with_context(|| format!("run failed ({})", args.config.display())),
        Commands::Check(CheckCommand::Config(arg)) => check::config::execute_config(&arg.config)
            .with_context(|| format!("invalid configuration {}", arg.config.display())),
        Commands::Check(CheckCommand::Catalog(arg)) => {
            check::catalog::execute_catalog(&arg.config)
                .await
                .context("catalog check failed")
        }
    }
}
