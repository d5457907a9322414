use clap::Parser;

mod cli;
mod commands;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::SliConfig::load(&cli)?;
    tracing_subscriber::fmt()
        .with_max_level(config.max_log_level(cli.verbose))
        .with_writer(std::io::stderr)
        .init();
    commands::run_command(cli, config).await
}
