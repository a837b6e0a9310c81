use clap::Parser;

mod commands;
mod context;
mod execute;

use commands::Commands;
use context::GlobalArgs;

#[derive(Parser)]
#[command(name = "deployenv")]
#[command(about = "Resolve layered, stage-aware deploy environments", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    if let Err(e) = deployenv_utils::tracing::init() {
        eprintln!("Failed to initialize tracing: {e}");
    }

    cli.command.execute(&cli.global).await?;
    Ok(())
}
