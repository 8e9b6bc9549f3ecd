use anyhow::Result;
use clap::Parser;
use divido::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
