use clap::Parser;
use color_eyre::Report;
use nlofks::cli::Cli;

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let cli = Cli::parse();
    cli.run()
}
