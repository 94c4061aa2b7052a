use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use colored::Colorize;
use log::LevelFilter;
#[allow(unused_imports)]
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use state::{State, LOG_FORMAT, LOG_LEVEL};

pub mod generate;
pub mod state;

#[derive(Parser, Debug)]
#[command(name = "nlofks", version, about)]
#[command(next_line_help = true)]
pub struct Cli {
    /// Path to the model file
    #[arg(short = 'm', long, default_value = "./models/sm.yaml")]
    pub model_file: PathBuf,

    /// Path to the generation settings file
    #[arg(short = 's', long)]
    pub settings_file: Option<PathBuf>,

    /// Log level, overrides the one of the settings file
    #[arg(short = 'l', long, value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,

    /// Log format, overrides the one of the settings file
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Generate(generate::Generate),
    /// Print a summary of the loaded model
    Model {},
}

#[repr(usize)]
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash, Default, ValueEnum, Serialize, Deserialize,
)]
pub enum LogFormat {
    #[default]
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "short")]
    Short,
    #[serde(rename = "min")]
    Min,
    #[serde(rename = "none")]
    None,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let state = State::load(&self.model_file, self.settings_file.as_deref())?;

        let level = match self.log_level {
            Some(level) => level,
            None => state
                .settings
                .log_level
                .parse::<LevelFilter>()
                .unwrap_or(LevelFilter::Info),
        };
        if let Ok(mut log_level) = LOG_LEVEL.lock() {
            *log_level = level;
        }
        if let Ok(mut log_format) = LOG_FORMAT.lock() {
            *log_format = self.log_format.unwrap_or(state.settings.log_format);
        }
        state::setup_log()?;
        debug!(
            "Loaded model '{}' from {}",
            state.model.name,
            self.model_file.display()
        );

        match &self.command {
            Commands::Generate(generate) => generate.run(&state),
            Commands::Model {} => {
                print_model_summary(&state);
                Ok(())
            }
        }
    }
}

fn print_model_summary(state: &State) {
    let model = &state.model;
    println!(
        "Model {}: {} particles, {} couplings, {} vertex rules",
        model.name.as_str().green(),
        format!("{}", model.particles.len()).blue(),
        format!("{}", model.couplings.len()).blue(),
        format!("{}", model.vertex_rules.len()).blue(),
    );
    for order in model.orders.iter() {
        println!(
            "  order {:<8} hierarchy {} expansion order {}",
            order.name.as_str(),
            order.hierarchy,
            order.expansion_order
        );
    }
    for (label, particles) in state.settings.multiparticles.iter() {
        println!("  {:<4} = {}", label.as_str().green(), particles.join(" "));
    }
}
