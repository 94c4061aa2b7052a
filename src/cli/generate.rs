use std::fs;
use std::path::PathBuf;

use clap::Args;
use color_eyre::{Help, Result};
use colored::Colorize;
use eyre::WrapErr;
use log::info;
use serde::Serialize;

use crate::feyngen::{LCutLoopGenerator, TreeGenerator};
use crate::fks::{DiagramCounts, FksMultiProcessFromBorn, FksProcessFromBorn, FksRealProcess};
use crate::process::{CouplingOrders, ProcessDefinition};

use super::state::State;

/// Generate the Born, real-emission and virtual amplitudes of a process
#[derive(Args, Debug, Clone)]
pub struct Generate {
    /// Process definition, e.g. "u u~ > e+ e- [QCD]"
    pub process: String,

    /// Write a YAML summary of the generated processes to this file
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Keep double-counted real emissions, flagged as not integrated
    #[arg(long, default_value_t = false)]
    pub keep_reals: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerationSummary {
    pub process: String,
    pub nlo_mode: String,
    pub diagram_counts: DiagramCounts,
    pub borns: Vec<BornSummary>,
}

#[derive(Debug, Serialize)]
pub struct BornSummary {
    pub process: String,
    pub orders: CouplingOrders,
    pub n_diagrams: usize,
    pub color_links: Vec<ColorLinkSummary>,
    pub reals: Vec<RealSummary>,
    pub n_virtual_diagrams: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ColorLinkSummary {
    pub legs: [usize; 2],
    pub string: String,
    pub replacements: Vec<[isize; 2]>,
}

#[derive(Debug, Serialize)]
pub struct RealSummary {
    pub process: String,
    pub pdgs: Vec<isize>,
    pub i_fks: usize,
    pub j_fks: usize,
    pub ij: usize,
    pub ijglu: usize,
    pub is_to_integrate: bool,
    pub is_nbody_only: bool,
    pub need_color_links: bool,
    pub n_diagrams: usize,
    pub n_configuration_links: usize,
}

impl RealSummary {
    fn new(real: &FksRealProcess, n_configuration_links: usize) -> RealSummary {
        RealSummary {
            process: real.process.input_string(),
            pdgs: real.pdgs.clone(),
            i_fks: real.i_fks,
            j_fks: real.j_fks,
            ij: real.ij,
            ijglu: real.ijglu,
            is_to_integrate: real.is_to_integrate,
            is_nbody_only: real.is_nbody_only,
            need_color_links: real.need_color_links,
            n_diagrams: real.amplitude.n_diagrams(),
            n_configuration_links,
        }
    }
}

impl BornSummary {
    fn new(born: &FksProcessFromBorn) -> BornSummary {
        let links = born.link_rb_confs();
        BornSummary {
            process: born.born_process.input_string(),
            orders: born.born_process.orders.clone(),
            n_diagrams: born.born_amplitude.n_diagrams(),
            color_links: born
                .color_links
                .iter()
                .map(|link| {
                    let (a, b) = link.leg_numbers();
                    ColorLinkSummary {
                        legs: [a, b],
                        string: link.string.to_string(),
                        replacements: link.replacements.clone(),
                    }
                })
                .collect(),
            reals: born
                .real_amps
                .iter()
                .zip(links.iter())
                .map(|(real, links)| RealSummary::new(real, links.len()))
                .collect(),
            n_virtual_diagrams: born.virt_amp.as_ref().map(|virt| virt.n_diagrams()),
        }
    }
}

impl GenerationSummary {
    pub fn new(definition: &ProcessDefinition, multi: &FksMultiProcessFromBorn) -> Self {
        GenerationSummary {
            process: definition.input.clone(),
            nlo_mode: multi.nlo_mode.to_string(),
            diagram_counts: multi.diagram_counts(),
            borns: multi.born_processes.iter().map(BornSummary::new).collect(),
        }
    }
}

impl Generate {
    pub fn run(&self, state: &State) -> Result<()> {
        let definition = ProcessDefinition::parse(
            &self.process,
            state.model.clone(),
            &state.settings.multiparticles,
        )?;
        let remove_reals = state.settings.remove_reals && !self.keep_reals;

        let generator = TreeGenerator::default();
        let loop_generator = LCutLoopGenerator::default();
        let multi =
            FksMultiProcessFromBorn::new(&definition, remove_reals, &generator, &loop_generator)?;
        let summary = GenerationSummary::new(&definition, &multi);

        for born in summary.borns.iter() {
            println!(
                "{} {} ({} diagrams)",
                "Born".green(),
                born.process.as_str().bold(),
                born.n_diagrams
            );
            for real in born.reals.iter() {
                let flags = format!(
                    "i_fks={} j_fks={}{}{}",
                    real.i_fks,
                    real.j_fks,
                    if real.is_to_integrate { "" } else { " double-counted" },
                    if real.is_nbody_only { " nbody" } else { "" }
                );
                println!(
                    "  {} {:<40} {:>4} diagrams  {}",
                    "real".blue(),
                    real.process,
                    real.n_diagrams,
                    flags.bright_black()
                );
            }
            if let Some(n_virtual) = born.n_virtual_diagrams {
                println!("  {} {} diagrams", "virtual".blue(), n_virtual);
            }
        }
        println!("{}", summary.diagram_counts);

        if let Some(output) = &self.output {
            let yaml = serde_yaml::to_string(&summary)?;
            fs::write(output, yaml)
                .wrap_err_with(|| format!("Could not write summary to {}", output.display()))
                .suggestion("Does the output directory exist?")?;
            info!("Wrote generation summary to {}", output.display());
        }
        Ok(())
    }
}
