use std::fmt;
use std::sync::Arc;

use log::info;
use serde::Serialize;

use crate::feyngen::{
    Amplitude, AmplitudeCache, AmplitudeGenerator, LoopAmplitude, LoopAmplitudeGenerator,
    MultiProcessAmplitudes,
};
use crate::process::{NloMode, ProcessDefinition};

use super::born::{FksProcessFromBorn, StartProcess};
use super::FksError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagramCounts {
    pub born: usize,
    pub real: usize,
    pub virt: usize,
}

impl fmt::Display for DiagramCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "born: {} diagrams, real: {} diagrams, virtual: {} diagrams",
            self.born, self.real, self.virt
        )
    }
}

/// FKS processes for every Born process of a definition.
#[derive(Debug)]
pub struct FksMultiProcessFromBorn {
    pub born_processes: Vec<FksProcessFromBorn>,
    pub nlo_mode: NloMode,
    pub cache: AmplitudeCache,
}

impl FksMultiProcessFromBorn {
    pub fn new<G, L>(
        definition: &ProcessDefinition,
        remove_reals: bool,
        generator: &G,
        loop_generator: &L,
    ) -> Result<FksMultiProcessFromBorn, FksError>
    where
        G: AmplitudeGenerator + ?Sized,
        L: LoopAmplitudeGenerator + ?Sized,
    {
        let nlo_mode = definition.nlo_mode;
        if !matches!(nlo_mode, NloMode::All | NloMode::Real) {
            return Err(FksError::Configuration(format!(
                "NLO mode '{}' is not supported, use 'all' or 'real'",
                nlo_mode
            )));
        }

        let mut cache = AmplitudeCache::new();
        let born_amplitudes = MultiProcessAmplitudes::generate(definition, generator, &mut cache)?;

        let mut born_processes = vec![];
        for amplitude in born_amplitudes.amplitudes {
            let mut born = FksProcessFromBorn::new(
                StartProcess::Amplitude(amplitude),
                remove_reals,
                generator,
                &mut cache,
            )?;
            info!(
                "Generating FKS-subtracted matrix elements for born process: {}",
                born.born_process.nice_string()
            );
            born.generate_reals(generator, &mut cache)?;
            if nlo_mode == NloMode::All {
                born.generate_virtuals(loop_generator)?;
            }
            born_processes.push(born);
        }

        let multi = FksMultiProcessFromBorn {
            born_processes,
            nlo_mode,
            cache,
        };
        info!("Generated {}", multi.diagram_counts());
        Ok(multi)
    }

    pub fn get_born_amplitudes(&self) -> Vec<Arc<Amplitude>> {
        self.born_processes
            .iter()
            .map(|born| born.born_amplitude.clone())
            .collect()
    }

    pub fn get_real_amplitudes(&self) -> Vec<Arc<Amplitude>> {
        self.born_processes
            .iter()
            .flat_map(|born| born.real_amplitudes())
            .collect()
    }

    pub fn get_virt_amplitudes(&self) -> Vec<Arc<LoopAmplitude>> {
        self.born_processes
            .iter()
            .filter_map(|born| born.virt_amp.clone())
            .collect()
    }

    pub fn diagram_counts(&self) -> DiagramCounts {
        DiagramCounts {
            born: self
                .get_born_amplitudes()
                .iter()
                .map(|amplitude| amplitude.n_diagrams())
                .sum(),
            real: self
                .get_real_amplitudes()
                .iter()
                .map(|amplitude| amplitude.n_diagrams())
                .sum(),
            virt: self
                .get_virt_amplitudes()
                .iter()
                .map(|amplitude| amplitude.n_diagrams())
                .sum(),
        }
    }
}
