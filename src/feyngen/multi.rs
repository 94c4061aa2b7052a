use std::sync::Arc;

use log::{info, warn};

use crate::process::ProcessDefinition;

use super::{Amplitude, AmplitudeCache, AmplitudeGenerator, FeynGenError};

/// Born amplitudes of every single process in a definition.
#[derive(Debug, Clone, Default)]
pub struct MultiProcessAmplitudes {
    pub amplitudes: Vec<Arc<Amplitude>>,
}

impl MultiProcessAmplitudes {
    /// Expands `definition` and keeps the processes that have at least one
    /// diagram.
    pub fn generate<G: AmplitudeGenerator + ?Sized>(
        definition: &ProcessDefinition,
        generator: &G,
        cache: &mut AmplitudeCache,
    ) -> Result<MultiProcessAmplitudes, FeynGenError> {
        let processes = definition.expand()?;
        let n_processes = processes.len();
        let mut amplitudes = vec![];
        for process in processes {
            let amplitude = cache.get_or_generate(&process, generator)?;
            if amplitude.has_diagrams() {
                amplitudes.push(amplitude);
            }
        }
        if amplitudes.is_empty() {
            warn!("No amplitude with diagrams for '{}'", definition.input);
        } else {
            info!(
                "{} out of {} processes in '{}' have diagrams",
                amplitudes.len(),
                n_processes,
                definition.input
            );
        }
        Ok(MultiProcessAmplitudes { amplitudes })
    }

    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }
}
