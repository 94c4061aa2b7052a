pub mod diagram_generator;
pub mod loop_generator;
pub mod multi;

use std::sync::Arc;

use ahash::HashMap;
use log::debug;
use serde::Serialize;
use smartstring::{LazyCompact, SmartString};
use thiserror::Error;

use crate::process::{CouplingOrders, Process, ProcessError, ProcessSignature};

pub use diagram_generator::TreeGenerator;
pub use loop_generator::{LCutLoopGenerator, LoopAmplitude, LoopAmplitudeGenerator, LoopDiagram};
pub use multi::MultiProcessAmplitudes;


#[derive(Error, Debug)]
pub enum FeynGenError {
    #[error("{0}")]
    GenericError(String),
    #[error("Processes with {0} external legs are not supported, at most {1} are allowed")]
    TooManyLegs(usize, usize),
    #[error("At least three external legs are required, found {0}")]
    TooFewLegs(usize),
    #[error("Particle with PDG {0} is not defined in model '{1}'")]
    UnknownParticle(isize, String),
    #[error("Process error | {0}")]
    ProcessError(#[from] ProcessError),
}

/// Bitmask over external legs, leg `n` is bit `n - 1`.
pub type LegMask = u32;

#[inline]
pub fn leg_bit(number: usize) -> LegMask {
    1 << (number - 1)
}

/// A line ending on a vertex. `pdg` is the particle flowing out of the
/// `mask` side of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Line {
    pub mask: LegMask,
    pub pdg: isize,
}

/// A vertex whose lines partition the external legs and carry exactly the
/// particles of `rule`, all incoming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramVertex {
    pub rule: SmartString<LazyCompact>,
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagram {
    pub vertices: Vec<DiagramVertex>,
    /// Internal lines, keyed by the side that does not contain the last leg.
    pub propagators: Vec<Line>,
    pub orders: CouplingOrders,
}

impl Diagram {
    pub fn order(&self, name: &str) -> usize {
        self.orders.get(name).unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Amplitude {
    pub process: Process,
    pub diagrams: Vec<Diagram>,
}

impl Amplitude {
    pub fn n_diagrams(&self) -> usize {
        self.diagrams.len()
    }

    pub fn has_diagrams(&self) -> bool {
        !self.diagrams.is_empty()
    }
}

pub trait AmplitudeGenerator {
    /// Tree-level diagrams of `process`, possibly none.
    fn generate(&self, process: &Process) -> Result<Amplitude, FeynGenError>;
}

/// Run-wide memoisation of generated amplitudes.
#[derive(Debug, Default)]
pub struct AmplitudeCache {
    amplitudes: HashMap<ProcessSignature, Arc<Amplitude>>,
    hits: usize,
    misses: usize,
}

impl AmplitudeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_generate<G: AmplitudeGenerator + ?Sized>(
        &mut self,
        process: &Process,
        generator: &G,
    ) -> Result<Arc<Amplitude>, FeynGenError> {
        let signature = process.signature();
        if let Some(amplitude) = self.amplitudes.get(&signature) {
            self.hits += 1;
            debug!("Re-using cached amplitude for {}", process.input_string());
            return Ok(amplitude.clone());
        }
        self.misses += 1;
        let amplitude = Arc::new(generator.generate(process)?);
        debug!(
            "Generated {} diagrams for {}",
            amplitude.n_diagrams(),
            process.input_string()
        );
        self.amplitudes.insert(signature, amplitude.clone());
        Ok(amplitude)
    }

    pub fn len(&self) -> usize {
        self.amplitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amplitudes.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }
}
