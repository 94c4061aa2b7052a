use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smartstring::{LazyCompact, SmartString};
use thiserror::Error;

use crate::model::{Model, Particle};

#[cfg(test)]
mod test;

/// Synthetic coupling order, Σ hierarchy × power over the model orders.
pub const WEIGHTED: &str = "WEIGHTED";

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Particle '{0}' is not defined in model '{1}'")]
    UnknownParticle(String, String),
    #[error("PDG code {0} is not defined in model '{1}'")]
    UnknownPdg(isize, String),
    #[error("Coupling order '{0}' is not defined in model '{1}'")]
    UnknownCouplingOrder(String, String),
    #[error("Invalid process definition '{0}': {1}")]
    InvalidDefinition(String, String),
    #[error("Invalid NLO mode '{0}'")]
    InvalidNloMode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LegState {
    #[serde(rename = "initial")]
    Initial,
    #[serde(rename = "final")]
    Final,
}

impl LegState {
    #[inline]
    pub fn is_final(self) -> bool {
        self == LegState::Final
    }
}

/// Role of a leg in an FKS pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FksTag {
    #[default]
    #[serde(rename = "n")]
    None,
    #[serde(rename = "i")]
    I,
    #[serde(rename = "j")]
    J,
}

impl fmt::Display for FksTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "n",
                Self::I => "i",
                Self::J => "j",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leg {
    pub id: isize,
    pub number: usize,
    pub state: LegState,
    pub color: isize,
    pub spin: isize,
    pub massless: bool,
    #[serde(default)]
    pub fks: FksTag,
}

impl Leg {
    pub fn from_particle(particle: &Particle, number: usize, state: LegState) -> Leg {
        Leg {
            id: particle.pdg_code,
            number,
            state,
            color: particle.color,
            spin: particle.spin,
            massless: particle.is_massless(),
            fks: FksTag::None,
        }
    }

    pub fn new(id: isize, number: usize, state: LegState, model: &Model) -> Result<Leg, ProcessError> {
        let particle = model
            .find_particle_from_pdg(id)
            .ok_or_else(|| ProcessError::UnknownPdg(id, model.name.to_string()))?;
        Ok(Leg::from_particle(&particle, number, state))
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.state.is_final()
    }

    /// Massless vector boson, the legs that define `ijglu`.
    #[inline]
    pub fn is_massless_vector(&self) -> bool {
        self.massless && self.spin == 3
    }

    pub fn with_fks(mut self, fks: FksTag) -> Leg {
        self.fks = fks;
        self
    }
}

/// Upper bounds on coupling powers, keyed by model order names and WEIGHTED.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CouplingOrders(BTreeMap<SmartString<LazyCompact>, usize>);

impl CouplingOrders {
    pub fn new() -> Self {
        CouplingOrders(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.0.get(name).copied()
    }

    pub fn set(&mut self, name: &str, value: usize) {
        self.0.insert(name.into(), value);
    }

    pub fn increment(&mut self, name: &str, by: usize) {
        *self.0.entry(name.into()).or_insert(0) += by;
    }

    pub fn remove(&mut self, name: &str) -> Option<usize> {
        self.0.remove(name)
    }

    pub fn without_weighted(&self) -> CouplingOrders {
        let mut orders = self.clone();
        orders.remove(WEIGHTED);
        orders
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmartString<LazyCompact>, &usize)> {
        self.0.iter()
    }

    /// Weighted sum of the model orders, ignoring any stored WEIGHTED entry.
    pub fn weighted(&self, model: &Model) -> usize {
        self.0
            .iter()
            .filter(|(name, _)| name.as_str() != WEIGHTED)
            .map(|(name, value)| model.order_hierarchy(name) * value)
            .sum()
    }

    /// True if every bound of `self` is satisfied by the powers in `powers`.
    pub fn allows(&self, powers: &CouplingOrders) -> bool {
        self.0
            .iter()
            .all(|(name, max)| powers.get(name).unwrap_or(0) <= *max)
    }

    /// Entry-wise maximum.
    pub fn max_merge(&mut self, other: &CouplingOrders) {
        for (name, value) in other.iter() {
            let entry = self.0.entry(name.clone()).or_insert(0);
            *entry = (*entry).max(*value);
        }
    }

    pub fn validate(&self, model: &Model) -> Result<(), ProcessError> {
        for name in self.0.keys() {
            if name.as_str() != WEIGHTED && !model.has_order(name) {
                return Err(ProcessError::UnknownCouplingOrder(
                    name.to_string(),
                    model.name.to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl FromIterator<(SmartString<LazyCompact>, usize)> for CouplingOrders {
    fn from_iter<T: IntoIterator<Item = (SmartString<LazyCompact>, usize)>>(iter: T) -> Self {
        CouplingOrders(iter.into_iter().collect())
    }
}

impl fmt::Display for CouplingOrders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.0
                .iter()
                .map(|(name, value)| format!("{}<={}", name, value))
                .join(" ")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NloMode {
    #[serde(rename = "tree")]
    Tree,
    #[serde(rename = "all")]
    All,
    #[serde(rename = "real")]
    Real,
    #[serde(rename = "virt")]
    Virt,
    #[serde(rename = "LOonly")]
    LoOnly,
    #[serde(rename = "noborn")]
    NoBorn,
}

impl fmt::Display for NloMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Tree => "tree",
                Self::All => "all",
                Self::Real => "real",
                Self::Virt => "virt",
                Self::LoOnly => "LOonly",
                Self::NoBorn => "noborn",
            }
        )
    }
}

impl FromStr for NloMode {
    type Err = ProcessError;

    fn from_str(s: &str) -> Result<Self, ProcessError> {
        match s {
            "tree" => Ok(Self::Tree),
            "all" => Ok(Self::All),
            "real" => Ok(Self::Real),
            "virt" => Ok(Self::Virt),
            "LOonly" => Ok(Self::LoOnly),
            "noborn" => Ok(Self::NoBorn),
            _ => Err(ProcessError::InvalidNloMode(s.to_string())),
        }
    }
}

/// Key under which generated amplitudes are memoised.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessSignature {
    pub pdgs: Vec<isize>,
    pub nincoming: usize,
    pub orders: CouplingOrders,
}

#[derive(Debug, Clone)]
pub struct Process {
    pub legs: Vec<Leg>,
    pub orders: CouplingOrders,
    pub perturbation_couplings: Vec<SmartString<LazyCompact>>,
    pub model: Arc<Model>,
}

impl Process {
    pub fn new(
        legs: Vec<Leg>,
        orders: CouplingOrders,
        perturbation_couplings: Vec<SmartString<LazyCompact>>,
        model: Arc<Model>,
    ) -> Process {
        Process {
            legs,
            orders,
            perturbation_couplings,
            model,
        }
    }

    pub fn from_pdgs(
        initial_pdgs: &[isize],
        final_pdgs: &[isize],
        orders: CouplingOrders,
        perturbation_couplings: Vec<SmartString<LazyCompact>>,
        model: Arc<Model>,
    ) -> Result<Process, ProcessError> {
        orders.validate(&model)?;
        let legs = initial_pdgs
            .iter()
            .map(|id| (*id, LegState::Initial))
            .chain(final_pdgs.iter().map(|id| (*id, LegState::Final)))
            .enumerate()
            .map(|(i, (id, state))| Leg::new(id, i + 1, state, &model))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Process::new(legs, orders, perturbation_couplings, model))
    }

    pub fn nincoming(&self) -> usize {
        self.legs.iter().filter(|leg| !leg.is_final()).count()
    }

    pub fn pdg_codes(&self) -> Vec<isize> {
        self.legs.iter().map(|leg| leg.id).collect()
    }

    pub fn initial_pdgs(&self) -> Vec<isize> {
        self.legs
            .iter()
            .filter(|leg| !leg.is_final())
            .map(|leg| leg.id)
            .collect()
    }

    pub fn final_pdgs(&self) -> Vec<isize> {
        self.legs
            .iter()
            .filter(|leg| leg.is_final())
            .map(|leg| leg.id)
            .collect()
    }

    pub fn signature(&self) -> ProcessSignature {
        ProcessSignature {
            pdgs: self.pdg_codes(),
            nincoming: self.nincoming(),
            orders: self.orders.clone(),
        }
    }

    /// Reassign leg numbers to match positions.
    pub fn renumber_legs(&mut self) {
        for (i, leg) in self.legs.iter_mut().enumerate() {
            leg.number = i + 1;
        }
    }

    pub fn input_string(&self) -> String {
        let names = |legs: &mut dyn Iterator<Item = &Leg>| {
            legs.map(|leg| self.model.get_particle_from_pdg(leg.id).name.clone())
                .join(" ")
        };
        let mut s = format!(
            "{} > {}",
            names(&mut self.legs.iter().filter(|leg| !leg.is_final())),
            names(&mut self.legs.iter().filter(|leg| leg.is_final()))
        );
        if !self.orders.is_empty() {
            s.push(' ');
            s.push_str(&self.orders.to_string());
        }
        if !self.perturbation_couplings.is_empty() {
            s.push_str(&format!(" [ {} ]", self.perturbation_couplings.iter().join(" ")));
        }
        s
    }

    pub fn nice_string(&self) -> String {
        format!("Process: {}", self.input_string())
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nice_string())
    }
}

/// A process with multiparticle labels, as typed by the user.
#[derive(Debug, Clone)]
pub struct ProcessDefinition {
    pub initial_pdgs: Vec<Vec<isize>>,
    pub final_pdgs: Vec<Vec<isize>>,
    pub orders: CouplingOrders,
    pub perturbation_couplings: Vec<SmartString<LazyCompact>>,
    pub nlo_mode: NloMode,
    pub model: Arc<Model>,
    pub input: String,
}

impl ProcessDefinition {
    /// Parses `u u~ > e+ e- QED<=2 [real=QCD]`.
    pub fn parse(
        input: &str,
        model: Arc<Model>,
        multiparticles: &IndexMap<String, Vec<String>>,
    ) -> Result<ProcessDefinition, ProcessError> {
        let invalid = |reason: &str| ProcessError::InvalidDefinition(input.to_string(), reason.into());

        let (body, bracket) = match input.find('[') {
            Some(start) => {
                let end = input
                    .rfind(']')
                    .filter(|end| *end > start)
                    .ok_or_else(|| invalid("unterminated '['"))?;
                if !input[end + 1..].trim().is_empty() {
                    return Err(invalid("nothing may follow the NLO bracket"));
                }
                (&input[..start], Some(input[start + 1..end].trim()))
            }
            None => (input, None),
        };

        let (nlo_mode, perturbation_couplings) = match bracket {
            None => (NloMode::Tree, vec![]),
            Some(content) => {
                let (mode, couplings) = match content.split_once('=') {
                    Some((mode, couplings)) => (mode.trim().parse::<NloMode>()?, couplings),
                    None => (NloMode::All, content),
                };
                let couplings: Vec<SmartString<LazyCompact>> = couplings
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|s| !s.is_empty())
                    .map(SmartString::from)
                    .collect();
                if couplings.is_empty() {
                    return Err(invalid("no perturbed coupling in the NLO bracket"));
                }
                for coupling in couplings.iter() {
                    if !model.has_order(coupling) {
                        return Err(ProcessError::UnknownCouplingOrder(
                            coupling.to_string(),
                            model.name.to_string(),
                        ));
                    }
                }
                (mode, couplings)
            }
        };

        let (initial, rest) = body
            .split_once('>')
            .ok_or_else(|| invalid("missing '>'"))?;
        if rest.contains('>') {
            return Err(invalid("decay chains are not supported"));
        }

        let mut orders = CouplingOrders::new();
        let mut final_tokens = vec![];
        for token in rest.split_whitespace() {
            if let Some((name, value)) = token.split_once("<=").or_else(|| token.split_once('=')) {
                let value = value
                    .parse::<usize>()
                    .map_err(|_| invalid(&format!("invalid coupling order '{}'", token)))?;
                orders.set(name, value);
            } else if orders.is_empty() {
                final_tokens.push(token);
            } else {
                return Err(invalid("particles must precede coupling orders"));
            }
        }
        orders.validate(&model)?;

        let resolve = |token: &str| -> Result<Vec<isize>, ProcessError> {
            match multiparticles.get(token) {
                Some(names) => names.iter().map(|name| resolve_particle(name, &model)).collect(),
                None => Ok(vec![resolve_particle(token, &model)?]),
            }
        };

        let initial_pdgs = initial
            .split_whitespace()
            .map(resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let final_pdgs = final_tokens
            .into_iter()
            .map(resolve)
            .collect::<Result<Vec<_>, _>>()?;

        if initial_pdgs.is_empty() || initial_pdgs.len() > 2 {
            return Err(invalid("one or two initial-state particles are required"));
        }
        if final_pdgs.is_empty() {
            return Err(invalid("no final-state particle"));
        }

        Ok(ProcessDefinition {
            initial_pdgs,
            final_pdgs,
            orders,
            perturbation_couplings,
            nlo_mode,
            model,
            input: input.trim().to_string(),
        })
    }

    /// All single processes of the definition. Final states that only differ
    /// by ordering are kept once per initial state.
    pub fn expand(&self) -> Result<Vec<Process>, ProcessError> {
        let mut processes = vec![];
        for initial in self.initial_pdgs.iter().multi_cartesian_product() {
            let initial: Vec<isize> = initial.into_iter().copied().collect();
            let mut seen_final_states = BTreeSet::new();
            for final_state in self.final_pdgs.iter().multi_cartesian_product() {
                let final_state: Vec<isize> = final_state.into_iter().copied().collect();
                let key: Vec<isize> = final_state.iter().copied().sorted().collect();
                if !seen_final_states.insert(key) {
                    continue;
                }
                processes.push(Process::from_pdgs(
                    &initial,
                    &final_state,
                    self.orders.clone(),
                    self.perturbation_couplings.clone(),
                    self.model.clone(),
                )?);
            }
        }
        Ok(processes)
    }
}

fn resolve_particle(name: &str, model: &Model) -> Result<isize, ProcessError> {
    model
        .find_particle(name)
        .map(|particle| particle.pdg_code)
        .ok_or_else(|| ProcessError::UnknownParticle(name.to_string(), model.name.to_string()))
}
