use std::collections::BTreeSet;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, info};
use smartstring::{LazyCompact, SmartString};

use crate::feyngen::{
    Amplitude, AmplitudeCache, AmplitudeGenerator, LoopAmplitude, LoopAmplitudeGenerator,
};
use crate::process::{Leg, Process, ProcessDefinition, WEIGHTED};
use crate::GenerationSettings;

use super::color::ColorLink;
use super::common::{
    find_color_links, find_orders, find_splittings, insert_legs, link_rb_conf, sort_proc,
    to_fks_legs, ConfigurationLink, PertInteractionsCache,
};
use super::real::FksRealProcess;
use super::FksError;

/// What an FKS Born process can be built from.
#[derive(Debug, Clone)]
pub enum StartProcess {
    Process(Process),
    Amplitude(Arc<Amplitude>),
    /// Not a valid start, definitions go through the multi-process
    /// orchestrator.
    Definition(ProcessDefinition),
}

/// Real emissions and color links of one Born process.
#[derive(Debug, Clone)]
pub struct FksProcessFromBorn {
    pub born_process: Process,
    pub born_amplitude: Arc<Amplitude>,
    pub leglist: Vec<Leg>,
    pub nincoming: usize,
    pub pdg_codes: Vec<isize>,
    pub colors: Vec<isize>,
    /// Splittings of each Born leg, in `[j, i]` order.
    pub splittings: Vec<Vec<Vec<Leg>>>,
    /// Candidate real-emission leglists of each Born leg.
    pub reals: Vec<Vec<Vec<Leg>>>,
    /// Perturbation order of each candidate, parallel to `reals`.
    pub real_orders: Vec<Vec<SmartString<LazyCompact>>>,
    pub real_amps: Vec<FksRealProcess>,
    pub color_links: Vec<ColorLink>,
    pub virt_amp: Option<Arc<LoopAmplitude>>,
    pub remove_reals: bool,
}

impl FksProcessFromBorn {
    pub fn new<G: AmplitudeGenerator + ?Sized>(
        start: StartProcess,
        remove_reals: bool,
        generator: &G,
        cache: &mut AmplitudeCache,
    ) -> Result<FksProcessFromBorn, FksError> {
        let mut born_process = match start {
            StartProcess::Process(process) => sort_proc(&process)?,
            StartProcess::Amplitude(amplitude) => sort_proc(&amplitude.process)?,
            StartProcess::Definition(definition) => {
                return Err(FksError::Construction(format!(
                    "expected a process or an amplitude, got the process definition '{}'",
                    definition.input
                )))
            }
        };
        let born_amplitude = cache.get_or_generate(&born_process, generator)?;
        let leglist = to_fks_legs(&born_process.legs, &born_process.model)?;
        born_process.orders = find_orders(&born_amplitude);

        let n_legs = leglist.len();
        let mut born = FksProcessFromBorn {
            nincoming: leglist.iter().filter(|leg| !leg.is_final()).count(),
            pdg_codes: leglist.iter().map(|leg| leg.id).collect(),
            colors: leglist.iter().map(|leg| leg.color).collect(),
            born_process,
            born_amplitude,
            leglist,
            splittings: vec![vec![]; n_legs],
            reals: vec![vec![]; n_legs],
            real_orders: vec![vec![]; n_legs],
            real_amps: vec![],
            color_links: vec![],
            virt_amp: None,
            remove_reals,
        };

        let mut pert_cache = PertInteractionsCache::new();
        for order in born.born_process.perturbation_couplings.clone() {
            born.find_reals(&order, &mut pert_cache)?;
        }
        born.find_color_links();
        debug!(
            "{}: {} candidate real emissions, {} color links",
            born.born_process.nice_string(),
            born.reals.iter().map(|reals| reals.len()).sum::<usize>(),
            born.color_links.len()
        );
        Ok(born)
    }

    /// Builds the Born process with `remove_reals` read from YAML settings.
    pub fn with_settings<G: AmplitudeGenerator + ?Sized>(
        start: StartProcess,
        settings: &serde_yaml::Value,
        generator: &G,
        cache: &mut AmplitudeCache,
    ) -> Result<FksProcessFromBorn, FksError> {
        let settings = GenerationSettings::from_yaml_value(settings)?;
        FksProcessFromBorn::new(start, settings.remove_reals, generator, cache)
    }

    /// Appends the candidate real-emission leglists of every Born leg under
    /// the perturbation `order`.
    pub fn find_reals(
        &mut self,
        order: &str,
        pert_cache: &mut PertInteractionsCache,
    ) -> Result<(), FksError> {
        let model = self.born_process.model.clone();
        for (k, leg) in self.leglist.iter().enumerate() {
            let splittings = find_splittings(leg, &model, pert_cache, order)?;
            for split in splittings.iter() {
                self.reals[k].push(insert_legs(&self.leglist, leg, split));
                self.real_orders[k].push(order.into());
            }
            self.splittings[k].extend(splittings);
        }
        Ok(())
    }

    pub fn generate_reals<G: AmplitudeGenerator + ?Sized>(
        &mut self,
        generator: &G,
        cache: &mut AmplitudeCache,
    ) -> Result<(), FksError> {
        for (k, leg) in self.leglist.iter().enumerate() {
            let ijglu = if leg.is_massless_vector() { k + 1 } else { 0 };
            for (leglist, order) in self.reals[k].iter().zip(self.real_orders[k].iter()) {
                // Only the order that produced the splitting is raised.
                self.real_amps.push(FksRealProcess::new(
                    &self.born_process,
                    leglist.clone(),
                    leg.number,
                    ijglu,
                    std::slice::from_ref(order),
                    cache,
                    generator,
                )?);
            }
        }
        self.find_reals_to_integrate();
        self.find_real_nbodyonly()
    }

    pub fn find_reals_to_integrate(&mut self) {
        let discarded = double_counted_reals(&self.real_amps, self.nincoming);
        for k in discarded.iter() {
            self.real_amps[*k].is_to_integrate = false;
        }
        if self.remove_reals {
            self.real_amps.retain(|real| real.is_to_integrate);
        }
        debug!(
            "{}: {} of {} real emissions are double counted",
            self.born_process.nice_string(),
            discarded.len(),
            self.real_amps.len() + if self.remove_reals { discarded.len() } else { 0 }
        );
    }

    pub fn find_real_nbodyonly(&mut self) -> Result<(), FksError> {
        let selected = select_nbody_only(&self.real_amps, &self.pdg_codes, self.nincoming)?;
        for (k, real) in self.real_amps.iter_mut().enumerate() {
            real.is_nbody_only = k == selected;
        }
        Ok(())
    }

    pub fn find_color_links(&mut self) {
        self.color_links = find_color_links(&self.leglist);
    }

    /// Born diagrams each real-emission diagram reduces to, parallel to
    /// `real_amps`.
    pub fn link_rb_confs(&self) -> Vec<Vec<ConfigurationLink>> {
        self.real_amps
            .iter()
            .map(|real| {
                link_rb_conf(
                    &self.born_amplitude,
                    &real.amplitude,
                    real.i_fks,
                    real.j_fks,
                    real.ij,
                )
            })
            .collect()
    }

    pub fn generate_virtuals<L: LoopAmplitudeGenerator + ?Sized>(
        &mut self,
        loop_generator: &L,
    ) -> Result<(), FksError> {
        let mut process = self.born_process.clone();
        process.orders.remove(WEIGHTED);
        let amplitude = loop_generator.generate_loop(&process)?;
        if amplitude.has_diagrams() {
            self.virt_amp = Some(Arc::new(amplitude));
        } else {
            info!("No virtual diagrams for {}", self.born_process.nice_string());
        }
        Ok(())
    }

    /// One amplitude per real emission, shared handles included.
    pub fn real_amplitudes(&self) -> Vec<Arc<Amplitude>> {
        self.real_amps
            .iter()
            .map(|real| real.amplitude.clone())
            .collect()
    }
}

/// Positions of the real emissions that duplicate the singular region of a
/// better-ordered one. Of two identical entries the later one is kept.
pub fn double_counted_reals(reals: &[FksRealProcess], nincoming: usize) -> BTreeSet<usize> {
    let mut discarded = BTreeSet::new();
    for m in 0..reals.len() {
        for n in m + 1..reals.len() {
            let (a, b) = (&reals[m], &reals[n]);
            let (a_i, a_j) = (a.get_leg_i().id, a.get_leg_j().id);
            let (b_i, b_j) = (b.get_leg_i().id, b.get_leg_j().id);
            if a.j_fks > nincoming && b.j_fks > nincoming {
                if (a_i == b_i && a_j == b_j) || (a_i == b_j && a_j == b_i) {
                    if (a.i_fks, a.j_fks) < (b.i_fks, b.j_fks) {
                        discarded.insert(n);
                    } else {
                        discarded.insert(m);
                    }
                }
            } else if a.j_fks == b.j_fks && a.j_fks <= nincoming && a_i == b_i && a_j == b_j {
                if a.i_fks < b.i_fks {
                    discarded.insert(n);
                } else {
                    discarded.insert(m);
                }
            }
        }
    }
    discarded
}

/// Position of the real emission that also carries the n-body contribution.
pub fn select_nbody_only(
    reals: &[FksRealProcess],
    born_pdgs: &[isize],
    nincoming: usize,
) -> Result<usize, FksError> {
    let born_multiset = born_pdgs.iter().counts();
    let qualifies = |real: &FksRealProcess| {
        let real_multiset = real.pdgs.iter().counts();
        real.is_to_integrate
            && real.pdgs.len() == born_pdgs.len() + 1
            && real.pdgs[..nincoming] == born_pdgs[..nincoming]
            && born_multiset
                .iter()
                .all(|(pdg, n)| real_multiset.get(pdg).copied().unwrap_or(0) >= *n)
    };

    // The bounds are never raised, so the last qualifying entry wins.
    let (max_i, max_j) = (0, 0);
    let mut selected = None;
    for (k, real) in reals.iter().enumerate() {
        if qualifies(real) && real.i_fks >= max_i && real.j_fks >= max_j {
            selected = Some(k);
        }
    }
    selected.ok_or_else(|| FksError::Consistency("nbody configuration not found".into()))
}
