use std::sync::Arc;

use indexmap::IndexMap;
use smartstring::{LazyCompact, SmartString};

use crate::feyngen::{Amplitude, AmplitudeCache, AmplitudeGenerator};
use crate::process::{CouplingOrders, FksTag, Leg, Process, WEIGHTED};

use super::common::{combine_ij, sort_legs, PertInteractionsCache};
use super::FksError;

/// Increase of WEIGHTED for one extra power of `order`.
fn weighted_step(order: &str) -> usize {
    if order == "QCD" {
        1
    } else {
        2
    }
}

pub fn default_perturbed_orders() -> Vec<SmartString<LazyCompact>> {
    vec!["QCD".into()]
}

/// A real-emission process obtained by splitting one Born leg.
#[derive(Debug, Clone)]
pub struct FksRealProcess {
    pub process: Process,
    pub i_fks: usize,
    pub j_fks: usize,
    /// Number of the Born leg that was split.
    pub ij: usize,
    /// Position of the split Born leg if it is a gluon, else 0.
    pub ijglu: usize,
    pub pdgs: Vec<isize>,
    pub colors: Vec<isize>,
    pub is_to_integrate: bool,
    pub is_nbody_only: bool,
    pub need_color_links: bool,
    pub amplitude: Arc<Amplitude>,
    pub perturbed_orders: Vec<SmartString<LazyCompact>>,
}

impl FksRealProcess {
    #[allow(clippy::too_many_arguments)]
    pub fn new<G: AmplitudeGenerator + ?Sized>(
        born: &Process,
        leglist: Vec<Leg>,
        ij: usize,
        ijglu: usize,
        perturbed_orders: &[SmartString<LazyCompact>],
        cache: &mut AmplitudeCache,
        generator: &G,
    ) -> Result<FksRealProcess, FksError> {
        let position_of = |tag: FksTag| {
            leglist
                .iter()
                .position(|leg| leg.fks == tag)
                .map(|position| position + 1)
                .ok_or_else(|| {
                    FksError::Consistency(format!("no leg tagged '{}' in the real-emission leglist", tag))
                })
        };
        let i_fks = position_of(FksTag::I)?;
        let j_fks = position_of(FksTag::J)?;

        let leg_i = &leglist[i_fks - 1];
        let need_color_links = leg_i.massless && leg_i.spin == 3 && leg_i.color == 8;

        let perturbed_orders = if perturbed_orders.is_empty() {
            default_perturbed_orders()
        } else {
            perturbed_orders.to_vec()
        };
        let mut orders = born.orders.clone();
        for order in perturbed_orders.iter() {
            orders.increment(order, 1);
            if orders.get(WEIGHTED).is_some() {
                orders.increment(WEIGHTED, weighted_step(order));
            }
        }

        let pdgs = leglist.iter().map(|leg| leg.id).collect();
        let colors = leglist.iter().map(|leg| leg.color).collect();
        let process = Process::new(
            leglist,
            orders,
            born.perturbation_couplings.clone(),
            born.model.clone(),
        );
        let amplitude = cache.get_or_generate(&process, generator)?;

        Ok(FksRealProcess {
            process,
            i_fks,
            j_fks,
            ij,
            ijglu,
            pdgs,
            colors,
            is_to_integrate: true,
            is_nbody_only: false,
            need_color_links,
            amplitude,
            perturbed_orders,
        })
    }

    pub fn get_leg_i(&self) -> &Leg {
        &self.process.legs[self.i_fks - 1]
    }

    pub fn get_leg_j(&self) -> &Leg {
        &self.process.legs[self.j_fks - 1]
    }

    /// Orders of the Born process this real emission was built from.
    pub fn born_orders(&self) -> CouplingOrders {
        let mut orders = self.process.orders.clone();
        for order in self.perturbed_orders.iter() {
            if let Some(value) = orders.get(order) {
                orders.set(order, value.saturating_sub(1));
            }
            if let Some(value) = orders.get(WEIGHTED) {
                orders.set(WEIGHTED, value.saturating_sub(weighted_step(order)));
            }
        }
        orders
    }

    /// For every leg, the legs `j` it can be paired with as `i`. Only
    /// final-state legs have partners.
    pub fn find_fks_j_from_i<G: AmplitudeGenerator + ?Sized>(
        &self,
        generator: &G,
        cache: &mut AmplitudeCache,
        pert_cache: &mut PertInteractionsCache,
    ) -> Result<IndexMap<usize, Vec<usize>>, FksError> {
        let model = self.process.model.as_ref();
        let born_orders = self.born_orders();
        let mut fks_j_from_i = IndexMap::new();
        for leg_i in self.process.legs.iter() {
            let mut partners = vec![];
            if leg_i.is_final() {
                for leg_j in self.process.legs.iter().filter(|leg| leg.number != leg_i.number) {
                    for order in self.perturbed_orders.iter() {
                        for ij in combine_ij(leg_i, leg_j, model, pert_cache, order)? {
                            let trial = FksBornProcess::new(
                                &self.process,
                                leg_i,
                                leg_j,
                                ij,
                                born_orders.clone(),
                                cache,
                                generator,
                            )?;
                            if trial.amplitude.has_diagrams() && !partners.contains(&leg_j.number) {
                                partners.push(leg_j.number);
                            }
                        }
                    }
                }
            }
            fks_j_from_i.insert(leg_i.number, partners);
        }
        Ok(fks_j_from_i)
    }
}

/// Born-like process obtained by merging legs `i` and `j` of a real emission.
#[derive(Debug, Clone)]
pub struct FksBornProcess {
    pub process: Process,
    pub i_fks: usize,
    pub j_fks: usize,
    pub ij: Leg,
    pub amplitude: Arc<Amplitude>,
}

impl FksBornProcess {
    #[allow(clippy::too_many_arguments)]
    pub fn new<G: AmplitudeGenerator + ?Sized>(
        real: &Process,
        leg_i: &Leg,
        leg_j: &Leg,
        ij: Leg,
        orders: CouplingOrders,
        cache: &mut AmplitudeCache,
        generator: &G,
    ) -> Result<FksBornProcess, FksError> {
        let mut legs = real
            .legs
            .iter()
            .filter(|leg| leg.number != leg_i.number && leg.number != leg_j.number)
            .cloned()
            .collect::<Vec<_>>();
        let position = ij.number.saturating_sub(1).min(legs.len());
        legs.insert(position, ij.clone());
        let process = Process::new(
            sort_legs(legs),
            orders,
            real.perturbation_couplings.clone(),
            real.model.clone(),
        );
        let amplitude = cache.get_or_generate(&process, generator)?;
        Ok(FksBornProcess {
            process,
            i_fks: leg_i.number,
            j_fks: leg_j.number,
            ij,
            amplitude,
        })
    }
}
