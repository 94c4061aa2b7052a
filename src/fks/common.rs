use std::sync::Arc;

use ahash::HashMap;
use itertools::Itertools;
use serde::Serialize;
use smartstring::{LazyCompact, SmartString};

use crate::feyngen::{leg_bit, Amplitude, LegMask, Line};
use crate::model::Model;
use crate::process::{CouplingOrders, FksTag, Leg, LegState, Process};

use super::color::{ColorFactor, ColorLink, ColorString, GLUON_INDEX, MIN_INDEX};
use super::FksError;

/// Three-point interactions of one perturbed order, and the particles they
/// involve.
#[derive(Debug, Clone, Default)]
pub struct PertInteractions {
    /// PDG codes of each interaction, all incoming.
    pub interactions: Vec<Vec<isize>>,
    pub pert_particles: Vec<isize>,
    pub soft_particles: Vec<isize>,
}

impl PertInteractions {
    pub fn is_pert(&self, pdg: isize) -> bool {
        self.pert_particles.binary_search(&pdg).is_ok()
    }

    pub fn is_soft(&self, pdg: isize) -> bool {
        self.soft_particles.binary_search(&pdg).is_ok()
    }
}

#[derive(Debug, Default)]
pub struct PertInteractionsCache {
    entries: HashMap<(SmartString<LazyCompact>, SmartString<LazyCompact>), Arc<PertInteractions>>,
}

impl PertInteractionsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, model: &Model, order: &str) -> Arc<PertInteractions> {
        self.entries
            .entry((model.name.clone(), order.into()))
            .or_insert_with(|| Arc::new(find_pert_particles_interactions(model, order)))
            .clone()
    }
}

/// Interactions with exactly one power of `order` and no other coupling, that
/// involve a massless self-conjugate vector.
pub fn find_pert_particles_interactions(model: &Model, order: &str) -> PertInteractions {
    let is_soft = |pdg: isize| {
        model.find_particle_from_pdg(pdg).is_some_and(|particle| {
            particle.is_massless() && particle.spin == 3 && particle.is_self_antiparticle()
        })
    };

    let mut interactions = vec![];
    for rule in model.vertex_rules.iter().filter(|rule| rule.n_legs() == 3) {
        let orders = rule
            .coupling_orders()
            .into_iter()
            .filter(|(_, value)| *value > 0)
            .collect::<Vec<_>>();
        if orders.len() != 1 || orders[0].0.as_str() != order || orders[0].1 != 1 {
            continue;
        }
        let pdgs = rule.pdg_codes();
        if pdgs.iter().any(|pdg| is_soft(*pdg)) {
            interactions.push(pdgs);
        }
    }

    let pert_particles = interactions
        .iter()
        .flatten()
        .copied()
        .sorted()
        .dedup()
        .collect::<Vec<_>>();
    let soft_particles = pert_particles
        .iter()
        .copied()
        .filter(|pdg| is_soft(*pdg))
        .collect();

    PertInteractions {
        interactions,
        pert_particles,
        soft_particles,
    }
}

pub fn to_fks_leg(leg: &Leg, model: &Model) -> Result<Leg, FksError> {
    Ok(Leg::new(leg.id, leg.number, leg.state, model)?.with_fks(leg.fks))
}

/// Refreshes the color, spin and mass attributes of every leg from the model.
pub fn to_fks_legs(legs: &[Leg], model: &Model) -> Result<Vec<Leg>, FksError> {
    legs.iter().map(|leg| to_fks_leg(leg, model)).collect()
}

/// Positions of `legs` in sorted order.
pub fn leg_sort_order(legs: &[Leg]) -> Vec<usize> {
    let initial = (0..legs.len()).filter(|k| !legs[*k].is_final());
    let final_legs = (0..legs.len())
        .filter(|k| legs[*k].is_final())
        .sorted_by_key(|k| {
            let leg = &legs[*k];
            (leg.color.abs(), leg.massless, leg.spin.abs(), leg.id)
        });
    initial.chain(final_legs).collect()
}

pub fn sort_legs(legs: Vec<Leg>) -> Vec<Leg> {
    let order = leg_sort_order(&legs);
    order
        .into_iter()
        .enumerate()
        .map(|(position, k)| {
            let mut leg = legs[k].clone();
            leg.number = position + 1;
            leg
        })
        .collect()
}

pub fn sort_proc(process: &Process) -> Result<Process, FksError> {
    let legs = to_fks_legs(&process.legs, &process.model)?;
    Ok(Process::new(
        sort_legs(legs),
        process.orders.clone(),
        process.perturbation_couplings.clone(),
        process.model.clone(),
    ))
}

/// Tags a pair of final-state legs, listed `[j, i]`. A massless vector is
/// `i`, otherwise the antiparticle is.
pub fn ij_final(pair: [Leg; 2]) -> Vec<Leg> {
    let [first, second] = pair;
    let is_i = |leg: &Leg, other: &Leg| {
        leg.is_massless_vector() || (leg.id < 0 && !other.is_massless_vector())
    };
    if is_i(&first, &second) {
        vec![second.with_fks(FksTag::J), first.with_fks(FksTag::I)]
    } else {
        vec![first.with_fks(FksTag::J), second.with_fks(FksTag::I)]
    }
}

/// Splittings of `leg` into the two particles left in an interaction once
/// the leg itself is removed.
pub fn split_leg(leg: &Leg, parts: [isize; 2], model: &Model) -> Result<Vec<Vec<Leg>>, FksError> {
    if leg.is_final() {
        let pair = [
            Leg::new(model.anti_pdg(parts[0]), leg.number, leg.state, model)?,
            Leg::new(model.anti_pdg(parts[1]), leg.number, leg.state, model)?,
        ];
        return Ok(vec![ij_final(pair)]);
    }

    let mut choices = vec![(parts[0], parts[1])];
    if parts[0] != parts[1] {
        choices.push((parts[1], parts[0]));
    }
    choices
        .into_iter()
        .map(|(j, other)| -> Result<Vec<Leg>, FksError> {
            let j = Leg::new(j, leg.number, leg.state, model)?.with_fks(FksTag::J);
            let i = Leg::new(model.anti_pdg(other), leg.number, LegState::Final, model)?
                .with_fks(FksTag::I);
            Ok(vec![j, i])
        })
        .collect()
}

pub fn find_splittings(
    leg: &Leg,
    model: &Model,
    cache: &mut PertInteractionsCache,
    order: &str,
) -> Result<Vec<Vec<Leg>>, FksError> {
    let pert = cache.get(model, order);
    if !pert.is_pert(leg.id) {
        return Ok(vec![]);
    }
    let slot = if leg.is_final() {
        leg.id
    } else {
        model.anti_pdg(leg.id)
    };

    let mut splittings: Vec<Vec<Leg>> = vec![];
    for interaction in pert.interactions.iter() {
        let Some(position) = interaction.iter().position(|pdg| *pdg == slot) else {
            continue;
        };
        let mut parts = interaction.clone();
        parts.remove(position);
        for split in split_leg(leg, [parts[0], parts[1]], model)? {
            if !splittings.contains(&split) {
                splittings.push(split);
            }
        }
    }
    Ok(splittings)
}

/// Replaces `leg` by the legs of `split` and sorts the result.
pub fn insert_legs(leglist: &[Leg], leg: &Leg, split: &[Leg]) -> Vec<Leg> {
    let mut legs = leglist.to_vec();
    let position = match legs.iter().position(|l| l.number == leg.number) {
        Some(position) => {
            legs.remove(position);
            position
        }
        None => legs.len(),
    };
    for (offset, split_leg) in split.iter().enumerate() {
        legs.insert(position + offset, split_leg.clone());
    }
    sort_legs(legs)
}

/// Legs `ij` that `i` and `j` can merge into through a perturbative
/// interaction. `i` must be a final-state leg.
pub fn combine_ij(
    i: &Leg,
    j: &Leg,
    model: &Model,
    cache: &mut PertInteractionsCache,
    order: &str,
) -> Result<Vec<Leg>, FksError> {
    let pert = cache.get(model, order);
    let number = i.number.min(j.number);

    let mut not_double_counting = (j.is_massless_vector() && i.is_massless_vector())
        || j.spin != 3
        || !j.massless
        || !j.is_final();
    if j.is_final() && j.id == -i.id {
        not_double_counting = not_double_counting && j.id > 0;
    }
    if !(i.is_final() && pert.is_pert(i.id) && pert.is_pert(j.id) && not_double_counting) {
        return Ok(vec![]);
    }

    let j_slot = if j.is_final() {
        model.anti_pdg(j.id)
    } else {
        j.id
    };
    let i_slot = model.anti_pdg(i.id);

    let mut merged: Vec<Leg> = vec![];
    for interaction in pert.interactions.iter() {
        let mut parts = interaction.clone();
        let Some(position) = parts.iter().position(|pdg| *pdg == i_slot) else {
            continue;
        };
        parts.remove(position);
        let Some(position) = parts.iter().position(|pdg| *pdg == j_slot) else {
            continue;
        };
        parts.remove(position);
        let id = if j.is_final() {
            parts[0]
        } else {
            model.anti_pdg(parts[0])
        };
        if merged.iter().all(|leg| leg.id != id) {
            merged.push(Leg::new(id, number, j.state, model)?);
        }
    }
    Ok(merged)
}

/// Largest power of every coupling order over the diagrams of `amplitude`.
pub fn find_orders(amplitude: &Amplitude) -> CouplingOrders {
    let mut orders = CouplingOrders::new();
    for diagram in amplitude.diagrams.iter() {
        orders.max_merge(&diagram.orders);
    }
    orders
}

/// Ordered pairs of colored legs. A massive leg is also linked to itself.
pub fn find_color_links(leglist: &[Leg]) -> Vec<ColorLink> {
    let mut color_links = vec![];
    for leg1 in leglist.iter() {
        for leg2 in leglist.iter() {
            if leg1.color != 1
                && leg2.color != 1
                && (leg1.number != leg2.number || !leg1.massless)
            {
                color_links.push(legs_to_color_link_string(leg1, leg2));
            }
        }
    }
    color_links
}

pub fn legs_to_color_link_string(leg1: &Leg, leg2: &Leg) -> ColorLink {
    let mut min_index = MIN_INDEX;
    let iglu = GLUON_INDEX;
    let mut string = ColorString::default();
    let mut replacements = vec![];

    if leg1.number != leg2.number {
        for leg in [leg1, leg2] {
            min_index -= 1;
            let num = leg.number as isize;
            replacements.push([num, min_index]);
            let icol = if leg.is_final() { 1 } else { -1 };
            match leg.color * icol {
                3 => {
                    string.product(ColorFactor::T(vec![iglu, num, min_index]), false);
                    string.coefficient = string.coefficient.times(-1, 1);
                }
                -3 => string.product(ColorFactor::T(vec![iglu, min_index, num]), false),
                _ if leg.color == 8 => {
                    string.product(ColorFactor::F(min_index, iglu, num), true)
                }
                _ => {}
            }
        }
    } else {
        let num = leg1.number as isize;
        replacements.push([num, min_index - 1]);
        let icol = if leg1.is_final() { 1 } else { -1 };
        match leg1.color * icol {
            3 => string.product(ColorFactor::T(vec![iglu, iglu, num, min_index - 1]), false),
            -3 => string.product(ColorFactor::T(vec![iglu, iglu, min_index - 1, num]), false),
            _ if leg1.color == 8 => {
                string.product(ColorFactor::F(min_index - 1, iglu, iglu - 1), true);
                string.product(ColorFactor::F(iglu - 1, iglu, num), true);
            }
            _ => {}
        }
        string.coefficient = string.coefficient.times(1, 2);
    }

    ColorLink {
        legs: [leg1.clone(), leg2.clone()],
        string,
        replacements,
    }
}

/// A real-emission diagram that reduces to a Born diagram once the `i`/`j`
/// pair is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigurationLink {
    pub real_diagram: usize,
    pub born_diagram: usize,
}

fn all_legs_mask(n_legs: usize) -> LegMask {
    if n_legs >= LegMask::BITS as usize {
        LegMask::MAX
    } else {
        (1 << n_legs) - 1
    }
}

/// Propagators seen from the side that does not contain leg 1.
fn canonical_propagators(
    propagators: impl Iterator<Item = Line>,
    all_legs: LegMask,
    model: &Model,
) -> Vec<Line> {
    propagators
        .map(|line| {
            if line.mask & 1 != 0 {
                Line {
                    mask: all_legs ^ line.mask,
                    pdg: model.anti_pdg(line.pdg),
                }
            } else {
                line
            }
        })
        .sorted()
        .collect()
}

/// Pairs each real-emission diagram with the Born diagrams it collapses to
/// when the propagator joining `i_fks` and `j_fks` is contracted.
pub fn link_rb_conf(
    born: &Amplitude,
    real: &Amplitude,
    i_fks: usize,
    j_fks: usize,
    ij: usize,
) -> Vec<ConfigurationLink> {
    let model = real.process.model.as_ref();
    let real_legs = &real.process.legs;
    let (Some(ij_leg), Some(leg_j)) = (
        born.process.legs.get(ij.wrapping_sub(1)),
        real_legs.get(j_fks.wrapping_sub(1)),
    ) else {
        return vec![];
    };

    // Born leg number of each real leg, `j` standing for the merged leg.
    let mut merged = vec![];
    let mut origin = vec![];
    for leg in real_legs.iter().filter(|leg| leg.number != i_fks) {
        if leg.number == j_fks {
            let mut ij_merged = ij_leg.clone();
            ij_merged.state = leg_j.state;
            merged.push(ij_merged);
        } else {
            merged.push(leg.clone());
        }
        origin.push(leg.number);
    }
    let mut born_number = vec![0; real_legs.len() + 1];
    for (position, k) in leg_sort_order(&merged).into_iter().enumerate() {
        born_number[origin[k]] = position + 1;
    }
    let to_born_mask = |mask: LegMask| {
        (1..=real_legs.len())
            .filter(|number| mask & leg_bit(*number) != 0 && born_number[*number] != 0)
            .fold(0, |acc, number| acc | leg_bit(born_number[number]))
    };

    let real_all = all_legs_mask(real_legs.len());
    let born_all = all_legs_mask(born.process.legs.len());
    let ij_bits = leg_bit(i_fks) | leg_bit(j_fks);
    let i_bit = leg_bit(i_fks);

    let born_keys = born
        .diagrams
        .iter()
        .map(|diagram| canonical_propagators(diagram.propagators.iter().copied(), born_all, model))
        .collect::<Vec<_>>();

    let mut links = vec![];
    for (real_diagram, diagram) in real.diagrams.iter().enumerate() {
        let Some(contracted) = diagram
            .propagators
            .iter()
            .position(|line| line.mask == ij_bits || line.mask == real_all ^ ij_bits)
        else {
            continue;
        };
        let mapped = diagram
            .propagators
            .iter()
            .enumerate()
            .filter(|(k, _)| *k != contracted)
            .map(|(_, line)| {
                let (side, pdg) = if line.mask & i_bit != 0 {
                    (real_all ^ line.mask, model.anti_pdg(line.pdg))
                } else {
                    (line.mask, line.pdg)
                };
                Line {
                    mask: to_born_mask(side),
                    pdg,
                }
            });
        let key = canonical_propagators(mapped, born_all, model);
        for (born_diagram, born_key) in born_keys.iter().enumerate() {
            if *born_key == key {
                links.push(ConfigurationLink {
                    real_diagram,
                    born_diagram,
                });
            }
        }
    }
    links
}
