use ahash::HashMap;
use itertools::Itertools;
use smallvec::SmallVec;

use crate::model::Model;
use crate::process::{CouplingOrders, Process, WEIGHTED};

use super::{leg_bit, Amplitude, AmplitudeGenerator, Diagram, DiagramVertex, FeynGenError, LegMask, Line};

/// Tree-level generator combining off-shell currents over subsets of the
/// external legs. The last leg closes every diagram.
#[derive(Debug, Clone)]
pub struct TreeGenerator {
    pub max_external_legs: usize,
}

impl Default for TreeGenerator {
    fn default() -> Self {
        TreeGenerator {
            max_external_legs: 12,
        }
    }
}

struct Rule {
    position: usize,
    pdgs: SmallVec<[isize; 4]>,
    orders: CouplingOrders,
}

#[derive(Debug, Clone)]
struct Way {
    rule: usize,
    blocks: SmallVec<[(LegMask, usize); 3]>,
}

#[derive(Debug, Clone)]
struct Current {
    pdg: isize,
    orders: CouplingOrders,
    ways: Vec<Way>,
}

#[derive(Debug, Clone, Default)]
struct PartialDiagram {
    vertices: Vec<DiagramVertex>,
    propagators: Vec<Line>,
}

/// Submasks of `mask` in ascending order, including `0` and `mask`.
fn submasks(mask: LegMask) -> impl Iterator<Item = LegMask> {
    let mut next = Some(0);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current == mask {
            None
        } else {
            Some(current.wrapping_sub(mask) & mask)
        };
        Some(current)
    })
}

/// Unordered partitions of `mask` into `n_blocks` non-empty blocks, 2 or 3.
/// Blocks are listed by their lowest leg.
pub(crate) fn set_partitions(mask: LegMask, n_blocks: usize) -> Vec<SmallVec<[LegMask; 3]>> {
    let mut partitions = vec![];
    let low = mask & mask.wrapping_neg();
    let rest = mask ^ low;
    for sub in submasks(rest) {
        let first = low | sub;
        let remainder = rest ^ sub;
        match n_blocks {
            2 => {
                if remainder != 0 {
                    partitions.push(SmallVec::from_slice(&[first, remainder]));
                }
            }
            3 => {
                if remainder.count_ones() < 2 {
                    continue;
                }
                let second_low = remainder & remainder.wrapping_neg();
                let second_rest = remainder ^ second_low;
                for sub2 in submasks(second_rest) {
                    if sub2 == second_rest {
                        continue;
                    }
                    partitions.push(SmallVec::from_slice(&[
                        first,
                        second_low | sub2,
                        second_rest ^ sub2,
                    ]));
                }
            }
            _ => {}
        }
    }
    partitions
}

/// Removes `inputs` from the vertex particles, returning the single leftover.
fn match_vertex(rule_pdgs: &[isize], inputs: &[isize]) -> Option<isize> {
    let mut remaining: SmallVec<[isize; 4]> = SmallVec::from_slice(rule_pdgs);
    for pdg in inputs {
        let position = remaining.iter().position(|p| p == pdg)?;
        remaining.swap_remove(position);
    }
    if remaining.len() == 1 {
        Some(remaining[0])
    } else {
        None
    }
}

fn add_orders(target: &mut CouplingOrders, other: &CouplingOrders) {
    for (name, value) in other.iter() {
        target.increment(name, *value);
    }
}

fn within_bounds(bounds: &CouplingOrders, orders: &CouplingOrders, model: &Model) -> bool {
    if !bounds.allows(orders) {
        return false;
    }
    match bounds.get(WEIGHTED) {
        Some(max) => orders.weighted(model) <= max,
        None => true,
    }
}

impl TreeGenerator {
    pub fn new(max_external_legs: usize) -> Self {
        TreeGenerator { max_external_legs }
    }

    fn build_currents(
        &self,
        model: &Model,
        incoming_pdgs: &[isize],
        bounds: &CouplingOrders,
        rules: &[Rule],
    ) -> HashMap<LegMask, Vec<Current>> {
        let n_currents = incoming_pdgs.len() - 1;
        let full: LegMask = (1 << n_currents) - 1;
        let mut currents: HashMap<LegMask, Vec<Current>> = HashMap::default();
        for (i, pdg) in incoming_pdgs.iter().take(n_currents).enumerate() {
            currents.insert(
                leg_bit(i + 1),
                vec![Current {
                    pdg: *pdg,
                    orders: CouplingOrders::new(),
                    ways: vec![],
                }],
            );
        }

        let masks = (1..=full)
            .filter(|mask| mask.count_ones() >= 2)
            .sorted_by_key(|mask| (mask.count_ones(), *mask))
            .collect::<Vec<_>>();

        for mask in masks {
            let mut entries: Vec<Current> = vec![];
            for n_blocks in [2, 3] {
                for blocks in set_partitions(mask, n_blocks) {
                    let block_currents = blocks
                        .iter()
                        .map(|block| currents.get(block).map(|c| c.as_slice()).unwrap_or(&[]))
                        .collect::<SmallVec<[&[Current]; 3]>>();
                    if block_currents.iter().any(|c| c.is_empty()) {
                        continue;
                    }
                    for choice in block_currents
                        .iter()
                        .map(|c| 0..c.len())
                        .multi_cartesian_product()
                    {
                        let inputs = choice
                            .iter()
                            .enumerate()
                            .map(|(b, idx)| block_currents[b][*idx].pdg)
                            .collect::<SmallVec<[isize; 3]>>();
                        let mut input_orders = CouplingOrders::new();
                        for (b, idx) in choice.iter().enumerate() {
                            add_orders(&mut input_orders, &block_currents[b][*idx].orders);
                        }
                        for rule in rules.iter().filter(|r| r.pdgs.len() == n_blocks + 1) {
                            let Some(leftover) = match_vertex(&rule.pdgs, &inputs) else {
                                continue;
                            };
                            let mut orders = input_orders.clone();
                            add_orders(&mut orders, &rule.orders);
                            if !within_bounds(bounds, &orders, model) {
                                continue;
                            }
                            let pdg = model.anti_pdg(leftover);
                            let way = Way {
                                rule: rule.position,
                                blocks: blocks.iter().copied().zip(choice.iter().copied()).collect(),
                            };
                            match entries
                                .iter_mut()
                                .find(|e| e.pdg == pdg && e.orders == orders)
                            {
                                Some(entry) => entry.ways.push(way),
                                None => entries.push(Current {
                                    pdg,
                                    orders,
                                    ways: vec![way],
                                }),
                            }
                        }
                    }
                }
            }
            if !entries.is_empty() {
                currents.insert(mask, entries);
            }
        }
        currents
    }

    fn expand(
        &self,
        model: &Model,
        currents: &HashMap<LegMask, Vec<Current>>,
        all_legs: LegMask,
        full: LegMask,
        mask: LegMask,
        index: usize,
    ) -> Vec<PartialDiagram> {
        let current = &currents[&mask][index];
        if current.ways.is_empty() {
            return vec![PartialDiagram::default()];
        }
        let mut expanded = vec![];
        for way in current.ways.iter() {
            let sub_diagrams = way
                .blocks
                .iter()
                .map(|(block, idx)| self.expand(model, currents, all_legs, full, *block, *idx))
                .collect::<Vec<_>>();
            let mut lines = way
                .blocks
                .iter()
                .map(|(block, idx)| Line {
                    mask: *block,
                    pdg: currents[block][*idx].pdg,
                })
                .collect::<Vec<_>>();
            lines.push(Line {
                mask: all_legs ^ mask,
                pdg: model.anti_pdg(current.pdg),
            });
            let vertex = DiagramVertex {
                rule: model.vertex_rules[way.rule].name.clone(),
                lines,
            };
            for combination in sub_diagrams
                .iter()
                .map(|sub| sub.iter())
                .multi_cartesian_product()
            {
                let mut partial = PartialDiagram::default();
                for sub in combination {
                    partial.vertices.extend(sub.vertices.iter().cloned());
                    partial.propagators.extend(sub.propagators.iter().copied());
                }
                partial.vertices.push(vertex.clone());
                if mask != full {
                    partial.propagators.push(Line {
                        mask,
                        pdg: current.pdg,
                    });
                }
                expanded.push(partial);
            }
        }
        expanded
    }
}

impl AmplitudeGenerator for TreeGenerator {
    fn generate(&self, process: &Process) -> Result<Amplitude, FeynGenError> {
        let model = process.model.as_ref();
        let n_legs = process.legs.len();
        if n_legs < 3 {
            return Err(FeynGenError::TooFewLegs(n_legs));
        }
        let max_legs = self.max_external_legs.min(LegMask::BITS as usize);
        if n_legs > max_legs {
            return Err(FeynGenError::TooManyLegs(n_legs, max_legs));
        }

        // All-incoming convention: final-state legs enter as antiparticles.
        let incoming_pdgs = process
            .legs
            .iter()
            .map(|leg| {
                let particle = model
                    .find_particle_from_pdg(leg.id)
                    .ok_or_else(|| FeynGenError::UnknownParticle(leg.id, model.name.to_string()))?;
                Ok(if leg.is_final() {
                    particle.get_anti_particle(model).pdg_code
                } else {
                    particle.pdg_code
                })
            })
            .collect::<Result<Vec<_>, FeynGenError>>()?;

        let rules = model
            .vertex_rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| (3..=4).contains(&rule.n_legs()))
            .map(|(position, rule)| Rule {
                position,
                pdgs: rule.pdg_codes().into_iter().collect(),
                orders: rule.coupling_orders().into_iter().collect(),
            })
            .collect::<Vec<_>>();

        let bounds = process.orders.clone();
        let currents = self.build_currents(model, &incoming_pdgs, &bounds, &rules);

        let all_legs: LegMask = if n_legs == LegMask::BITS as usize {
            LegMask::MAX
        } else {
            (1 << n_legs) - 1
        };
        let full = all_legs ^ leg_bit(n_legs);
        let closing_pdg = model.anti_pdg(incoming_pdgs[n_legs - 1]);

        let mut diagrams = vec![];
        if let Some(roots) = currents.get(&full) {
            for (index, root) in roots.iter().enumerate() {
                if root.pdg != closing_pdg {
                    continue;
                }
                let mut orders = CouplingOrders::new();
                for order in model.orders.iter() {
                    orders.set(&order.name, root.orders.get(&order.name).unwrap_or(0));
                }
                orders.set(WEIGHTED, root.orders.weighted(model));
                for partial in self.expand(model, &currents, all_legs, full, full, index) {
                    diagrams.push(Diagram {
                        vertices: partial.vertices,
                        propagators: partial.propagators,
                        orders: orders.clone(),
                    });
                }
            }
        }

        if process.orders.is_empty() {
            if let Some(min_weighted) = diagrams.iter().map(|d| d.order(WEIGHTED)).min() {
                diagrams.retain(|d| d.order(WEIGHTED) == min_weighted);
            }
        }

        Ok(Amplitude {
            process: process.clone(),
            diagrams,
        })
    }
}
