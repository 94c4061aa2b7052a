use std::collections::BTreeSet;

use ahash::HashSet;
use itertools::Itertools;
use log::debug;
use smartstring::{LazyCompact, SmartString};

use crate::model::Model;
use crate::process::{CouplingOrders, Leg, LegState, Process};

use super::{leg_bit, AmplitudeGenerator, Diagram, FeynGenError, LegMask, Line, TreeGenerator};

/// A one-loop diagram, stored as the tree obtained by cutting one loop line.
#[derive(Debug, Clone)]
pub struct LoopDiagram {
    pub tree: Diagram,
    /// Particle on the cut line.
    pub cut_pdg: isize,
    /// Vertex rules around the loop, starting after the cut.
    pub loop_rules: Vec<SmartString<LazyCompact>>,
    /// Particle travelling from each loop vertex to the next one.
    pub loop_pdgs: Vec<isize>,
    /// Lines attached to each loop vertex, outside of the loop.
    pub attachments: Vec<Vec<Line>>,
    pub orders: CouplingOrders,
}

impl LoopDiagram {
    pub fn n_loop_lines(&self) -> usize {
        self.loop_pdgs.len()
    }
}

#[derive(Debug, Clone)]
pub struct LoopAmplitude {
    pub process: Process,
    pub diagrams: Vec<LoopDiagram>,
}

impl LoopAmplitude {
    pub fn n_diagrams(&self) -> usize {
        self.diagrams.len()
    }

    pub fn has_diagrams(&self) -> bool {
        !self.diagrams.is_empty()
    }
}

pub trait LoopAmplitudeGenerator {
    /// One-loop diagrams of `process` under its perturbation couplings.
    fn generate_loop(&self, process: &Process) -> Result<LoopAmplitude, FeynGenError>;
}

/// Builds one-loop diagrams from trees with one extra particle/antiparticle pair.
#[derive(Debug, Clone, Default)]
pub struct LCutLoopGenerator {
    pub tree_generator: TreeGenerator,
}

type LoopKeyVertex = (SmartString<LazyCompact>, Vec<Line>, isize);
type LoopKey = (Vec<LoopKeyVertex>, Vec<Line>);

/// Particles appearing in a vertex with a non-vanishing power of one of `orders`.
pub fn loop_particles(model: &Model, orders: &[SmartString<LazyCompact>]) -> Vec<isize> {
    let mut particles = BTreeSet::new();
    for rule in model.vertex_rules.iter() {
        let rule_orders = rule.coupling_orders();
        if orders
            .iter()
            .any(|order| rule_orders.get(order).copied().unwrap_or(0) > 0)
        {
            particles.extend(rule.pdg_codes());
        }
    }
    particles.into_iter().collect()
}

fn canonical_cycle(model: &Model, cycle: &[LoopKeyVertex]) -> Vec<LoopKeyVertex> {
    let k = cycle.len();
    let reflected = (0..k)
        .map(|i| {
            let (rule, attachments, _) = cycle[k - 1 - i].clone();
            let edge = cycle[(2 * k - 2 - i) % k].2;
            (rule, attachments, model.anti_pdg(edge))
        })
        .collect::<Vec<_>>();
    [cycle.to_vec(), reflected]
        .into_iter()
        .flat_map(|sequence| {
            (0..k).map(move |shift| {
                sequence[shift..]
                    .iter()
                    .chain(sequence[..shift].iter())
                    .cloned()
                    .collect::<Vec<_>>()
            })
        })
        .min()
        .unwrap_or_default()
}

impl LCutLoopGenerator {
    pub fn new(tree_generator: TreeGenerator) -> Self {
        LCutLoopGenerator { tree_generator }
    }

    /// Reads the loop off a cut tree. Returns `None` for loops that are
    /// dropped: single-vertex loops, tadpoles and external self-energies.
    fn inspect_tree(
        &self,
        model: &Model,
        tree: &Diagram,
        cut_pdg: isize,
        n_external: usize,
    ) -> Option<(LoopKey, LoopDiagram)> {
        let l_bit = leg_bit(n_external + 1);
        let root_bit = leg_bit(n_external + 2);
        let external: LegMask = (1 << n_external) - 1;

        let mut loop_vertices = tree
            .vertices
            .iter()
            .filter_map(|vertex| {
                let loop_line = vertex
                    .lines
                    .iter()
                    .find(|line| line.mask & l_bit != 0 && line.mask & root_bit == 0)?;
                Some((*loop_line, vertex))
            })
            .collect::<Vec<_>>();
        loop_vertices.sort_by_key(|(line, _)| line.mask.count_ones());

        let k = loop_vertices.len();
        if k < 2 {
            return None;
        }

        let attachments = loop_vertices
            .iter()
            .map(|(_, vertex)| {
                vertex
                    .lines
                    .iter()
                    .filter(|line| line.mask & (l_bit | root_bit) == 0)
                    .copied()
                    .sorted()
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let attached = attachments.iter().flatten().collect::<Vec<_>>();
        match attached.len() {
            0 | 1 => return None,
            2 => {
                if attached
                    .iter()
                    .any(|line| line.mask.count_ones() == 1 || line.mask.count_ones() + 1 == n_external as u32)
                {
                    return None;
                }
            }
            _ => {}
        }

        let loop_pdgs = (0..k)
            .map(|i| loop_vertices[(i + 1) % k].0.pdg)
            .collect::<Vec<_>>();
        let loop_rules = loop_vertices
            .iter()
            .map(|(_, vertex)| vertex.rule.clone())
            .collect::<Vec<_>>();

        let cycle = (0..k)
            .map(|i| (loop_rules[i].clone(), attachments[i].clone(), loop_pdgs[i]))
            .collect::<Vec<_>>();
        let off_loop = tree
            .propagators
            .iter()
            .filter(|line| line.mask & !external == 0)
            .copied()
            .sorted()
            .collect::<Vec<_>>();
        let key = (canonical_cycle(model, &cycle), off_loop);

        Some((
            key,
            LoopDiagram {
                tree: tree.clone(),
                cut_pdg,
                loop_rules,
                loop_pdgs,
                attachments,
                orders: tree.orders.clone(),
            },
        ))
    }
}

impl LoopAmplitudeGenerator for LCutLoopGenerator {
    fn generate_loop(&self, process: &Process) -> Result<LoopAmplitude, FeynGenError> {
        let model = process.model.as_ref();
        let n_external = process.legs.len();

        let mut orders = process.orders.without_weighted();
        for order in process.perturbation_couplings.iter() {
            orders.increment(order, 2);
        }

        let mut seen: HashSet<LoopKey> = HashSet::default();
        let mut diagrams = vec![];
        for cut_pdg in loop_particles(model, &process.perturbation_couplings) {
            let anti_pdg = model.anti_pdg(cut_pdg);
            let mut legs = process.legs.clone();
            legs.push(Leg::new(cut_pdg, n_external + 1, LegState::Final, model)?);
            legs.push(Leg::new(anti_pdg, n_external + 2, LegState::Final, model)?);
            let cut_process = Process::new(
                legs,
                orders.clone(),
                process.perturbation_couplings.clone(),
                process.model.clone(),
            );
            let trees = self.tree_generator.generate(&cut_process)?;
            for tree in trees.diagrams.iter() {
                if let Some((key, diagram)) = self.inspect_tree(model, tree, cut_pdg, n_external) {
                    if seen.insert(key) {
                        diagrams.push(diagram);
                    }
                }
            }
        }
        debug!(
            "Found {} one-loop diagrams for {}",
            diagrams.len(),
            process.input_string()
        );

        Ok(LoopAmplitude {
            process: process.clone(),
            diagrams,
        })
    }
}
