use ahash::RandomState;
use color_eyre::{Help, Report};
use eyre::{eyre, Context};
use serde::{Deserialize, Serialize};
use serde_yaml::Error;
use smartstring::{LazyCompact, SmartString};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::{collections::BTreeMap, collections::HashMap};

#[cfg(test)]
mod test;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum ParameterNature {
    #[default]
    #[serde(rename = "external")]
    External,
    #[serde(rename = "internal")]
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableParameter {
    name: SmartString<LazyCompact>,
    #[serde(default)]
    lhablock: Option<SmartString<LazyCompact>>,
    #[serde(default)]
    lhacode: Option<Vec<usize>>,
    #[serde(default)]
    nature: ParameterNature,
    #[serde(default)]
    value: Option<f64>,
}

impl SerializableParameter {
    pub fn from_parameter(param: &Parameter) -> SerializableParameter {
        SerializableParameter {
            name: param.name.clone(),
            lhablock: param.lhablock.clone(),
            lhacode: param.lhacode.clone(),
            nature: param.nature.clone(),
            value: param.value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: SmartString<LazyCompact>,
    pub lhablock: Option<SmartString<LazyCompact>>,
    pub lhacode: Option<Vec<usize>>,
    pub nature: ParameterNature,
    pub value: Option<f64>,
}

impl Parameter {
    pub fn from_serializable_parameter(param: &SerializableParameter) -> Parameter {
        Parameter {
            name: param.name.clone(),
            lhablock: param.lhablock.clone(),
            lhacode: param.lhacode.clone(),
            nature: param.nature.clone(),
            value: param.value,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.name.eq_ignore_ascii_case("ZERO")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableParticle {
    pdg_code: isize,
    name: SmartString<LazyCompact>,
    antiname: SmartString<LazyCompact>,
    spin: isize,
    color: isize,
    mass: SmartString<LazyCompact>,
    width: SmartString<LazyCompact>,
    #[serde(default)]
    charge: f64,
    #[serde(default)]
    ghost_number: isize,
    #[serde(default)]
    lepton_number: isize,
}

impl SerializableParticle {
    pub fn from_particle(particle: &Particle) -> SerializableParticle {
        SerializableParticle {
            pdg_code: particle.pdg_code,
            name: particle.name.clone(),
            antiname: particle.antiname.clone(),
            spin: particle.spin,
            color: particle.color,
            mass: particle.mass.name.clone(),
            width: particle.width.name.clone(),
            charge: particle.charge,
            ghost_number: particle.ghost_number,
            lepton_number: particle.lepton_number,
        }
    }
}

/// A particle of the model. `spin` is stored as 2S+1 and `color` as the
/// dimension of the representation, negative for anti-triplets.
#[derive(Debug, Clone)]
pub struct Particle {
    pub pdg_code: isize,
    pub name: SmartString<LazyCompact>,
    pub antiname: SmartString<LazyCompact>,
    pub spin: isize,
    pub color: isize,
    pub mass: Arc<Parameter>,
    pub width: Arc<Parameter>,
    pub charge: f64,
    pub ghost_number: isize,
    pub lepton_number: isize,
}

impl PartialEq for Particle {
    fn eq(&self, other: &Self) -> bool {
        self.pdg_code == other.pdg_code
    }
}

impl Eq for Particle {}

impl Particle {
    pub fn from_serializable_particle(model: &Model, particle: &SerializableParticle) -> Particle {
        Particle {
            pdg_code: particle.pdg_code,
            name: particle.name.clone(),
            antiname: particle.antiname.clone(),
            spin: particle.spin,
            color: particle.color,
            mass: model.get_parameter(&particle.mass),
            width: model.get_parameter(&particle.width),
            charge: particle.charge,
            ghost_number: particle.ghost_number,
            lepton_number: particle.lepton_number,
        }
    }

    #[inline]
    pub fn is_massless(&self) -> bool {
        self.mass.is_zero()
    }

    #[inline]
    pub fn is_self_antiparticle(&self) -> bool {
        self.name == self.antiname
    }

    pub fn get_anti_particle(&self, model: &Model) -> Arc<Particle> {
        model.get_particle(&self.antiname)
    }

    pub fn is_colored(&self) -> bool {
        self.color != 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableCoupling {
    name: SmartString<LazyCompact>,
    #[serde(default)]
    expression: SmartString<LazyCompact>,
    orders: HashMap<SmartString<LazyCompact>, usize, RandomState>,
}

impl SerializableCoupling {
    pub fn from_coupling(coupling: &Coupling) -> SerializableCoupling {
        SerializableCoupling {
            name: coupling.name.clone(),
            expression: coupling.expression.clone(),
            orders: coupling.orders.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Coupling {
    pub name: SmartString<LazyCompact>,
    pub expression: SmartString<LazyCompact>,
    pub orders: HashMap<SmartString<LazyCompact>, usize, RandomState>,
}

impl Coupling {
    pub fn from_serializable_coupling(coupling: &SerializableCoupling) -> Coupling {
        Coupling {
            name: coupling.name.clone(),
            expression: coupling.expression.clone(),
            orders: coupling.orders.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableVertexRule {
    pub name: SmartString<LazyCompact>,
    pub particles: Vec<SmartString<LazyCompact>>,
    pub couplings: Vec<SmartString<LazyCompact>>,
}

impl SerializableVertexRule {
    pub fn from_vertex_rule(vertex_rule: &VertexRule) -> SerializableVertexRule {
        SerializableVertexRule {
            name: vertex_rule.name.clone(),
            particles: vertex_rule
                .particles
                .iter()
                .map(|particle| particle.name.clone())
                .collect(),
            couplings: vertex_rule
                .couplings
                .iter()
                .map(|coupling| coupling.name.clone())
                .collect(),
        }
    }
}

/// Interaction vertex. Particles are listed in the all-incoming convention.
#[derive(Debug, Clone)]
pub struct VertexRule {
    pub name: SmartString<LazyCompact>,
    pub particles: Vec<Arc<Particle>>,
    pub couplings: Vec<Arc<Coupling>>,
}

impl VertexRule {
    pub fn from_serializable_vertex_rule(
        model: &Model,
        vertex_rule: &SerializableVertexRule,
    ) -> VertexRule {
        VertexRule {
            name: vertex_rule.name.clone(),
            particles: vertex_rule
                .particles
                .iter()
                .map(|particle_name| model.get_particle(particle_name))
                .collect(),
            couplings: vertex_rule
                .couplings
                .iter()
                .map(|coupling_name| model.get_coupling(coupling_name))
                .collect(),
        }
    }

    /// Coupling-order content of the vertex, the maximum over its couplings.
    pub fn coupling_orders(&self) -> BTreeMap<SmartString<LazyCompact>, usize> {
        let mut orders = BTreeMap::new();
        for coupling in self.couplings.iter() {
            for (name, value) in coupling.orders.iter() {
                let entry = orders.entry(name.clone()).or_insert(0);
                *entry = (*entry).max(*value);
            }
        }
        orders
    }

    pub fn pdg_codes(&self) -> Vec<isize> {
        self.particles.iter().map(|p| p.pdg_code).collect()
    }

    pub fn n_legs(&self) -> usize {
        self.particles.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub name: SmartString<LazyCompact>,
    pub expansion_order: isize,
    pub hierarchy: isize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel {
    pub name: SmartString<LazyCompact>,
    #[serde(default)]
    pub restriction: Option<SmartString<LazyCompact>>,
    orders: Vec<Order>,
    parameters: Vec<SerializableParameter>,
    particles: Vec<SerializableParticle>,
    couplings: Vec<SerializableCoupling>,
    vertex_rules: Vec<SerializableVertexRule>,
}

impl SerializableModel {
    pub fn from_file(file_path: impl AsRef<Path>) -> Result<SerializableModel, Report> {
        let file_path = file_path.as_ref();
        let f = File::open(file_path)
            .wrap_err_with(|| format!("Could not open model yaml file {}", file_path.display()))
            .suggestion("Does the path exist?")?;
        serde_yaml::from_reader(f)
            .map_err(|e| eyre!(format!("Error parsing model yaml: {}", e)))
            .suggestion("Is it a correct yaml file")
    }

    pub fn from_yaml_str(yaml_str: &str) -> Result<SerializableModel, Report> {
        serde_yaml::from_str(yaml_str)
            .map_err(|e| eyre!(format!("Error parsing model yaml: {}", e)))
            .suggestion("Is it a correct yaml file")
    }

    pub fn from_model(model: &Model) -> SerializableModel {
        SerializableModel {
            name: model.name.clone(),
            restriction: model.restriction.clone(),
            orders: model
                .orders
                .iter()
                .map(|order| order.as_ref().clone())
                .collect(),
            parameters: model
                .parameters
                .iter()
                .map(|parameter| SerializableParameter::from_parameter(parameter.as_ref()))
                .collect(),
            particles: model
                .particles
                .iter()
                .map(|particle| SerializableParticle::from_particle(particle.as_ref()))
                .collect(),
            couplings: model
                .couplings
                .iter()
                .map(|coupling| SerializableCoupling::from_coupling(coupling.as_ref()))
                .collect(),
            vertex_rules: model
                .vertex_rules
                .iter()
                .map(|vertex_rule| SerializableVertexRule::from_vertex_rule(vertex_rule.as_ref()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub name: SmartString<LazyCompact>,
    pub restriction: Option<SmartString<LazyCompact>>,
    pub orders: Vec<Arc<Order>>,
    pub parameters: Vec<Arc<Parameter>>,
    pub particles: Vec<Arc<Particle>>,
    pub couplings: Vec<Arc<Coupling>>,
    pub vertex_rules: Vec<Arc<VertexRule>>,
    pub order_name_to_position: HashMap<SmartString<LazyCompact>, usize, RandomState>,
    pub parameter_name_to_position: HashMap<SmartString<LazyCompact>, usize, RandomState>,
    pub particle_name_to_position: HashMap<SmartString<LazyCompact>, usize, RandomState>,
    pub particle_pdg_to_position: HashMap<isize, usize, RandomState>,
    pub coupling_name_to_position: HashMap<SmartString<LazyCompact>, usize, RandomState>,
    pub vertex_rule_name_to_position: HashMap<SmartString<LazyCompact>, usize, RandomState>,
}

impl Default for Model {
    fn default() -> Self {
        Model {
            name: SmartString::<LazyCompact>::from("ModelNotLoaded"),
            restriction: None,
            orders: vec![],
            parameters: vec![],
            particles: vec![],
            couplings: vec![],
            vertex_rules: vec![],
            order_name_to_position: HashMap::default(),
            parameter_name_to_position: HashMap::default(),
            particle_name_to_position: HashMap::default(),
            particle_pdg_to_position: HashMap::default(),
            coupling_name_to_position: HashMap::default(),
            vertex_rule_name_to_position: HashMap::default(),
        }
    }
}

impl Model {
    pub fn is_empty(&self) -> bool {
        self.name == "ModelNotLoaded" || self.particles.is_empty()
    }

    pub fn from_serializable_model(serializable_model: SerializableModel) -> Model {
        let mut model: Model = Model::default();
        model.name = serializable_model.name;
        model.restriction = serializable_model.restriction;

        // Extract coupling orders
        model.orders = serializable_model
            .orders
            .iter()
            .enumerate()
            .map(|(i_order, serializable_order)| {
                let order = Arc::new(serializable_order.clone());
                model
                    .order_name_to_position
                    .insert(order.name.clone(), i_order);
                order
            })
            .collect();

        // Extract parameters
        model.parameters = serializable_model
            .parameters
            .iter()
            .enumerate()
            .map(|(i_param, serializable_param)| {
                let parameter =
                    Arc::new(Parameter::from_serializable_parameter(serializable_param));
                model
                    .parameter_name_to_position
                    .insert(parameter.name.clone(), i_param);
                parameter
            })
            .collect();

        // Extract particles
        model.particles = serializable_model
            .particles
            .iter()
            .enumerate()
            .map(|(i_part, serializable_particle)| {
                let particle = Arc::new(Particle::from_serializable_particle(
                    &model,
                    serializable_particle,
                ));
                model
                    .particle_name_to_position
                    .insert(particle.name.clone(), i_part);
                model
                    .particle_pdg_to_position
                    .insert(particle.pdg_code, i_part);
                particle
            })
            .collect();

        // Extract couplings
        model.couplings = serializable_model
            .couplings
            .iter()
            .enumerate()
            .map(|(i_coupl, serializable_coupling)| {
                let coupling =
                    Arc::new(Coupling::from_serializable_coupling(serializable_coupling));
                model
                    .coupling_name_to_position
                    .insert(coupling.name.clone(), i_coupl);
                coupling
            })
            .collect();

        // Extract vertex rules
        model.vertex_rules = serializable_model
            .vertex_rules
            .iter()
            .enumerate()
            .map(|(i_vr, serializable_vertex_rule)| {
                let vertex_rule = Arc::new(VertexRule::from_serializable_vertex_rule(
                    &model,
                    serializable_vertex_rule,
                ));
                model
                    .vertex_rule_name_to_position
                    .insert(vertex_rule.name.clone(), i_vr);
                vertex_rule
            })
            .collect();

        model
    }

    pub fn to_serializable(&self) -> SerializableModel {
        SerializableModel::from_model(self)
    }

    pub fn to_yaml(&self) -> Result<String, Error> {
        serde_yaml::to_string(&self.to_serializable())
    }

    pub fn from_file(file_path: impl AsRef<Path>) -> Result<Model, Report> {
        SerializableModel::from_file(file_path).map(Model::from_serializable_model)
    }

    pub fn from_yaml_str(yaml_str: &str) -> Result<Model, Report> {
        SerializableModel::from_yaml_str(yaml_str).map(Model::from_serializable_model)
    }

    #[inline]
    pub fn get_particle(&self, name: &str) -> Arc<Particle> {
        if let Some(position) = self.particle_name_to_position.get(name) {
            self.particles[*position].clone()
        } else {
            panic!("Particle '{}' not found in model '{}'.", name, self.name);
        }
    }

    #[inline]
    pub fn find_particle(&self, name: &str) -> Option<Arc<Particle>> {
        self.particle_name_to_position
            .get(name)
            .map(|position| self.particles[*position].clone())
    }

    #[inline]
    pub fn get_particle_from_pdg(&self, pdg: isize) -> Arc<Particle> {
        if let Some(position) = self.particle_pdg_to_position.get(&pdg) {
            self.particles[*position].clone()
        } else {
            panic!(
                "Particle with PDG {} not found in model '{}'.",
                pdg, self.name
            );
        }
    }

    #[inline]
    pub fn find_particle_from_pdg(&self, pdg: isize) -> Option<Arc<Particle>> {
        self.particle_pdg_to_position
            .get(&pdg)
            .map(|position| self.particles[*position].clone())
    }

    /// PDG code of the antiparticle of `pdg`.
    #[inline]
    pub fn anti_pdg(&self, pdg: isize) -> isize {
        self.get_particle_from_pdg(pdg)
            .get_anti_particle(self)
            .pdg_code
    }

    #[inline]
    pub fn get_parameter(&self, name: &str) -> Arc<Parameter> {
        if let Some(position) = self.parameter_name_to_position.get(name) {
            self.parameters[*position].clone()
        } else {
            panic!("Parameter '{}' not found in model '{}'.", name, self.name);
        }
    }

    #[inline]
    pub fn get_order(&self, name: &str) -> Arc<Order> {
        if let Some(position) = self.order_name_to_position.get(name) {
            self.orders[*position].clone()
        } else {
            panic!(
                "Coupling order '{}' not found in model '{}'.",
                name, self.name
            );
        }
    }

    pub fn has_order(&self, name: &str) -> bool {
        self.order_name_to_position.contains_key(name)
    }

    /// Weight of one power of the coupling `name` in the WEIGHTED order.
    pub fn order_hierarchy(&self, name: &str) -> usize {
        self.order_name_to_position
            .get(name)
            .map_or(1, |position| self.orders[*position].hierarchy.max(0) as usize)
    }

    #[inline]
    pub fn get_coupling(&self, name: &str) -> Arc<Coupling> {
        if let Some(position) = self.coupling_name_to_position.get(name) {
            self.couplings[*position].clone()
        } else {
            panic!("Coupling '{}' not found in model '{}'.", name, self.name);
        }
    }

    #[inline]
    pub fn get_vertex_rule(&self, name: &str) -> Arc<VertexRule> {
        if let Some(position) = self.vertex_rule_name_to_position.get(name) {
            self.vertex_rules[*position].clone()
        } else {
            panic!("Vertex rule '{}' not found in model '{}'.", name, self.name);
        }
    }
}
