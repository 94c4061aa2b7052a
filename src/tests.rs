#![allow(unused)]
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::feyngen::{AmplitudeCache, TreeGenerator};
use crate::model::Model;
use crate::process::{CouplingOrders, LegState, Process, ProcessDefinition};
use crate::GenerationSettings;

pub(crate) fn load_generic_model(name: &str) -> Arc<Model> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("models")
        .join(format!("{}.yaml", name));
    Arc::new(Model::from_file(path).unwrap())
}

pub(crate) fn default_multiparticles() -> IndexMap<String, Vec<String>> {
    GenerationSettings::default().multiparticles
}

pub(crate) fn parse_definition(input: &str, model: &Arc<Model>) -> ProcessDefinition {
    ProcessDefinition::parse(input, model.clone(), &default_multiparticles()).unwrap()
}

/// Single process of a definition without multiparticle labels.
pub(crate) fn parse_process(input: &str, model: &Arc<Model>) -> Process {
    let mut processes = parse_definition(input, model).expand().unwrap();
    assert_eq!(processes.len(), 1, "'{}' expands to several processes", input);
    processes.remove(0)
}

pub(crate) fn orders(entries: &[(&str, usize)]) -> CouplingOrders {
    entries
        .iter()
        .map(|(name, value)| ((*name).into(), *value))
        .collect()
}

#[test]
fn sm_model_loads() {
    let model = load_generic_model("sm");
    assert_eq!(model.name, "sm");
    assert!(!model.is_empty());
    assert!(model.has_order("QCD"));
    assert!(model.has_order("QED"));
}

#[test]
fn default_settings_remove_reals() {
    let settings = GenerationSettings::default();
    assert!(settings.remove_reals);
    assert_eq!(settings.log_level, "info");
    assert_eq!(settings.multiparticles["p"].len(), 9);
}

#[test]
fn settings_from_yaml() {
    let settings = GenerationSettings::from_yaml_str(
        "remove_reals: false\nlog_format: short\nmultiparticles:\n  q: [u, d]\n",
    )
    .unwrap();
    assert!(!settings.remove_reals);
    assert_eq!(settings.log_format, crate::cli::LogFormat::Short);
    assert_eq!(settings.multiparticles.len(), 1);
    assert_eq!(settings.multiparticles["q"], vec!["u", "d"]);
}

#[test]
fn settings_reject_non_boolean_remove_reals() {
    let value: serde_yaml::Value = serde_yaml::from_str("remove_reals: 'yes'").unwrap();
    let err = GenerationSettings::from_yaml_value(&value).unwrap_err();
    assert!(matches!(err, crate::fks::FksError::Configuration(_)));

    let value: serde_yaml::Value = serde_yaml::from_str("remove_reals: 1").unwrap();
    assert!(GenerationSettings::from_yaml_value(&value).is_err());
}

#[test]
fn null_settings_are_default() {
    let settings = GenerationSettings::from_yaml_value(&serde_yaml::Value::Null).unwrap();
    assert_eq!(settings, GenerationSettings::default());
}
