use crate::tests::load_generic_model;

use super::Model;

#[test]
fn particle_properties() {
    let model = load_generic_model("sm");

    let gluon = model.get_particle("g");
    assert_eq!(gluon.pdg_code, 21);
    assert_eq!(gluon.spin, 3);
    assert_eq!(gluon.color, 8);
    assert!(gluon.is_massless());
    assert!(gluon.is_self_antiparticle());

    let top = model.get_particle("t");
    assert!(!top.is_massless());
    assert_eq!(top.get_anti_particle(&model).pdg_code, -6);

    let ubar = model.get_particle_from_pdg(-2);
    assert_eq!(ubar.name, "u~");
    assert_eq!(ubar.color, -3);
    assert!(ubar.is_colored());
    assert!(!model.get_particle("e+").is_colored());
}

#[test]
fn anti_pdg() {
    let model = load_generic_model("sm");
    assert_eq!(model.anti_pdg(1), -1);
    assert_eq!(model.anti_pdg(-11), 11);
    assert_eq!(model.anti_pdg(21), 21);
    assert_eq!(model.anti_pdg(24), -24);
    assert!(model.find_particle_from_pdg(9000).is_none());
    assert!(model.find_particle("zp").is_none());
}

#[test]
fn vertex_rule_orders() {
    let model = load_generic_model("sm");

    let ggg = model.get_vertex_rule("V_1");
    assert_eq!(ggg.pdg_codes(), vec![21, 21, 21]);
    assert_eq!(ggg.coupling_orders().get("QCD"), Some(&1));

    let gggg = model.get_vertex_rule("V_2");
    assert_eq!(gggg.n_legs(), 4);
    assert_eq!(gggg.coupling_orders().get("QCD"), Some(&2));

    let eea = model.get_vertex_rule("V_15");
    assert_eq!(eea.pdg_codes(), vec![-11, 11, 22]);
    assert_eq!(eea.coupling_orders().get("QED"), Some(&1));
    assert_eq!(eea.coupling_orders().get("QCD"), None);
}

#[test]
fn order_hierarchy() {
    let model = load_generic_model("sm");
    assert_eq!(model.order_hierarchy("QCD"), 1);
    assert_eq!(model.order_hierarchy("QED"), 2);
    assert!(!model.has_order("WEIGHTED"));
}

#[test]
fn yaml_round_trip_keeps_content() {
    let model = load_generic_model("sm");
    let reloaded = Model::from_yaml_str(&model.to_yaml().unwrap()).unwrap();
    assert_eq!(reloaded.particles.len(), model.particles.len());
    assert_eq!(reloaded.vertex_rules.len(), model.vertex_rules.len());
    assert_eq!(reloaded.get_particle("b").mass.name, "MB");
}

#[test]
fn invalid_yaml_is_reported() {
    assert!(Model::from_yaml_str("name: [").is_err());
    assert!(Model::from_file("./models/does_not_exist.yaml").is_err());
}
