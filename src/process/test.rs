use indexmap::IndexMap;

use crate::tests::{default_multiparticles, load_generic_model, orders, parse_definition, parse_process};

use super::{CouplingOrders, LegState, NloMode, ProcessDefinition, ProcessError, WEIGHTED};

#[test]
fn parse_simple_definition() {
    let model = load_generic_model("sm");
    let definition = parse_definition("u u~ > e+ e- [QCD]", &model);

    assert_eq!(definition.initial_pdgs, vec![vec![2], vec![-2]]);
    assert_eq!(definition.final_pdgs, vec![vec![-11], vec![11]]);
    assert_eq!(definition.nlo_mode, NloMode::All);
    assert_eq!(definition.perturbation_couplings, vec!["QCD"]);
    assert!(definition.orders.is_empty());
}

#[test]
fn parse_orders_and_mode() {
    let model = load_generic_model("sm");
    let definition = parse_definition("u u~ > e+ e- QED<=2 QCD=0 [real=QCD]", &model);

    assert_eq!(definition.nlo_mode, NloMode::Real);
    assert_eq!(definition.orders.get("QED"), Some(2));
    assert_eq!(definition.orders.get("QCD"), Some(0));

    let definition = parse_definition("u u~ > e+ e-", &model);
    assert_eq!(definition.nlo_mode, NloMode::Tree);
    assert!(definition.perturbation_couplings.is_empty());
}

#[test]
fn parse_errors() {
    let model = load_generic_model("sm");
    let multiparticles = default_multiparticles();
    let parse = |input: &str| ProcessDefinition::parse(input, model.clone(), &multiparticles);

    assert!(matches!(
        parse("u u~ > zp"),
        Err(ProcessError::UnknownParticle(name, _)) if name == "zp"
    ));
    assert!(matches!(
        parse("u u~ > e+ e- [QCD"),
        Err(ProcessError::InvalidDefinition(..))
    ));
    assert!(matches!(
        parse("u u~ e+ e-"),
        Err(ProcessError::InvalidDefinition(..))
    ));
    assert!(matches!(
        parse("u u~ > Z > e+ e-"),
        Err(ProcessError::InvalidDefinition(..))
    ));
    assert!(matches!(
        parse("u u~ > e+ e- [QCDX]"),
        Err(ProcessError::UnknownCouplingOrder(..))
    ));
    assert!(matches!(
        parse("u u~ > e+ e- EW<=2"),
        Err(ProcessError::UnknownCouplingOrder(..))
    ));
    assert!(matches!(
        parse("u u~ > e+ e- [loop=QCD]"),
        Err(ProcessError::InvalidNloMode(mode)) if mode == "loop"
    ));
    assert!(matches!(
        parse("u u~ > e+ QED<=2 e-"),
        Err(ProcessError::InvalidDefinition(..))
    ));
}

#[test]
fn expand_multiparticles() {
    let model = load_generic_model("sm");
    let mut multiparticles = IndexMap::new();
    multiparticles.insert("q".to_string(), vec!["u".to_string(), "d".to_string()]);
    let definition = ProcessDefinition::parse("q q > q q", model, &multiparticles).unwrap();

    let processes = definition.expand().unwrap();
    // Four initial states, each with the final states {uu, ud, dd}.
    assert_eq!(processes.len(), 12);
    assert_eq!(processes[0].pdg_codes(), vec![2, 2, 2, 2]);
    assert_eq!(processes[1].pdg_codes(), vec![2, 2, 2, 1]);
    assert_eq!(processes[2].pdg_codes(), vec![2, 2, 1, 1]);
    assert!(processes.iter().all(|process| process.nincoming() == 2));
}

#[test]
fn process_legs() {
    let model = load_generic_model("sm");
    let process = parse_process("u u~ > e+ e- [QCD]", &model);

    assert_eq!(process.pdg_codes(), vec![2, -2, -11, 11]);
    assert_eq!(process.initial_pdgs(), vec![2, -2]);
    assert_eq!(process.final_pdgs(), vec![-11, 11]);
    assert_eq!(
        process.legs.iter().map(|leg| leg.number).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(process.legs[0].state, LegState::Initial);
    assert!(process.legs[3].is_final());
    assert!(process.legs.iter().all(|leg| leg.massless));
}

#[test]
fn process_strings() {
    let model = load_generic_model("sm");
    let process = parse_process("u u~ > e+ e- QED<=2 [QCD]", &model);
    insta::assert_snapshot!(process.nice_string(), @"Process: u u~ > e+ e- QED<=2 [ QCD ]");

    let process = parse_process("g g > g g", &model);
    insta::assert_snapshot!(process.input_string(), @"g g > g g");
}

#[test]
fn signature_distinguishes_orders() {
    let model = load_generic_model("sm");
    let a = parse_process("u u~ > e+ e-", &model);
    let mut b = a.clone();
    assert_eq!(a.signature(), b.signature());
    b.orders.set("QED", 2);
    assert_ne!(a.signature(), b.signature());
}

#[test]
fn coupling_order_bounds() {
    let model = load_generic_model("sm");
    let bounds = orders(&[("QCD", 1), ("QED", 2)]);

    assert!(bounds.allows(&orders(&[("QED", 2)])));
    assert!(!bounds.allows(&orders(&[("QCD", 2), ("QED", 2)])));
    assert_eq!(orders(&[("QCD", 1), ("QED", 2)]).weighted(&model), 5);

    let mut with_weighted = bounds.clone();
    with_weighted.set(WEIGHTED, 5);
    assert_eq!(with_weighted.weighted(&model), 5);
    assert_eq!(with_weighted.without_weighted(), bounds);

    let mut merged = orders(&[("QCD", 2)]);
    merged.max_merge(&bounds);
    assert_eq!(merged, orders(&[("QCD", 2), ("QED", 2)]));

    let mut incremented = CouplingOrders::new();
    incremented.increment("QCD", 2);
    incremented.increment("QCD", 1);
    assert_eq!(incremented.get("QCD"), Some(3));
    assert_eq!(bounds.to_string(), "QCD<=1 QED<=2");
}

#[test]
fn nlo_mode_names() {
    for mode in ["tree", "all", "real", "virt", "LOonly", "noborn"] {
        assert_eq!(mode.parse::<NloMode>().unwrap().to_string(), mode);
    }
    assert!("Real".parse::<NloMode>().is_err());
}
