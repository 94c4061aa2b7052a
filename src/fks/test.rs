use std::collections::BTreeSet;
use std::sync::Arc;

use crate::feyngen::{
    Amplitude, AmplitudeCache, AmplitudeGenerator, FeynGenError, LCutLoopGenerator, TreeGenerator,
};
use crate::model::Model;
use crate::process::{FksTag, Leg, LegState, Process, WEIGHTED};
use crate::tests::{load_generic_model, parse_definition, parse_process};

use super::born::{double_counted_reals, select_nbody_only};
use super::common::{
    combine_ij, find_color_links, find_pert_particles_interactions, find_splittings,
    legs_to_color_link_string, sort_legs, PertInteractionsCache,
};
use super::{
    DiagramCounts, FksBornProcess, FksError, FksMultiProcessFromBorn, FksProcessFromBorn,
    FksRealProcess, StartProcess,
};

/// Returns amplitudes without diagrams, for tests that only look at the
/// bookkeeping of real emissions.
struct NoDiagrams;

impl AmplitudeGenerator for NoDiagrams {
    fn generate(&self, process: &Process) -> Result<Amplitude, FeynGenError> {
        Ok(Amplitude {
            process: process.clone(),
            diagrams: vec![],
        })
    }
}

fn leg(model: &Model, id: isize, number: usize, state: LegState) -> Leg {
    Leg::new(id, number, state, model).unwrap()
}

fn drell_yan() -> FksProcessFromBorn {
    let model = load_generic_model("sm");
    let process = parse_process("u u~ > e+ e- [QCD]", &model);
    let generator = TreeGenerator::default();
    let mut cache = AmplitudeCache::new();
    let mut born =
        FksProcessFromBorn::new(StartProcess::Process(process), true, &generator, &mut cache)
            .unwrap();
    born.generate_reals(&generator, &mut cache).unwrap();
    born
}

#[test]
fn qcd_pert_interactions() {
    let model = load_generic_model("sm");
    let pert = find_pert_particles_interactions(&model, "QCD");

    assert_eq!(pert.interactions.len(), 7);
    assert!(pert.interactions.contains(&vec![21, 21, 21]));
    assert!(pert.interactions.contains(&vec![-2, 2, 21]));
    assert_eq!(pert.soft_particles, vec![21]);
    assert!(pert.is_pert(-6));
    assert!(!pert.is_pert(11));
    assert!(!pert.is_soft(2));
}

#[test]
fn qed_pert_interactions() {
    let model = load_generic_model("sm");
    let pert = find_pert_particles_interactions(&model, "QED");

    // f f~ a for nine fermions and W+ W- a. Z couplings have no massless vector.
    assert_eq!(pert.interactions.len(), 10);
    assert_eq!(pert.soft_particles, vec![22]);
    assert!(pert.is_pert(24));
    assert!(pert.is_pert(-11));
    assert!(!pert.is_pert(23));
    assert!(!pert.is_pert(12));
}

#[test]
fn initial_quark_splittings() {
    let model = load_generic_model("sm");
    let mut cache = PertInteractionsCache::new();
    let u = leg(&model, 2, 1, LegState::Initial);
    let splittings = find_splittings(&u, &model, &mut cache, "QCD").unwrap();

    let ids = splittings
        .iter()
        .map(|split| {
            split
                .iter()
                .map(|leg| (leg.id, leg.state, leg.fks))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![
            vec![
                (2, LegState::Initial, FksTag::J),
                (21, LegState::Final, FksTag::I)
            ],
            vec![
                (21, LegState::Initial, FksTag::J),
                (-2, LegState::Final, FksTag::I)
            ],
        ]
    );

    let electron = leg(&model, 11, 4, LegState::Final);
    assert!(find_splittings(&electron, &model, &mut cache, "QCD")
        .unwrap()
        .is_empty());
}

#[test]
fn final_gluon_splittings() {
    let model = load_generic_model("sm");
    let mut cache = PertInteractionsCache::new();
    let g = leg(&model, 21, 3, LegState::Final);
    let splittings = find_splittings(&g, &model, &mut cache, "QCD").unwrap();

    // g g and one quark pair per flavour.
    assert_eq!(splittings.len(), 7);
    for split in splittings.iter() {
        assert_eq!(split[0].fks, FksTag::J);
        assert_eq!(split[1].fks, FksTag::I);
        assert!(split.iter().all(|leg| leg.is_final() && leg.number == 3));
    }
    let quark_pair = splittings
        .iter()
        .find(|split| split[0].id == 2)
        .unwrap();
    assert_eq!(quark_pair[1].id, -2);
}

#[test]
fn final_lepton_photon_splitting() {
    let model = load_generic_model("sm");
    let mut cache = PertInteractionsCache::new();
    let positron = leg(&model, -11, 3, LegState::Final);
    let splittings = find_splittings(&positron, &model, &mut cache, "QED").unwrap();

    assert_eq!(splittings.len(), 1);
    assert_eq!(
        splittings[0].iter().map(|leg| (leg.id, leg.fks)).collect::<Vec<_>>(),
        vec![(-11, FksTag::J), (22, FksTag::I)]
    );
}

#[test]
fn combine_pairs() {
    let model = load_generic_model("sm");
    let mut cache = PertInteractionsCache::new();
    let g5 = leg(&model, 21, 5, LegState::Final);
    let g4 = leg(&model, 21, 4, LegState::Final);
    let u1 = leg(&model, 2, 1, LegState::Initial);
    let u4 = leg(&model, 2, 4, LegState::Final);
    let ubar3 = leg(&model, -2, 3, LegState::Final);
    let electron = leg(&model, 11, 2, LegState::Final);

    let merged = combine_ij(&g5, &u1, &model, &mut cache, "QCD").unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!((merged[0].id, merged[0].number), (2, 1));
    assert_eq!(merged[0].state, LegState::Initial);

    let merged = combine_ij(&g5, &g4, &model, &mut cache, "QCD").unwrap();
    assert_eq!(merged.iter().map(|leg| leg.id).collect::<Vec<_>>(), vec![21]);
    assert_eq!(merged[0].number, 4);

    let merged = combine_ij(&g5, &u4, &model, &mut cache, "QCD").unwrap();
    assert_eq!(merged.iter().map(|leg| leg.id).collect::<Vec<_>>(), vec![2]);

    let merged = combine_ij(&ubar3, &u4, &model, &mut cache, "QCD").unwrap();
    assert_eq!(merged.iter().map(|leg| leg.id).collect::<Vec<_>>(), vec![21]);
    assert_eq!(merged[0].number, 3);

    // A final gluon is only ever j of a gluon, and a pair is merged once.
    assert!(combine_ij(&u4, &g5, &model, &mut cache, "QCD").unwrap().is_empty());
    assert!(combine_ij(&u4, &ubar3, &model, &mut cache, "QCD").unwrap().is_empty());
    assert!(combine_ij(&u1, &g5, &model, &mut cache, "QCD").unwrap().is_empty());
    assert!(combine_ij(&g5, &electron, &model, &mut cache, "QCD").unwrap().is_empty());
}

#[test]
fn legs_sorted_by_color_and_mass() {
    let model = load_generic_model("sm");
    let legs = vec![
        leg(&model, 2, 1, LegState::Initial),
        leg(&model, 21, 2, LegState::Initial),
        leg(&model, 21, 3, LegState::Final),
        leg(&model, 6, 4, LegState::Final),
        leg(&model, 2, 5, LegState::Final),
        leg(&model, 11, 6, LegState::Final),
        leg(&model, -2, 7, LegState::Final),
    ];
    let sorted = sort_legs(legs);
    assert_eq!(
        sorted.iter().map(|leg| leg.id).collect::<Vec<_>>(),
        vec![2, 21, 11, 6, -2, 2, 21]
    );
    assert_eq!(
        sorted.iter().map(|leg| leg.number).collect::<Vec<_>>(),
        (1..=7).collect::<Vec<_>>()
    );
}

#[test]
fn drell_yan_reals() {
    let born = drell_yan();

    assert_eq!(born.pdg_codes, vec![2, -2, -11, 11]);
    assert_eq!(born.nincoming, 2);
    assert_eq!(born.born_amplitude.n_diagrams(), 2);
    assert_eq!(born.born_process.orders.get("QED"), Some(2));
    assert_eq!(born.born_process.orders.get(WEIGHTED), Some(4));
    assert_eq!(born.splittings[0].len(), 2);
    assert_eq!(born.splittings[1].len(), 2);
    assert!(born.splittings[2].is_empty());
    assert!(born.splittings[3].is_empty());

    let summary = born
        .real_amps
        .iter()
        .map(|real| (real.pdgs.clone(), real.i_fks, real.j_fks, real.ij))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            (vec![2, -2, -11, 11, 21], 5, 1, 1),
            (vec![21, -2, -11, 11, -2], 5, 1, 1),
            (vec![2, -2, -11, 11, 21], 5, 2, 2),
            (vec![2, 21, -11, 11, 2], 5, 2, 2),
        ]
    );
    assert!(born.real_amps.iter().all(|real| real.is_to_integrate));
    assert!(born.real_amps.iter().all(|real| real.ijglu == 0));
    assert_eq!(
        born.real_amps
            .iter()
            .map(|real| real.need_color_links)
            .collect::<Vec<_>>(),
        vec![true, false, true, false]
    );
    assert_eq!(
        born.real_amps
            .iter()
            .map(|real| real.is_nbody_only)
            .collect::<Vec<_>>(),
        vec![false, false, true, false]
    );

    for real in born.real_amps.iter() {
        assert_eq!(real.process.orders.get("QCD"), Some(1));
        assert_eq!(real.process.orders.get("QED"), Some(2));
        assert_eq!(real.process.orders.get(WEIGHTED), Some(5));
        assert_eq!(real.amplitude.n_diagrams(), 4);
        assert_eq!(real.get_leg_i().fks, FksTag::I);
        assert_eq!(real.get_leg_j().fks, FksTag::J);
    }
    // Both quark legs radiate into the same real process.
    assert!(Arc::ptr_eq(
        &born.real_amps[0].amplitude,
        &born.real_amps[2].amplitude
    ));
    // One handle per real emission, shared ones included.
    assert_eq!(born.real_amplitudes().len(), 4);
}

#[test]
fn drell_yan_color_links() {
    let born = drell_yan();

    assert_eq!(born.color_links.len(), 2);
    assert_eq!(born.color_links[0].leg_numbers(), (1, 2));
    assert_eq!(born.color_links[1].leg_numbers(), (2, 1));

    let link = &born.color_links[0];
    insta::assert_snapshot!(link.string.to_string(), @"-1 T(-6000,-3001,1) T(-6000,2,-3002)");
    assert_eq!(link.replacements, vec![[1, -3001], [2, -3002]]);
}

#[test]
fn self_links_of_massive_legs() {
    let model = load_generic_model("sm");
    let top = leg(&model, 6, 3, LegState::Final);
    let link = legs_to_color_link_string(&top, &top);
    insta::assert_snapshot!(link.string.to_string(), @"1/2 T(-6000,-6000,3,-3001)");
    assert_eq!(link.replacements, vec![[3, -3001]]);

    let mut heavy_octet = leg(&model, 21, 4, LegState::Final);
    heavy_octet.massless = false;
    let link = legs_to_color_link_string(&heavy_octet, &heavy_octet);
    insta::assert_snapshot!(link.string.to_string(), @"-1/2 f(-3001,-6000,-6001) f(-6001,-6000,4)");
    assert!(!link.string.is_imaginary);

    let legs = vec![
        leg(&model, 21, 1, LegState::Initial),
        leg(&model, 21, 2, LegState::Initial),
        leg(&model, -6, 3, LegState::Final),
        leg(&model, 6, 4, LegState::Final),
    ];
    // Twelve ordered pairs and one self link per top quark.
    assert_eq!(find_color_links(&legs).len(), 14);
}

#[test]
fn gluon_links_are_real() {
    let model = load_generic_model("sm");
    let g3 = leg(&model, 21, 3, LegState::Final);
    let g4 = leg(&model, 21, 4, LegState::Final);
    let link = legs_to_color_link_string(&g3, &g4);
    insta::assert_snapshot!(link.string.to_string(), @"-1 f(-3001,-6000,3) f(-3002,-6000,4)");
}

#[test]
fn fks_partners_of_emitted_gluon() {
    let born = drell_yan();
    let generator = TreeGenerator::default();
    let mut cache = AmplitudeCache::new();
    let mut pert_cache = PertInteractionsCache::new();

    let real = &born.real_amps[0];
    let born_orders = real.born_orders();
    assert_eq!(born_orders.get("QCD"), Some(0));
    assert_eq!(born_orders.get(WEIGHTED), Some(4));

    let partners = real
        .find_fks_j_from_i(&generator, &mut cache, &mut pert_cache)
        .unwrap();
    assert_eq!(partners.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert!(partners[&1].is_empty());
    assert!(partners[&3].is_empty());
    assert_eq!(partners[&5], vec![1, 2]);
}

#[test]
fn born_of_a_real_emission() {
    let born = drell_yan();
    let generator = TreeGenerator::default();
    let mut cache = AmplitudeCache::new();
    let mut pert_cache = PertInteractionsCache::new();

    let real = &born.real_amps[1];
    let model = real.process.model.clone();
    let leg_i = real.get_leg_i();
    let leg_j = real.get_leg_j();
    let ij = combine_ij(leg_i, leg_j, &model, &mut pert_cache, "QCD").unwrap();
    assert_eq!(ij.iter().map(|leg| leg.id).collect::<Vec<_>>(), vec![2]);

    let reduced = FksBornProcess::new(
        &real.process,
        leg_i,
        leg_j,
        ij[0].clone(),
        real.born_orders(),
        &mut cache,
        &generator,
    )
    .unwrap();
    assert_eq!(reduced.process.pdg_codes(), vec![2, -2, -11, 11]);
    assert_eq!((reduced.i_fks, reduced.j_fks), (5, 1));
    assert_eq!(reduced.amplitude.n_diagrams(), 2);
}

#[test]
fn real_born_configuration_links() {
    let born = drell_yan();
    let links = born.link_rb_confs();

    assert_eq!(links.len(), born.real_amps.len());
    // Emission off the u leg collapses onto the photon and the Z diagram.
    assert_eq!(links[0].len(), 2);
    let mut born_diagrams = links[0]
        .iter()
        .map(|link| link.born_diagram)
        .collect::<Vec<_>>();
    born_diagrams.sort();
    assert_eq!(born_diagrams, vec![0, 1]);
    assert_eq!(links[2].len(), 2);
}

#[test]
fn double_counted_final_state_splittings() {
    let model = load_generic_model("sm");
    let process = parse_process("e+ e- > g g [QCD]", &model);
    let mut cache = AmplitudeCache::new();

    let mut kept =
        FksProcessFromBorn::new(StartProcess::Process(process.clone()), true, &NoDiagrams, &mut cache)
            .unwrap();
    kept.generate_reals(&NoDiagrams, &mut cache).unwrap();
    assert_eq!(kept.real_amps.len(), 7);
    assert!(kept.real_amps.iter().all(|real| real.is_to_integrate));
    // g > g g survives from the first gluon, g > q q~ from the second.
    assert_eq!(kept.real_amps[0].ij, 3);
    assert!(kept.real_amps[1..]
        .iter()
        .all(|real| real.ij == 4 && real.ijglu == 4));

    let mut flagged =
        FksProcessFromBorn::new(StartProcess::Process(process), false, &NoDiagrams, &mut cache)
            .unwrap();
    flagged.generate_reals(&NoDiagrams, &mut cache).unwrap();
    assert_eq!(flagged.real_amps.len(), 14);
    assert_eq!(
        double_counted_reals(&flagged.real_amps, 2),
        (1..8).collect::<BTreeSet<usize>>()
    );
    assert!(flagged.real_amps[1..8].iter().all(|real| !real.is_to_integrate));
    assert!(flagged.real_amps[0].is_to_integrate);
    assert!(flagged.real_amps[8..].iter().all(|real| real.is_to_integrate));
    assert_eq!(
        flagged.real_amps.iter().filter(|real| real.is_nbody_only).count(),
        1
    );
    assert!(flagged.real_amps[0].is_nbody_only);

    // Identical q q~ reals from legs 3 and 4 share (i_fks, j_fks).
    let (first, second) = (&flagged.real_amps[1], &flagged.real_amps[8]);
    assert_eq!(first.pdgs, second.pdgs);
    assert_eq!((first.i_fks, first.j_fks), (second.i_fks, second.j_fks));
    assert_eq!((first.ij, second.ij), (3, 4));

    // g > g g from the first gluon
    assert_eq!((flagged.real_amps[0].i_fks, flagged.real_amps[0].j_fks), (4, 3));
    assert_eq!(flagged.real_amps[0].ijglu, 3);
    assert_eq!(flagged.real_amps[7].ijglu, 4);
    // Without a WEIGHTED entry in the Born orders none is added.
    assert_eq!(flagged.real_amps[0].process.orders.get(WEIGHTED), None);
    assert_eq!(flagged.real_amps[0].process.orders.get("QCD"), Some(1));
}

#[test]
fn qed_reals_raise_weighted_by_two() {
    let model = load_generic_model("sm");
    let process = parse_process("u u~ > e+ e- [QED]", &model);
    let mut cache = AmplitudeCache::new();
    let born = FksProcessFromBorn::new(
        StartProcess::Process(process),
        true,
        &TreeGenerator::default(),
        &mut cache,
    )
    .unwrap();

    // Every leg radiates a photon, the quarks also split off an initial photon.
    assert_eq!(born.reals.iter().map(|reals| reals.len()).collect::<Vec<_>>(), vec![2, 2, 1, 1]);

    let mut born = born;
    born.generate_reals(&NoDiagrams, &mut cache).unwrap();
    for real in born.real_amps.iter() {
        assert_eq!(real.perturbed_orders, vec!["QED"]);
        assert_eq!(real.process.orders.get("QED"), Some(3));
        assert_eq!(real.process.orders.get(WEIGHTED), Some(6));
        assert!(!real.need_color_links);
    }
}

#[test]
fn mixed_reals_raise_only_their_own_order() {
    let model = load_generic_model("sm");
    let process = parse_process("u u~ > e+ e- [QCD QED]", &model);
    let mut cache = AmplitudeCache::new();
    let mut born = FksProcessFromBorn::new(
        StartProcess::Process(process),
        true,
        &TreeGenerator::default(),
        &mut cache,
    )
    .unwrap();
    assert_eq!(
        born.real_orders[0],
        vec!["QCD", "QCD", "QED", "QED"]
    );
    born.generate_reals(&NoDiagrams, &mut cache).unwrap();

    let (qcd, qed): (Vec<_>, Vec<_>) = born
        .real_amps
        .iter()
        .partition(|real| real.perturbed_orders == vec!["QCD"]);
    assert_eq!((qcd.len(), qed.len()), (4, 6));
    for real in qcd.iter() {
        assert_eq!(real.process.orders.get("QCD"), Some(1));
        assert_eq!(real.process.orders.get("QED"), Some(2));
        assert_eq!(real.process.orders.get(WEIGHTED), Some(5));
    }
    for real in qed.iter() {
        assert_eq!(real.perturbed_orders, vec!["QED"]);
        assert_eq!(real.process.orders.get("QCD"), Some(0));
        assert_eq!(real.process.orders.get("QED"), Some(3));
        assert_eq!(real.process.orders.get(WEIGHTED), Some(6));
    }
}

#[test]
fn nbody_selection_requires_a_born_like_real() {
    let born = drell_yan();
    assert_eq!(
        select_nbody_only(&born.real_amps, &born.pdg_codes, born.nincoming).unwrap(),
        2
    );

    let err = select_nbody_only(&[], &born.pdg_codes, born.nincoming).unwrap_err();
    assert!(matches!(err, FksError::Consistency(msg) if msg == "nbody configuration not found"));

    let real_only_gluon_initiated = vec![born.real_amps[1].clone()];
    assert!(select_nbody_only(&real_only_gluon_initiated, &born.pdg_codes, 2).is_err());
}

#[test]
fn real_requires_tagged_legs() {
    let model = load_generic_model("sm");
    let born = parse_process("u u~ > e+ e- [QCD]", &model);
    let mut legs = born.legs.clone();
    legs.push(leg(&model, 21, 5, LegState::Final).with_fks(FksTag::I));
    let mut cache = AmplitudeCache::new();

    let err = FksRealProcess::new(&born, legs, 1, 0, &[], &mut cache, &NoDiagrams).unwrap_err();
    assert!(matches!(err, FksError::Consistency(_)));
}

#[test]
fn color_links_only_for_massless_gluon_emission() {
    let model = load_generic_model("sm");
    let born = parse_process("u u~ > e+ e- [QCD]", &model);
    let mut cache = AmplitudeCache::new();
    let real_with_i = |i_leg: Leg, cache: &mut AmplitudeCache| {
        let mut legs = born.legs.clone();
        legs[0] = legs[0].clone().with_fks(FksTag::J);
        legs.push(i_leg.with_fks(FksTag::I));
        FksRealProcess::new(&born, legs, 1, 0, &[], cache, &NoDiagrams).unwrap()
    };

    let gluon = leg(&model, 21, 5, LegState::Final);
    assert!(real_with_i(gluon.clone(), &mut cache).need_color_links);

    let mut heavy_gluon = gluon;
    heavy_gluon.massless = false;
    assert!(!real_with_i(heavy_gluon, &mut cache).need_color_links);

    let quark = leg(&model, 2, 5, LegState::Final);
    assert!(quark.massless);
    assert!(!real_with_i(quark, &mut cache).need_color_links);
}

#[test]
fn construction_and_configuration_errors() {
    let model = load_generic_model("sm");
    let definition = parse_definition("u u~ > e+ e- [QCD]", &model);
    let mut cache = AmplitudeCache::new();

    let err = FksProcessFromBorn::new(
        StartProcess::Definition(definition),
        true,
        &NoDiagrams,
        &mut cache,
    )
    .unwrap_err();
    assert!(matches!(err, FksError::Construction(_)));

    let process = parse_process("u u~ > e+ e- [QCD]", &model);
    let settings: serde_yaml::Value = serde_yaml::from_str("remove_reals: maybe").unwrap();
    let err = FksProcessFromBorn::with_settings(
        StartProcess::Process(process.clone()),
        &settings,
        &NoDiagrams,
        &mut cache,
    )
    .unwrap_err();
    assert!(matches!(err, FksError::Configuration(_)));

    let settings: serde_yaml::Value = serde_yaml::from_str("remove_reals: false").unwrap();
    let born = FksProcessFromBorn::with_settings(
        StartProcess::Process(process),
        &settings,
        &NoDiagrams,
        &mut cache,
    )
    .unwrap();
    assert!(!born.remove_reals);
}

#[test]
fn unsupported_nlo_modes() {
    let model = load_generic_model("sm");
    for input in ["u u~ > e+ e- [virt=QCD]", "u u~ > e+ e- [LOonly=QCD]", "u u~ > e+ e-"] {
        let definition = parse_definition(input, &model);
        let err = FksMultiProcessFromBorn::new(
            &definition,
            true,
            &TreeGenerator::default(),
            &LCutLoopGenerator::default(),
        )
        .unwrap_err();
        assert!(matches!(err, FksError::Configuration(_)), "{}", input);
    }
}

#[test]
fn drell_yan_diagram_counts() {
    let model = load_generic_model("sm");
    let generator = TreeGenerator::default();
    let loop_generator = LCutLoopGenerator::default();

    let definition = parse_definition("u u~ > e+ e- [QCD]", &model);
    let multi = FksMultiProcessFromBorn::new(&definition, true, &generator, &loop_generator).unwrap();
    assert_eq!(multi.born_processes.len(), 1);
    // Four real emissions of four diagrams each, two of them sharing one amplitude.
    assert_eq!(multi.get_real_amplitudes().len(), 4);
    assert_eq!(multi.get_virt_amplitudes().len(), 1);
    assert_eq!(
        multi.diagram_counts(),
        DiagramCounts {
            born: 2,
            real: 16,
            virt: 2
        }
    );
    assert_eq!(
        multi.diagram_counts().to_string(),
        "born: 2 diagrams, real: 16 diagrams, virtual: 2 diagrams"
    );

    let definition = parse_definition("u u~ > e+ e- [real=QCD]", &model);
    let multi = FksMultiProcessFromBorn::new(&definition, true, &generator, &loop_generator).unwrap();
    assert!(multi.get_virt_amplitudes().is_empty());
    assert_eq!(multi.diagram_counts().virt, 0);
    assert_eq!(multi.diagram_counts().real, 16);
}

#[test]
fn multi_process_shares_real_amplitudes() {
    let model = load_generic_model("sm");
    let mut multiparticles = indexmap::IndexMap::new();
    multiparticles.insert("q".to_string(), vec!["u".to_string(), "u~".to_string()]);
    let definition =
        crate::process::ProcessDefinition::parse("q q > e+ e- [real=QCD]", model, &multiparticles)
            .unwrap();
    let multi = FksMultiProcessFromBorn::new(
        &definition,
        true,
        &TreeGenerator::default(),
        &LCutLoopGenerator::default(),
    )
    .unwrap();

    // u u~ and u~ u have diagrams, u u and u~ u~ do not.
    assert_eq!(multi.born_processes.len(), 2);
    assert_eq!(multi.get_born_amplitudes().len(), 2);
    assert_eq!(multi.diagram_counts().born, 4);
    assert!(multi.cache.hits() > 0);
}
