use std::{path::PathBuf, sync::Arc, time::Duration};

use criterion::{criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;
use nlofks::{
    feyngen::{AmplitudeCache, AmplitudeGenerator, LCutLoopGenerator, TreeGenerator},
    fks::{FksMultiProcessFromBorn, FksProcessFromBorn, StartProcess},
    model::Model,
    process::{Process, ProcessDefinition},
    GenerationSettings,
};

fn load_sm() -> Arc<Model> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("models/sm.yaml");
    Arc::new(Model::from_file(path).unwrap())
}

fn single_process(input: &str, model: &Arc<Model>, multiparticles: &IndexMap<String, Vec<String>>) -> Process {
    ProcessDefinition::parse(input, model.clone(), multiparticles)
        .unwrap()
        .expand()
        .unwrap()
        .remove(0)
}

fn criterion_benchmark(c: &mut Criterion) {
    let model = load_sm();
    let multiparticles = GenerationSettings::default().multiparticles;
    let generator = TreeGenerator::default();
    let loop_generator = LCutLoopGenerator::default();

    let mut group = c.benchmark_group("born generation");
    group.measurement_time(Duration::from_secs(10));

    let ggggg = single_process("g g > g g g", &model, &multiparticles);
    group.bench_function("g g > g g g trees", |b| {
        b.iter(|| generator.generate(&ggggg).unwrap())
    });

    let drell_yan = single_process("u u~ > e+ e- [QCD]", &model, &multiparticles);
    group.bench_function("u u~ > e+ e- reals", |b| {
        b.iter(|| {
            let mut cache = AmplitudeCache::new();
            let mut born = FksProcessFromBorn::new(
                StartProcess::Process(drell_yan.clone()),
                true,
                &generator,
                &mut cache,
            )
            .unwrap();
            born.generate_reals(&generator, &mut cache).unwrap();
            born
        })
    });

    let definition = ProcessDefinition::parse("p p > e+ e- [QCD]", model.clone(), &multiparticles).unwrap();
    group.bench_function("p p > e+ e- [QCD]", |b| {
        b.iter(|| FksMultiProcessFromBorn::new(&definition, true, &generator, &loop_generator).unwrap())
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().sample_size(10);
    targets = criterion_benchmark
}
criterion_main!(benches);
