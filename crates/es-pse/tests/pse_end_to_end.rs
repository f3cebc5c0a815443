//! End-to-end PSE runs over small hypotheses with toy stability pipelines.

use std::collections::BTreeSet;

use es_core::{Error, Result};
use es_pse::{
    AggregationPolicy, Connectivity, DiseaseHypothesis, FailureReason, FieldIndex, FnPipeline,
    ModelConfigurationService, OutputRecord, PseParameter, PseParameterSet, PseParamsBuilder,
    PseSamples, PseService, PseTarget, SampleState, aggregate,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

fn three_regions() -> (SampleState, Connectivity) {
    let h = DiseaseHypothesis::builder(3).excitability(vec![0], vec![0.5]).build().unwrap();
    let s = ModelConfigurationService::new(3).unwrap();
    let c = Connectivity::from_rows(
        &[vec![0.0, 1.0, 1.0], vec![1.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]],
        vec!["r0".into(), "r1".into(), "r2".into()],
    )
    .unwrap();
    (SampleState::new(h, s).unwrap(), c)
}

fn x0_entry(samples: Vec<f64>) -> PseParameterSet {
    let entry = PseParameter::new(
        "x0_values[0]",
        PseTarget::parse("x0_values").unwrap(),
        vec![FieldIndex::Position(0)],
        PseSamples::Scalar(samples),
    )
    .unwrap();
    PseParameterSet::new(vec![entry]).unwrap()
}

fn configure_x0(state: &SampleState, _c: &Connectivity) -> Result<f64> {
    Ok(state.hypothesis.x0_values()[0])
}

fn stability(x0: f64) -> Result<OutputRecord> {
    Ok(OutputRecord::from([
        ("stable".to_string(), (x0 < 0.7).into()),
        ("x0".to_string(), x0.into()),
    ]))
}

#[test]
fn test_three_samples_stability_flags() {
    let (base, conn) = three_regions();
    let svc = PseService::new(
        "x0 sweep",
        base.clone(),
        conn,
        x0_entry(vec![0.1, 0.5, 0.9]),
        FnPipeline::new(configure_x0, stability),
    );
    let (agg, status) = svc.run().unwrap();

    assert_eq!(status.n_samples, 3);
    assert_eq!(status.n_success, 3);
    assert!(status.all_succeeded());
    assert_eq!(agg.len(), 3);
    assert_eq!(agg.bools("stable").unwrap(), vec![true, true, false]);
    assert_eq!(agg.scalars("x0").unwrap(), vec![0.1, 0.5, 0.9]);
    // The base state is never mutated.
    assert_eq!(base.hypothesis.x0_values(), &[0.5]);
}

#[test]
fn test_failing_sample_is_skipped() {
    let (base, conn) = three_regions();
    let pipeline = FnPipeline::new(configure_x0, |x0: f64| {
        if x0 > 0.8 {
            return Err(Error::Analysis("model configuration diverged".into()));
        }
        stability(x0)
    });
    let svc = PseService::new("fail", base, conn, x0_entry(vec![0.1, 0.5, 0.9]), pipeline);
    let (agg, status) = svc.run().unwrap();

    assert_eq!(status.n_success, 2);
    assert_eq!(status.n_failed, 1);
    assert_eq!(status.failures[0].0, 2);
    assert!(matches!(&status.failures[0].1, FailureReason::Analysis(m) if m.contains("diverged")));
    assert_eq!(agg.sample_indices, vec![0, 1]);
    assert_eq!(agg.bools("stable").unwrap().len(), 2);
}

#[test]
fn test_records_cover_every_index_once() {
    let (base, conn) = three_regions();
    let samples: Vec<f64> = (0..64).map(|i| i as f64 / 64.0).collect();
    let svc = PseService::new(
        "many",
        base,
        conn,
        x0_entry(samples.clone()),
        FnPipeline::new(configure_x0, stability),
    )
    .with_workers(4);
    let records = svc.run_records().unwrap();

    assert_eq!(records.len(), 64);
    let indices: BTreeSet<usize> = records.iter().map(|r| r.index).collect();
    assert_eq!(indices.len(), 64);
    assert!(records.windows(2).all(|w| w[0].index < w[1].index));
    for r in &records {
        assert_eq!(r.applied[0].values, vec![samples[r.index]]);
    }
}

#[test]
fn test_aggregation_independent_of_completion_order() {
    let (base, conn) = three_regions();
    let samples: Vec<f64> = (0..20).map(|i| i as f64 / 20.0).collect();
    let svc = PseService::new(
        "order",
        base,
        conn,
        x0_entry(samples),
        FnPipeline::new(configure_x0, stability),
    );
    let records = svc.run_records().unwrap();
    let expected = aggregate(&records, AggregationPolicy::Union);

    let mut shuffled = records.clone();
    shuffled.shuffle(&mut StdRng::seed_from_u64(3));
    shuffled.sort_by_key(|r| r.index);
    assert_eq!(aggregate(&shuffled, AggregationPolicy::Union), expected);
}

#[test]
fn test_builder_driven_run_with_coupling() {
    let h = DiseaseHypothesis::builder(4)
        .excitability(vec![1, 2], vec![0.6, 0.3])
        .connectivity_pairs(&[(1, 2)], vec![0.5])
        .build()
        .unwrap();
    let s = ModelConfigurationService::new(4).unwrap().with_k(2.0);
    let c = Connectivity::from_rows(&vec![vec![1.0; 4]; 4], vec![]).unwrap();
    let params = PseParamsBuilder::new(&h, &c, &s, 30)
        .seed(Some(42))
        .global_coupling(vec![Default::default()])
        .build()
        .unwrap();
    assert_eq!(params.len(), 4);

    let base = SampleState::new(h, s).unwrap();
    let pipeline = FnPipeline::new(
        |state: &SampleState, _c: &Connectivity| {
            Ok((state.hypothesis.x0_values().to_vec(), state.service.k_scaled()))
        },
        |(x0, k): (Vec<f64>, Vec<f64>)| {
            Ok(OutputRecord::from([
                ("x0".to_string(), x0.into()),
                ("k_mean".to_string(), (k.iter().sum::<f64>() / k.len() as f64).into()),
            ]))
        },
    );
    let (agg, status) = PseService::new("builder", base, c, params, pipeline).run().unwrap();
    assert_eq!(status.n_success, 30);
    let x0 = agg.vectors("x0").unwrap();
    assert!(x0.iter().all(|v| v.len() == 2 && v[0] <= 0.7 + 1e-12 && v[1] >= 0.2 - 1e-12));
    assert!(agg.scalars("k_mean").unwrap().iter().all(|k| *k >= 0.0));
}
