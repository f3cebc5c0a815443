//! `epistat describe` and `epistat sample`.

use anyhow::{Result, bail};
use es_core::Shape;
use es_prob::{
    Distribution, DistributionKind, MomentTarget, SamplingBackend, SamplingService,
    StochasticParameter, TruncLimits,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::write_json;

pub(crate) struct SampleArgs {
    pub n_samples: usize,
    pub seed: Option<u64>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub outputs: usize,
    pub backend: SamplingBackend,
    pub strict: bool,
    pub stats: bool,
}

fn build_distribution(
    name: &str,
    params: &[(String, f64)],
    mean: Option<f64>,
    mode: Option<f64>,
    std: Option<f64>,
) -> Result<Distribution> {
    let target = match (mean, mode, std) {
        (Some(m), None, Some(s)) => Some(MomentTarget::mean_std(m, s)),
        (None, Some(m), Some(s)) => Some(MomentTarget::mode_std(m, s)),
        (None, None, _) => None,
        _ => bail!("moment matching needs --std with exactly one of --mean or --mode"),
    };
    if let Some(target) = target {
        if !params.is_empty() {
            bail!("--param cannot be combined with moment matching");
        }
        return Ok(Distribution::from_moments(DistributionKind::from_name(name)?, &target)?);
    }
    let map: BTreeMap<String, f64> = params.iter().cloned().collect();
    if map.len() != params.len() {
        bail!("duplicate --param name");
    }
    Ok(Distribution::create(name, &map)?)
}

pub(crate) fn cmd_describe(
    name: &str,
    params: &[(String, f64)],
    mean: Option<f64>,
    mode: Option<f64>,
    std: Option<f64>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let d = build_distribution(name, params, mean, mode, std)?;
    let kind = d.kind();
    tracing::info!(distribution = %d, "described");

    let (low, high) = d.support();
    write_json(
        output,
        serde_json::json!({
            "distribution": d,
            "kind": kind.name(),
            "n_params": d.n_params(),
            "constraint": kind.constraint(),
            "discrete": kind.is_discrete(),
            "support": [low, high],
            "moments": d.summary(),
        }),
    )
}

pub(crate) fn cmd_sample(
    name: &str,
    params: &[(String, f64)],
    args: SampleArgs,
    output: Option<&PathBuf>,
) -> Result<()> {
    let d = build_distribution(name, params, None, None, None)?;
    let shape = if args.outputs > 1 { Shape::vector(args.outputs)? } else { Shape::scalar() };
    let (low, high) = d.support();
    let parameter = StochasticParameter::new(name, low, high, shape, d)?;

    let limits = TruncLimits { low: args.low, high: args.high };
    let service = SamplingService::new(args.n_samples)
        .with_seed_opt(args.seed)
        .with_backend(args.backend)
        .with_trunc_limits(limits)
        .strict(args.strict);
    let set = service.generate(&parameter)?;
    tracing::info!(
        distribution = %d,
        backend = %set.backend,
        n_samples = set.n_samples,
        outputs = set.n_outputs(),
        "sampled"
    );

    let mut value = serde_json::to_value(&set)?;
    if args.stats
        && let Some(obj) = value.as_object_mut()
    {
        obj.insert("stats".to_string(), serde_json::to_value(set.stats())?);
    }
    write_json(output, value)
}
