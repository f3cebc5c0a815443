//! `epistat pse-params`.

use anyhow::{Context, Result};
use es_pse::{PseRunConfig, read_hypothesis, read_run_config};
use std::path::PathBuf;

use crate::write_json;

pub(crate) fn cmd_pse_params(
    hypothesis: &PathBuf,
    config: Option<&PathBuf>,
    n_samples: Option<usize>,
    seed: Option<u64>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let spec = read_hypothesis(hypothesis)
        .with_context(|| format!("reading hypothesis {}", hypothesis.display()))?;
    let mut cfg = match config {
        Some(path) => {
            read_run_config(path).with_context(|| format!("reading run config {}", path.display()))?
        }
        None => PseRunConfig::default(),
    };
    if let Some(n) = n_samples {
        cfg.n_samples = n;
    }
    if seed.is_some() {
        cfg.seed = seed;
    }

    let (connectivity, hyp, service) = spec.build()?;
    let params = cfg.build_parameter_set(&hyp, &connectivity, &service)?;
    tracing::info!(
        hypothesis = hyp.name(),
        regions = hyp.number_of_regions(),
        entries = params.len(),
        n_samples = params.n_samples(),
        "PSE parameter set built"
    );

    write_json(
        output,
        serde_json::json!({
            "hypothesis": hyp.name(),
            "kind": hyp.kind(),
            "n_regions": hyp.number_of_regions(),
            "n_samples": params.n_samples(),
            "service": cfg.service_settings(),
            "names": params.names(),
            "entries": params.entries(),
        }),
    )
}
