//! `epistat priors`.

use anyhow::{Context, Result};
use es_inversion::{
    ModelInversionParameterFactory, read_prior_overrides, read_structural_connectivity,
};
use std::path::PathBuf;

use crate::write_json;

pub(crate) fn cmd_priors(
    n_regions: usize,
    overrides: Option<&PathBuf>,
    connectivity: Option<&PathBuf>,
    name: &str,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut factory = ModelInversionParameterFactory::new(n_regions)?;
    if let Some(path) = overrides {
        let o = read_prior_overrides(path)
            .with_context(|| format!("reading prior overrides {}", path.display()))?;
        factory = factory.with_overrides(o)?;
    }
    if let Some(path) = connectivity {
        let weights = read_structural_connectivity(path)
            .with_context(|| format!("reading structural connectivity {}", path.display()))?;
        factory = factory.with_structural_connectivity(weights)?;
    }
    let model = factory.generate_statistical_model(name)?;
    tracing::info!(
        model = model.name(),
        n_regions,
        priors = model.parameters().len(),
        connectivity = connectivity.is_some(),
        "priors built"
    );

    write_json(
        output,
        serde_json::json!({
            "name": model.name(),
            "n_regions": model.n_regions(),
            "sig_eq_default": es_inversion::default_sig_eq(),
            "parameters": model.describe(),
        }),
    )
}
