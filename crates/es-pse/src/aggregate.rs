//! Transposition of per-sample outputs into columns.
//!
//! Only successful records contribute. Columns follow the input record order, so
//! callers sort by sample index first (the PSE service already does).

use std::collections::{BTreeMap, BTreeSet};

use es_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::OutputValue;
use crate::record::SampleRecord;

/// What to do with fields some successful samples did not produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Keep every field; absent entries become [`OutputValue::Missing`].
    #[default]
    Union,
    /// Keep only the fields produced by every successful sample.
    Intersection,
}

/// Columnar outputs of the successful samples.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregatedResult {
    /// Sample index of each row.
    pub sample_indices: Vec<usize>,
    /// One column per field, one entry per row.
    pub fields: BTreeMap<String, Vec<OutputValue>>,
    /// Fields not produced by every successful sample.
    pub mismatched_fields: Vec<String>,
}

impl AggregatedResult {
    /// Number of rows (successful samples).
    pub fn len(&self) -> usize {
        self.sample_indices.len()
    }

    /// No successful sample.
    pub fn is_empty(&self) -> bool {
        self.sample_indices.is_empty()
    }

    /// Field names.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    /// Raw column.
    pub fn get(&self, field: &str) -> Option<&[OutputValue]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Column as flags, if every entry is a flag.
    pub fn bools(&self, field: &str) -> Option<Vec<bool>> {
        self.get(field)?
            .iter()
            .map(|v| match v {
                OutputValue::Bool(b) => Some(*b),
                _ => None,
            })
            .collect()
    }

    /// Column as scalars, if every entry is a scalar.
    pub fn scalars(&self, field: &str) -> Option<Vec<f64>> {
        self.get(field)?
            .iter()
            .map(|v| match v {
                OutputValue::Scalar(x) => Some(*x),
                _ => None,
            })
            .collect()
    }

    /// Column as vectors, if every entry is a vector.
    pub fn vectors(&self, field: &str) -> Option<Vec<Vec<f64>>> {
        self.get(field)?
            .iter()
            .map(|v| match v {
                OutputValue::Vector(x) => Some(x.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Aggregate records under `policy`. Pure; never fails.
pub fn aggregate(records: &[SampleRecord], policy: AggregationPolicy) -> AggregatedResult {
    let successes: Vec<(usize, &BTreeMap<String, OutputValue>)> =
        records.iter().filter_map(|r| r.outputs().map(|o| (r.index, o))).collect();

    let union: BTreeSet<&str> =
        successes.iter().flat_map(|(_, o)| o.keys().map(String::as_str)).collect();
    let mismatched: Vec<String> = union
        .iter()
        .filter(|f| successes.iter().any(|(_, o)| !o.contains_key(**f)))
        .map(|f| f.to_string())
        .collect();
    if !mismatched.is_empty() {
        log::warn!(
            "{} field(s) missing from some successful samples ({:?}); policy {:?}",
            mismatched.len(),
            mismatched,
            policy
        );
    }

    let kept = union.iter().filter(|f| match policy {
        AggregationPolicy::Union => true,
        AggregationPolicy::Intersection => !mismatched.iter().any(|m| m == *f),
    });
    let fields = kept
        .map(|f| {
            let column = successes
                .iter()
                .map(|(_, o)| o.get(*f).cloned().unwrap_or(OutputValue::Missing))
                .collect();
            (f.to_string(), column)
        })
        .collect();

    AggregatedResult {
        sample_indices: successes.iter().map(|(i, _)| *i).collect(),
        fields,
        mismatched_fields: mismatched,
    }
}

/// Aggregate, failing with [`Error::AggregationFieldMismatch`] unless all successful
/// samples produced the same fields.
pub fn aggregate_strict(records: &[SampleRecord]) -> Result<AggregatedResult> {
    let result = aggregate(records, AggregationPolicy::Union);
    if result.mismatched_fields.is_empty() {
        Ok(result)
    } else {
        Err(Error::AggregationFieldMismatch { fields: result.mismatched_fields })
    }
}
