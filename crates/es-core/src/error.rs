//! Error types for EpiStat

use thiserror::Error;

/// EpiStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Distribution name not present in the registry.
    #[error("Unknown distribution variant: {0}")]
    UnknownVariant(String),

    /// A moment is mathematically undefined for this variant/parameter combination.
    #[error("Undefined moment: {moment} of {variant}")]
    UndefinedMoment {
        /// Variant name (e.g. `student_t(df=1.5, mu=0, sigma=1)`).
        variant: String,
        /// Moment name (`mean`, `mode`, `var`, ...).
        moment: &'static str,
    },

    /// Requested mean/mode/std lies outside the variant's feasible region.
    #[error("Cannot match moments for {variant}: {reason}")]
    NonMatchableMoments {
        /// Variant name.
        variant: String,
        /// Why the target is infeasible.
        reason: String,
    },

    /// No sampling backend can realise the request.
    #[error("Sampling backend {backend} unavailable for {variant}: {reason}")]
    SamplingBackendUnavailable {
        /// Backend name.
        backend: &'static str,
        /// Variant name.
        variant: String,
        /// What the backend lacks.
        reason: String,
    },

    /// A PSE target path/index does not resolve against the state it is applied to.
    #[error("Path resolution error: {0}")]
    PathResolution(String),

    /// Failure raised by the external configure / stability-analysis pipeline.
    #[error("Analysis failure: {0}")]
    Analysis(String),

    /// Successful records disagree on the produced fields.
    #[error("Aggregation field mismatch: {fields:?}")]
    AggregationFieldMismatch {
        /// Fields not produced by every successful record.
        fields: Vec<String>,
    },

    /// Flattened estimate names could not be reassembled.
    #[error("Estimate reassembly error: {0}")]
    Estimates(String),

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let e = Error::UndefinedMoment { variant: "uniform(a=0, b=1)".into(), moment: "mode" };
        assert_eq!(e.to_string(), "Undefined moment: mode of uniform(a=0, b=1)");

        let e = Error::AggregationFieldMismatch { fields: vec!["x".into()] };
        assert!(e.to_string().contains("\"x\""));
    }

    #[test]
    fn test_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let e: Error = io.into();
        assert!(matches!(e, Error::Io(_)));
    }
}
