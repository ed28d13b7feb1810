/// Errors raised by encodings, operators and the generational engine.
///
/// Every variant is detected at the offending call and returned to the
/// caller; nothing is retried or silently repaired.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GaError {
    /// A hyperparameter or operator argument is outside its valid domain.
    #[error("InvalidConfiguration: {0}")]
    InvalidConfiguration(String),
    /// Selection weights are negative, NaN, or sum to zero.
    #[error("InvalidWeight: {0}")]
    InvalidWeight(String),
    /// A weight or statistic became infinite or NaN during computation.
    #[error("NumericOverflow: {0}")]
    NumericOverflow(String),
    /// Value and index bookkeeping disagree, or two encodings cannot be combined.
    #[error("InconsistentEncoding: {0}")]
    InconsistentEncoding(String),
}

/// Rejects probabilities outside `[0, 1]` (NaN included).
pub(crate) fn check_probability(name: &str, p: f64) -> Result<f64, GaError> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(GaError::InvalidConfiguration(format!(
            "{name} must be between 0.0 and 1.0, got {p}"
        )))
    }
}
