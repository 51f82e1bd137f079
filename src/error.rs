//! Error types for the packing engine.

use thiserror::Error;

/// Errors raised for malformed input or missing configuration.
///
/// A part that cannot be placed is not an error; it is reported in
/// [`crate::packer::PackingResult::unplaced_parts`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PackingError {
    /// Box not set (or otherwise unusable) when packing starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No parts were supplied.
    #[error("no parts to pack")]
    EmptyInput,

    /// A part or box dimension is zero, negative, NaN or infinite.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// A part weight is negative, NaN or infinite.
    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    /// A part allows no orientation at all.
    #[error("invalid orientation set: {0}")]
    InvalidOrientation(String),

    /// Two parts share the same id.
    #[error("duplicate part id: {0}")]
    DuplicatePartId(String),

    /// A packing option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

impl PackingError {
    /// Stable machine-readable code, used by the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            PackingError::Configuration(_) => "configuration_error",
            PackingError::EmptyInput => "empty_input",
            PackingError::InvalidDimension(_) => "invalid_dimension",
            PackingError::InvalidWeight(_) => "invalid_weight",
            PackingError::InvalidOrientation(_) => "invalid_orientation",
            PackingError::DuplicatePartId(_) => "duplicate_part_id",
            PackingError::InvalidOption(_) => "invalid_option",
        }
    }
}

/// Result type for packing operations.
pub type Result<T> = std::result::Result<T, PackingError>;

/// Validates a single dimension.
pub(crate) fn validate_dimension(value: f64, name: &str) -> Result<()> {
    if value <= 0.0 || !value.is_finite() {
        return Err(PackingError::InvalidDimension(format!(
            "{} must be positive, got: {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates an optional weight (zero is allowed).
pub(crate) fn validate_weight(value: Option<f64>, owner: &str) -> Result<()> {
    match value {
        Some(w) if w < 0.0 || !w.is_finite() => Err(PackingError::InvalidWeight(format!(
            "weight of {} must be a non-negative number, got: {}",
            owner, w
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_dimension() {
        assert!(validate_dimension(10.0, "Width").is_ok());
        assert!(validate_dimension(0.0, "Width").is_err());
        assert!(validate_dimension(-1.0, "Width").is_err());
        assert!(validate_dimension(f64::NAN, "Width").is_err());
        assert!(validate_dimension(f64::INFINITY, "Width").is_err());
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight(None, "p").is_ok());
        assert!(validate_weight(Some(0.0), "p").is_ok());
        assert!(validate_weight(Some(3.8), "p").is_ok());
        assert!(matches!(
            validate_weight(Some(-1.0), "p"),
            Err(PackingError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PackingError::EmptyInput.to_string(), "no parts to pack");
        assert_eq!(
            PackingError::Configuration("box not set".into()).to_string(),
            "configuration error: box not set"
        );
        assert_eq!(PackingError::EmptyInput.code(), "empty_input");
    }
}
