//! Error types for sleepviz

use thiserror::Error;

/// Errors that can occur while loading data or building visualizations
#[derive(Debug, Error)]
pub enum VizError {
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid level {level} for factor {factor} (expected 0-{max})")]
    InvalidLevel { factor: String, level: u8, max: u8 },

    #[error("Unknown factor: {0}")]
    UnknownFactor(String),

    #[error("Unknown age option: {0}")]
    UnknownAgeOption(String),

    #[error("Invalid render configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid factor bindings: {0}")]
    BindingError(String),
}

impl VizError {
    /// True for failures of the dataset boundary (fetch or parse)
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            VizError::Io(_) | VizError::Csv(_) | VizError::MissingColumn(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_classification() {
        assert!(VizError::MissingColumn("age_years".to_string()).is_load_error());
        assert!(!VizError::UnknownFactor("sleepiness".to_string()).is_load_error());
    }

    #[test]
    fn test_invalid_level_message() {
        let err = VizError::InvalidLevel {
            factor: "coffee".to_string(),
            level: 7,
            max: 4,
        };
        assert_eq!(
            err.to_string(),
            "Invalid level 7 for factor coffee (expected 0-4)"
        );
    }
}
