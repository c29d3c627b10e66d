//! Error types for catalog loading and validation.

use thiserror::Error;

/// Errors that can occur while building or loading a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to parse catalog JSON
    #[error("failed to parse catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A numeric property declares `min > max`
    #[error("property '{property}' of '{unit}' has min {min} greater than max {max}")]
    InvalidBounds {
        /// Unit type name.
        unit: String,
        /// Property name.
        property: String,
        /// Declared minimum.
        min: f64,
        /// Declared maximum.
        max: f64,
    },

    /// An enumerated property's default is not one of its options
    #[error("property '{property}' of '{unit}' has a default outside its options")]
    InvalidDefault {
        /// Unit type name.
        unit: String,
        /// Property name.
        property: String,
    },

    /// A unit declares two ports or properties with the same name
    #[error("unit '{0}' declares a duplicate port or property name")]
    DuplicateName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_bounds_display() {
        let err = CatalogError::InvalidBounds {
            unit: "Gain".to_string(),
            property: "gain".to_string(),
            min: 2.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "property 'gain' of 'Gain' has min 2 greater than max 1"
        );
    }

    #[test]
    fn duplicate_name_display() {
        let err = CatalogError::DuplicateName("Osc".to_string());
        assert_eq!(
            err.to_string(),
            "unit 'Osc' declares a duplicate port or property name"
        );
    }
}
