//! Error types for joint constitutive models.

use crate::table::TableHandle;
use thiserror::Error;

pub type JointResult<T> = Result<T, JointError>;

/// Errors raised by joint constitutive models and their collaborators.
#[derive(Debug, Error)]
pub enum JointError {
    #[error("configuration error in model '{model}': {details}")]
    Configuration { model: &'static str, details: String },

    #[error("property index {index} out of range 1..={count}")]
    PropertyIndex { index: usize, count: usize },

    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("property '{name}' expects a {expected} value")]
    PropertyType { name: &'static str, expected: &'static str },

    #[error("energy index {index} out of range 1..={count}")]
    EnergyIndex { index: usize, count: usize },

    #[error("operation '{operation}' is not supported by model '{model}'")]
    Unsupported { operation: &'static str, model: &'static str },

    #[error("cannot copy model '{found}' into model '{expected}'")]
    ModelMismatch { expected: &'static str, found: &'static str },

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("stale table handle {0:?}")]
    StaleTable(TableHandle),

    #[error("table '{0}' requested but no table collaborator is attached")]
    NoTables(String),

    #[error("non-finite force (normal {normal}, shear [{shear_x}, {shear_y}])")]
    NonFiniteForce { normal: f64, shear_x: f64, shear_y: f64 },

    #[error("unknown contact {0}")]
    UnknownContact(usize),

    #[error("expected {expected} contact states, got {found}")]
    ContactCount { expected: usize, found: usize },

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("library '{found}' does not match model '{name}' major version {major}")]
    LibraryName { found: String, name: String, major: u32 },

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_cbor::Error),

    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

impl JointError {
    #[must_use]
    pub fn configuration(model: &'static str, details: impl Into<String>) -> Self {
        Self::Configuration {
            model,
            details: details.into(),
        }
    }

    #[must_use]
    pub const fn unsupported(operation: &'static str, model: &'static str) -> Self {
        Self::Unsupported { operation, model }
    }
}
