//! publiccode.yml parsing and schema checks
//!
//! The crawler only needs a yes/no answer plus a readable list of problems, so the
//! validator works on a generic YAML tree instead of a full typed model.

mod schema;

pub use schema::PubliccodeValidator;

use thiserror::Error;

/// Errors reported while validating a manifest
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{}", .0.join("; "))]
    Schema(Vec<String>),
}

/// Parses manifest bytes and reports schema errors
///
/// `base_dir` is the remote directory the manifest was fetched from; relative
/// references inside the manifest are resolved against it. It is passed on every
/// call so concurrent validations never share it.
pub trait Validator: Send + Sync {
    fn parse(&self, data: &[u8], base_dir: &str) -> Result<(), ValidationError>;
}
