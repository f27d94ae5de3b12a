//! Error types for `catalog-core`.

use thiserror::Error;

use crate::property::CatalogProperty;

#[derive(Debug, Error)]
pub enum Error {
  /// The property is known but computed, never persisted in a column.
  #[error("property {0} has no corresponding column in the catalog table")]
  UnmappedProperty(CatalogProperty),

  /// The name is outside the closed set of catalog properties. Callers and
  /// the model disagree on the schema; this is a defect, not user input.
  #[error("invalid catalog property {0:?}")]
  UnknownProperty(String),

  #[error("invalid catalog entry: {0}")]
  InvalidEntry(String),

  #[error("unknown catalog type discriminant: {0:?}")]
  UnknownCatalogType(String),

  #[error("unknown field type discriminant: {0:?}")]
  UnknownFieldType(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
