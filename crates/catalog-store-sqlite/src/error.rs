//! Error type for `catalog-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation and property-mapping failures, surfaced unchanged.
  #[error(transparent)]
  Core(#[from] catalog_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("cannot decode column {column}: {reason}")]
  Decode { column: &'static str, reason: String },

  /// A uniqueness or referential constraint rejected a write.
  #[error("integrity violation: {0}")]
  Integrity(String),

  /// The association or edge already exists.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("catalog entry not found: {0}")]
  NotFound(uuid::Uuid),

  #[error("metric {0} cannot be linked to itself")]
  SelfLoop(uuid::Uuid),
}

impl Error {
  /// Classify the failure of a write: constraint violations become
  /// [`Error::Integrity`], everything else stays a database error.
  pub(crate) fn from_write(err: tokio_rusqlite::Error) -> Self {
    match err {
      tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
        failure,
        message,
      )) if failure.code == rusqlite::ErrorCode::ConstraintViolation => {
        Self::Integrity(message.unwrap_or_else(|| failure.to_string()))
      }
      other => Self::Database(other),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
