//! Tag associations on catalog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A `(catalog entry, tag)` pair. At most one association exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTag {
  pub catalog_search_uuid:  Uuid,
  pub tag_uuid:             Uuid,
  /// Server-assigned; never changes after creation.
  pub created_at:           DateTime<Utc>,
  /// `None` for associations created by YAML sync or other system processes.
  pub created_by_user_uuid: Option<Uuid>,
  /// YAML-sourced associations are replaced wholesale on every sync; manual
  /// ones are never touched by it.
  pub is_from_yaml:         bool,
}
