//! Directed edges of the metrics tree.
//!
//! The relation is a plain directed graph: `(A, B)` and `(B, A)` are distinct
//! edges and cycles are not detected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsTreeEdge {
  pub source_metric_uuid:   Uuid,
  pub target_metric_uuid:   Uuid,
  pub created_at:           DateTime<Utc>,
  pub created_by_user_uuid: Option<Uuid>,
}

impl MetricsTreeEdge {
  /// The ordered pair identifying this edge.
  pub fn key(&self) -> (Uuid, Uuid) {
    (self.source_metric_uuid, self.target_metric_uuid)
  }
}
