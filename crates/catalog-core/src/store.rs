//! The `CatalogStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `catalog-store-sqlite`).
//! The indexing pipeline, search engine and lineage UI depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  edge::MetricsTreeEdge,
  entry::{CatalogEntry, CatalogType, NewCatalogEntry, ScalarUpdate},
  property::CatalogProperty,
  tag::CatalogTag,
};

// ─── Query values ────────────────────────────────────────────────────────────

/// A value compared against a catalog column by
/// [`CatalogStore::find_by_property`]. JSON columns compare against their
/// serialised text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
  Null,
  Integer(i64),
  Text(String),
}

impl From<&str> for PropertyValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for PropertyValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<i64> for PropertyValue {
  fn from(n: i64) -> Self { Self::Integer(n) }
}

impl From<Uuid> for PropertyValue {
  fn from(id: Uuid) -> Self { Self::Text(id.hyphenated().to_string()) }
}

impl From<CatalogType> for PropertyValue {
  fn from(t: CatalogType) -> Self { Self::Text(t.discriminant().to_owned()) }
}

// ─── Re-index ────────────────────────────────────────────────────────────────

/// What a [`CatalogStore::reindex`] call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexSummary {
  pub removed:        usize,
  pub inserted:       usize,
  /// Tags carried from a removed row onto its replacement.
  pub migrated_tags:  usize,
  pub migrated_icons: usize,
  pub migrated_edges: usize,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a catalog store backend.
///
/// Every method is an independent unit of work. Methods that touch several
/// rows say whether they are atomic. No method retries.
pub trait CatalogStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Catalog entries ───────────────────────────────────────────────────

  /// Insert a batch of entries into `project_uuid`, all or nothing.
  ///
  /// Fails with an integrity error if an entry collides with an existing row
  /// of the same `(type, table_name, name)` that was not removed first.
  fn insert_many(
    &self,
    project_uuid: Uuid,
    entries: Vec<NewCatalogEntry>,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  /// Delete every entry named `name` in the project, returning the number of
  /// rows removed. Removing a missing name is not an error.
  fn remove_by_name<'a>(
    &'a self,
    project_uuid: Uuid,
    name: &'a str,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Atomically remove `names` and insert `entries`, carrying tags, icons and
  /// metrics-tree edges over to replacement rows.
  fn reindex(
    &self,
    project_uuid: Uuid,
    names: Vec<String>,
    entries: Vec<NewCatalogEntry>,
  ) -> impl Future<Output = Result<ReindexSummary, Self::Error>> + Send + '_;

  /// Write one column of one entry. Fails with not-found if no row has the id.
  fn update_scalar_field(
    &self,
    catalog_search_uuid: Uuid,
    update: ScalarUpdate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve an entry by id. Returns `None` if not found.
  fn get_entry(
    &self,
    catalog_search_uuid: Uuid,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + '_;

  /// Entries of the project whose column for `property` equals `value`.
  /// Properties without a column fail before any query runs.
  fn find_by_property(
    &self,
    project_uuid: Uuid,
    property: CatalogProperty,
    value: PropertyValue,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  /// Field entries whose `table_name` has no table entry in the project.
  fn orphaned_fields(
    &self,
    project_uuid: Uuid,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + '_;

  // ── Tags ──────────────────────────────────────────────────────────────

  /// Associate a tag with an entry. Fails with a conflict if the pair exists.
  fn attach(
    &self,
    catalog_search_uuid: Uuid,
    tag_uuid: Uuid,
    created_by_user_uuid: Option<Uuid>,
    is_from_yaml: bool,
  ) -> impl Future<Output = Result<CatalogTag, Self::Error>> + Send + '_;

  /// Remove an association. Idempotent.
  fn detach(
    &self,
    catalog_search_uuid: Uuid,
    tag_uuid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Atomically replace the YAML-sourced tags of an entry with `tag_uuids`.
  /// Manual associations are untouched; on failure the previous YAML set
  /// remains.
  fn replace_yaml_tags(
    &self,
    catalog_search_uuid: Uuid,
    tag_uuids: Vec<Uuid>,
  ) -> impl Future<Output = Result<Vec<CatalogTag>, Self::Error>> + Send + '_;

  /// All tags of an entry, oldest first.
  fn list_tags(
    &self,
    catalog_search_uuid: Uuid,
  ) -> impl Future<Output = Result<Vec<CatalogTag>, Self::Error>> + Send + '_;

  // ── Metrics tree ──────────────────────────────────────────────────────

  /// Insert the directed edge `source → target`. Fails with a conflict on a
  /// duplicate ordered pair.
  fn add_edge(
    &self,
    source_metric_uuid: Uuid,
    target_metric_uuid: Uuid,
    created_by_user_uuid: Option<Uuid>,
  ) -> impl Future<Output = Result<MetricsTreeEdge, Self::Error>> + Send + '_;

  /// Delete the exact ordered pair. Idempotent.
  fn remove_edge(
    &self,
    source_metric_uuid: Uuid,
    target_metric_uuid: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every edge between metrics of the project, in no particular order.
  fn edges_for_project(
    &self,
    project_uuid: Uuid,
  ) -> impl Future<Output = Result<Vec<MetricsTreeEdge>, Self::Error>> + Send + '_;
}
