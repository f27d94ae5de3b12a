//! Catalog entries — one indexed table or field of a project's explores.
//!
//! Storage keeps a single flat row per entry. At the API boundary the
//! table/field distinction is a tagged variant ([`EntryKind`]) so that
//! field-only attributes cannot be attached to a table by construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, property::CatalogColumn};

// ─── Discriminants ───────────────────────────────────────────────────────────

/// The `type` column: the granularity of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogType {
  Table,
  Field,
}

impl CatalogType {
  /// The discriminant string stored in the `type` column.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Table => "table",
      Self::Field => "field",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "table" => Ok(Self::Table),
      "field" => Ok(Self::Field),
      other => Err(Error::UnknownCatalogType(other.to_owned())),
    }
  }
}

/// Whether a field aggregates (metric) or groups (dimension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
  Metric,
  Dimension,
}

impl FieldType {
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Metric => "metric",
      Self::Dimension => "dimension",
    }
  }

  pub fn from_discriminant(s: &str) -> Result<Self> {
    match s {
      "metric" => Ok(Self::Metric),
      "dimension" => Ok(Self::Dimension),
      other => Err(Error::UnknownFieldType(other.to_owned())),
    }
  }
}

/// Table or field, carrying the attributes that only exist for fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryKind {
  Table,
  Field { field_type: FieldType },
}

impl EntryKind {
  pub fn catalog_type(self) -> CatalogType {
    match self {
      Self::Table => CatalogType::Table,
      Self::Field { .. } => CatalogType::Field,
    }
  }

  pub fn field_type(self) -> Option<FieldType> {
    match self {
      Self::Table => None,
      Self::Field { field_type } => Some(field_type),
    }
  }

  /// Rebuild the variant from the flat `type` and `field_type` columns.
  ///
  /// A field row without a field type violates the cross-field invariant and
  /// is rejected; a table row's `field_type` is ignored.
  pub fn from_parts(catalog_type: &str, field_type: Option<&str>) -> Result<Self> {
    match CatalogType::from_discriminant(catalog_type)? {
      CatalogType::Table => Ok(Self::Table),
      CatalogType::Field => {
        let field_type = field_type.ok_or_else(|| {
          Error::InvalidEntry("field entry is missing its field type".into())
        })?;
        Ok(Self::Field { field_type: FieldType::from_discriminant(field_type)? })
      }
    }
  }
}

// ─── Icon ────────────────────────────────────────────────────────────────────

/// Display icon chosen in the UI. Stored as JSON in the `icon` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogItemIcon {
  /// A single emoji, e.g. `"📈"`.
  Unicode(String),
  /// A custom image.
  Url(String),
}

// ─── Required attributes ─────────────────────────────────────────────────────

/// The value an attribute must hold: one exact value, or any of a set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
  One(String),
  AnyOf(Vec<String>),
}

/// Access-control predicate data read by the permission evaluator. Opaque to
/// this crate; an empty map means the entry is unrestricted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequiredAttributes(pub BTreeMap<String, AttributeValue>);

impl RequiredAttributes {
  pub fn is_unrestricted(&self) -> bool { self.0.is_empty() }

  pub fn insert(
    &mut self,
    attribute: impl Into<String>,
    value: AttributeValue,
  ) -> Option<AttributeValue> {
    self.0.insert(attribute.into(), value)
  }
}

// ─── CatalogEntry ────────────────────────────────────────────────────────────

/// A persisted `catalog_search` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
  /// Generated on insert; never changes.
  pub catalog_search_uuid: Uuid,
  /// The cached explore this row was extracted from. A freshness pointer,
  /// not an owner.
  pub cached_explore_uuid: Uuid,
  pub project_uuid:        Uuid,
  pub name:                String,
  pub label:               Option<String>,
  pub description:         Option<String>,
  #[serde(flatten)]
  pub kind:                EntryKind,
  pub search_vector:       String,
  pub embedding_vector:    Option<Vec<u8>>,
  pub required_attributes: RequiredAttributes,
  pub chart_usage:         Option<u32>,
  pub icon:                Option<CatalogItemIcon>,
  /// Owning table; equals `name` for table rows.
  pub table_name:          String,
  pub spotlight_show:      bool,
}

impl CatalogEntry {
  pub fn catalog_type(&self) -> CatalogType { self.kind.catalog_type() }

  /// Metrics are the only entries allowed in the metrics tree.
  pub fn is_metric(&self) -> bool {
    self.kind.field_type() == Some(FieldType::Metric)
  }
}

// ─── NewCatalogEntry ─────────────────────────────────────────────────────────

fn default_true() -> bool { true }

/// Input to [`crate::store::CatalogStore::insert_many`].
///
/// `catalog_search_uuid` is generated by the store and `project_uuid` is
/// supplied per batch; neither is accepted here. Icons are set afterwards via
/// [`ScalarUpdate::Icon`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogEntry {
  pub cached_explore_uuid: Uuid,
  pub name:                String,
  #[serde(default)]
  pub label:               Option<String>,
  #[serde(default)]
  pub description:         Option<String>,
  #[serde(flatten)]
  pub kind:                EntryKind,
  #[serde(default)]
  pub search_vector:       String,
  #[serde(default)]
  pub embedding_vector:    Option<Vec<u8>>,
  #[serde(default)]
  pub required_attributes: RequiredAttributes,
  #[serde(default)]
  pub chart_usage:         Option<u32>,
  pub table_name:          String,
  #[serde(default = "default_true")]
  pub spotlight_show:      bool,
}

/// Lowercase, trimmed form used for the `name` column.
pub fn normalize_name(name: &str) -> String { name.trim().to_lowercase() }

impl NewCatalogEntry {
  /// A table entry; its `table_name` is its own name.
  pub fn table(cached_explore_uuid: Uuid, name: &str) -> Self {
    let name = normalize_name(name);
    Self::with_kind(cached_explore_uuid, name.clone(), name, EntryKind::Table)
  }

  /// A field entry owned by `table_name`, normalized like the table's name.
  pub fn field(
    cached_explore_uuid: Uuid,
    table_name: &str,
    name: &str,
    field_type: FieldType,
  ) -> Self {
    Self::with_kind(
      cached_explore_uuid,
      normalize_name(name),
      normalize_name(table_name),
      EntryKind::Field { field_type },
    )
  }

  fn with_kind(
    cached_explore_uuid: Uuid,
    name: String,
    table_name: String,
    kind: EntryKind,
  ) -> Self {
    Self {
      cached_explore_uuid,
      name,
      label: None,
      description: None,
      kind,
      search_vector: String::new(),
      embedding_vector: None,
      required_attributes: RequiredAttributes::default(),
      chart_usage: None,
      table_name,
      spotlight_show: true,
    }
  }

  /// Check the invariants that the storage schema cannot express.
  pub fn validate(&self) -> Result<()> {
    if self.name.is_empty() {
      return Err(Error::InvalidEntry("name must not be empty".into()));
    }
    if self.name != normalize_name(&self.name) {
      return Err(Error::InvalidEntry(format!(
        "name {:?} is not normalized",
        self.name
      )));
    }
    if self.table_name.trim().is_empty() {
      return Err(Error::InvalidEntry(format!(
        "entry {:?} has no table name",
        self.name
      )));
    }
    // Fields join their table on this column.
    if self.table_name != normalize_name(&self.table_name) {
      return Err(Error::InvalidEntry(format!(
        "table name {:?} is not normalized",
        self.table_name
      )));
    }
    Ok(())
  }
}

// ─── Scalar updates ──────────────────────────────────────────────────────────

/// A single-column update applied after creation. Each variant writes exactly
/// one column, so updates to different variants never overwrite each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum ScalarUpdate {
  EmbeddingVector(Option<Vec<u8>>),
  ChartUsage(Option<u32>),
  Icon(Option<CatalogItemIcon>),
  TableName(String),
}

impl ScalarUpdate {
  /// The only column this update touches.
  pub fn column(&self) -> CatalogColumn {
    match self {
      Self::EmbeddingVector(_) => CatalogColumn::EmbeddingVector,
      Self::ChartUsage(_) => CatalogColumn::ChartUsage,
      Self::Icon(_) => CatalogColumn::Icon,
      Self::TableName(_) => CatalogColumn::TableName,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_without_field_type_is_rejected() {
    let err = EntryKind::from_parts("field", None).unwrap_err();
    assert!(matches!(err, Error::InvalidEntry(_)));
  }

  #[test]
  fn table_ignores_field_type() {
    let kind = EntryKind::from_parts("table", Some("metric")).unwrap();
    assert_eq!(kind, EntryKind::Table);
    assert_eq!(kind.field_type(), None);
  }

  #[test]
  fn unknown_type_discriminant_is_rejected() {
    let err = EntryKind::from_parts("view", None).unwrap_err();
    assert!(matches!(err, Error::UnknownCatalogType(ref s) if s == "view"));
  }

  #[test]
  fn constructors_normalize_names() {
    let id = Uuid::new_v4();
    let table = NewCatalogEntry::table(id, " Orders ");
    assert_eq!(table.name, "orders");
    assert_eq!(table.table_name, "orders");
    assert!(table.spotlight_show);
    table.validate().unwrap();

    let field = NewCatalogEntry::field(id, "orders", "Orders.Total", FieldType::Metric);
    assert_eq!(field.name, "orders.total");
    assert_eq!(field.kind.catalog_type(), CatalogType::Field);
    field.validate().unwrap();
  }

  #[test]
  fn validate_rejects_unnormalized_and_empty() {
    let id = Uuid::new_v4();
    let mut entry = NewCatalogEntry::table(id, "orders");
    entry.name = "Orders".into();
    assert!(matches!(entry.validate(), Err(Error::InvalidEntry(_))));

    entry.name = String::new();
    assert!(matches!(entry.validate(), Err(Error::InvalidEntry(_))));

    let mut field = NewCatalogEntry::field(id, "orders", "total", FieldType::Dimension);
    field.table_name = "  ".into();
    assert!(matches!(field.validate(), Err(Error::InvalidEntry(_))));

    field.table_name = "Orders".into();
    assert!(matches!(field.validate(), Err(Error::InvalidEntry(_))));
  }

  #[test]
  fn field_table_name_matches_its_table() {
    let id = Uuid::new_v4();
    let table = NewCatalogEntry::table(id, "Orders");
    let field = NewCatalogEntry::field(id, " Orders", "orders.total", FieldType::Metric);
    assert_eq!(field.table_name, table.table_name);
    field.validate().unwrap();
  }

  #[test]
  fn new_entry_deserializes_with_defaults() {
    let json = serde_json::json!({
      "cached_explore_uuid": Uuid::nil(),
      "name": "orders.total",
      "type": "field",
      "field_type": "metric",
      "table_name": "orders",
      "required_attributes": { "region": ["emea", "apac"], "tier": "gold" }
    });
    let entry: NewCatalogEntry = serde_json::from_value(json).unwrap();
    assert_eq!(entry.kind, EntryKind::Field { field_type: FieldType::Metric });
    assert!(entry.spotlight_show);
    assert_eq!(entry.chart_usage, None);
    assert_eq!(
      entry.required_attributes.0.get("tier"),
      Some(&AttributeValue::One("gold".into()))
    );
    assert!(!entry.required_attributes.is_unrestricted());
  }

  #[test]
  fn icon_serializes_as_keyed_object() {
    let icon = CatalogItemIcon::Unicode("📈".into());
    assert_eq!(serde_json::to_string(&icon).unwrap(), r#"{"unicode":"📈"}"#);
  }

  #[test]
  fn scalar_updates_touch_one_column() {
    assert_eq!(ScalarUpdate::ChartUsage(Some(5)).column(), CatalogColumn::ChartUsage);
    assert_eq!(ScalarUpdate::Icon(None).column(), CatalogColumn::Icon);
    assert_eq!(
      ScalarUpdate::TableName("orders".into()).column().as_str(),
      "table_name"
    );
  }
}
