//! Encoding and decoding helpers between catalog domain types and the
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase strings.
//! `required_attributes` and `icon` are compact JSON. Vectors are stored
//! verbatim and never inspected.

use catalog_core::{
  edge::MetricsTreeEdge,
  entry::{
    CatalogEntry, CatalogItemIcon, EntryKind, NewCatalogEntry, RequiredAttributes,
    ScalarUpdate,
  },
  tag::CatalogTag,
};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

/// Unrestricted entries store `NULL` rather than `{}`.
pub fn encode_required_attributes(attrs: &RequiredAttributes) -> Result<Option<String>> {
  if attrs.is_unrestricted() {
    return Ok(None);
  }
  Ok(Some(serde_json::to_string(attrs)?))
}

pub fn decode_required_attributes(s: Option<&str>) -> Result<RequiredAttributes> {
  match s {
    Some(json) => Ok(serde_json::from_str(json)?),
    None => Ok(RequiredAttributes::default()),
  }
}

pub fn encode_icon(icon: Option<&CatalogItemIcon>) -> Result<Option<String>> {
  Ok(icon.map(serde_json::to_string).transpose()?)
}

pub fn decode_icon(s: Option<&str>) -> Result<Option<CatalogItemIcon>> {
  Ok(s.map(serde_json::from_str).transpose()?)
}

// ─── Scalar updates ──────────────────────────────────────────────────────────

/// The value written to the update's column.
pub fn encode_scalar_update(update: ScalarUpdate) -> Result<Value> {
  Ok(match update {
    ScalarUpdate::EmbeddingVector(bytes) => bytes.map_or(Value::Null, Value::Blob),
    ScalarUpdate::ChartUsage(usage) => {
      usage.map_or(Value::Null, |n| Value::Integer(i64::from(n)))
    }
    ScalarUpdate::Icon(icon) => {
      encode_icon(icon.as_ref())?.map_or(Value::Null, Value::Text)
    }
    ScalarUpdate::TableName(name) => Value::Text(name),
  })
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Column list shared by every `catalog_search` read; order matches
/// [`RawEntry::from_row`].
pub const ENTRY_COLUMNS: &str = "catalog_search_uuid, cached_explore_uuid, project_uuid, \
   name, label, description, type, search_vector, embedding_vector, field_type, \
   required_attributes, chart_usage, icon, table_name, spotlight_show";

/// Assign identity to a validated input row.
pub fn build_entry(project_uuid: Uuid, input: NewCatalogEntry) -> CatalogEntry {
  CatalogEntry {
    catalog_search_uuid: Uuid::new_v4(),
    cached_explore_uuid: input.cached_explore_uuid,
    project_uuid,
    name: input.name,
    label: input.label,
    description: input.description,
    kind: input.kind,
    search_vector: input.search_vector,
    embedding_vector: input.embedding_vector,
    required_attributes: input.required_attributes,
    chart_usage: input.chart_usage,
    icon: None,
    table_name: input.table_name,
    spotlight_show: input.spotlight_show,
  }
}

/// An entry flattened into owned column values, ready to move onto the
/// connection thread.
pub struct EncodedEntry {
  pub catalog_search_uuid: String,
  pub cached_explore_uuid: String,
  pub project_uuid:        String,
  pub name:                String,
  pub label:               Option<String>,
  pub description:         Option<String>,
  pub catalog_type:        &'static str,
  pub search_vector:       String,
  pub embedding_vector:    Option<Vec<u8>>,
  pub field_type:          Option<&'static str>,
  pub required_attributes: Option<String>,
  pub chart_usage:         Option<i64>,
  pub icon:                Option<String>,
  pub table_name:          String,
  pub spotlight_show:      bool,
}

impl EncodedEntry {
  pub fn encode(entry: &CatalogEntry) -> Result<Self> {
    Ok(Self {
      catalog_search_uuid: encode_uuid(entry.catalog_search_uuid),
      cached_explore_uuid: encode_uuid(entry.cached_explore_uuid),
      project_uuid:        encode_uuid(entry.project_uuid),
      name:                entry.name.clone(),
      label:               entry.label.clone(),
      description:         entry.description.clone(),
      catalog_type:        entry.kind.catalog_type().discriminant(),
      search_vector:       entry.search_vector.clone(),
      embedding_vector:    entry.embedding_vector.clone(),
      field_type:          entry.kind.field_type().map(|f| f.discriminant()),
      required_attributes: encode_required_attributes(&entry.required_attributes)?,
      chart_usage:         entry.chart_usage.map(i64::from),
      icon:                encode_icon(entry.icon.as_ref())?,
      table_name:          entry.table_name.clone(),
      spotlight_show:      entry.spotlight_show,
    })
  }

  /// The `(type, table_name, name)` granularity key within the project.
  pub fn granularity(&self) -> (String, String, String) {
    (
      self.catalog_type.to_owned(),
      self.table_name.clone(),
      self.name.clone(),
    )
  }

  pub fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    conn.execute(
      "INSERT INTO catalog_search (
         catalog_search_uuid, cached_explore_uuid, project_uuid, name, label,
         description, type, search_vector, embedding_vector, field_type,
         required_attributes, chart_usage, icon, table_name, spotlight_show
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
      rusqlite::params![
        self.catalog_search_uuid,
        self.cached_explore_uuid,
        self.project_uuid,
        self.name,
        self.label,
        self.description,
        self.catalog_type,
        self.search_vector,
        self.embedding_vector,
        self.field_type,
        self.required_attributes,
        self.chart_usage,
        self.icon,
        self.table_name,
        self.spotlight_show,
      ],
    )
  }
}

/// Raw values read directly from a `catalog_search` row.
pub struct RawEntry {
  pub catalog_search_uuid: String,
  pub cached_explore_uuid: String,
  pub project_uuid:        String,
  pub name:                String,
  pub label:               Option<String>,
  pub description:         Option<String>,
  pub catalog_type:        String,
  pub search_vector:       String,
  pub embedding_vector:    Option<Vec<u8>>,
  pub field_type:          Option<String>,
  pub required_attributes: Option<String>,
  pub chart_usage:         Option<i64>,
  pub icon:                Option<String>,
  pub table_name:          String,
  pub spotlight_show:      bool,
}

impl RawEntry {
  /// Read a row selected with [`ENTRY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      catalog_search_uuid: row.get(0)?,
      cached_explore_uuid: row.get(1)?,
      project_uuid:        row.get(2)?,
      name:                row.get(3)?,
      label:               row.get(4)?,
      description:         row.get(5)?,
      catalog_type:        row.get(6)?,
      search_vector:       row.get(7)?,
      embedding_vector:    row.get(8)?,
      field_type:          row.get(9)?,
      required_attributes: row.get(10)?,
      chart_usage:         row.get(11)?,
      icon:                row.get(12)?,
      table_name:          row.get(13)?,
      spotlight_show:      row.get(14)?,
    })
  }

  pub fn into_entry(self) -> Result<CatalogEntry> {
    let chart_usage = self
      .chart_usage
      .map(u32::try_from)
      .transpose()
      .map_err(|e| Error::Decode {
        column: "chart_usage",
        reason: e.to_string(),
      })?;

    Ok(CatalogEntry {
      catalog_search_uuid: decode_uuid(&self.catalog_search_uuid)?,
      cached_explore_uuid: decode_uuid(&self.cached_explore_uuid)?,
      project_uuid:        decode_uuid(&self.project_uuid)?,
      name:                self.name,
      label:               self.label,
      description:         self.description,
      kind:                EntryKind::from_parts(
        &self.catalog_type,
        self.field_type.as_deref(),
      )?,
      search_vector:       self.search_vector,
      embedding_vector:    self.embedding_vector,
      required_attributes: decode_required_attributes(
        self.required_attributes.as_deref(),
      )?,
      chart_usage,
      icon:                decode_icon(self.icon.as_deref())?,
      table_name:          self.table_name,
      spotlight_show:      self.spotlight_show,
    })
  }
}

// ─── Tags ────────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `catalog_search_tags` row.
pub struct RawTag {
  pub catalog_search_uuid:  String,
  pub tag_uuid:             String,
  pub created_at:           String,
  pub created_by_user_uuid: Option<String>,
  pub is_from_yaml:         bool,
}

impl RawTag {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      catalog_search_uuid:  row.get(0)?,
      tag_uuid:             row.get(1)?,
      created_at:           row.get(2)?,
      created_by_user_uuid: row.get(3)?,
      is_from_yaml:         row.get(4)?,
    })
  }

  pub fn into_tag(self) -> Result<CatalogTag> {
    Ok(CatalogTag {
      catalog_search_uuid:  decode_uuid(&self.catalog_search_uuid)?,
      tag_uuid:             decode_uuid(&self.tag_uuid)?,
      created_at:           decode_dt(&self.created_at)?,
      created_by_user_uuid: decode_opt_uuid(self.created_by_user_uuid.as_deref())?,
      is_from_yaml:         self.is_from_yaml,
    })
  }
}

// ─── Edges ───────────────────────────────────────────────────────────────────

/// Raw strings read directly from a `metrics_tree_edges` row.
pub struct RawEdge {
  pub source:               String,
  pub target:               String,
  pub created_at:           String,
  pub created_by_user_uuid: Option<String>,
}

impl RawEdge {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source:               row.get(0)?,
      target:               row.get(1)?,
      created_at:           row.get(2)?,
      created_by_user_uuid: row.get(3)?,
    })
  }

  pub fn into_edge(self) -> Result<MetricsTreeEdge> {
    Ok(MetricsTreeEdge {
      source_metric_uuid:   decode_uuid(&self.source)?,
      target_metric_uuid:   decode_uuid(&self.target)?,
      created_at:           decode_dt(&self.created_at)?,
      created_by_user_uuid: decode_opt_uuid(self.created_by_user_uuid.as_deref())?,
    })
  }
}
