//! [`SqliteStore`] — the SQLite implementation of [`CatalogStore`].

use std::{collections::BTreeSet, path::Path, time::Duration};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use catalog_core::{
  edge::MetricsTreeEdge,
  entry::{CatalogEntry, NewCatalogEntry, ScalarUpdate},
  property::CatalogProperty,
  store::{CatalogStore, PropertyValue, ReindexSummary},
  tag::CatalogTag,
};

use crate::{
  encode::{
    ENTRY_COLUMNS, EncodedEntry, RawEdge, RawEntry, RawTag, build_entry, encode_dt,
    encode_scalar_update, encode_uuid,
  },
  reindex,
  schema::SCHEMA,
  Error, Result,
};

/// Outcome of a guarded write, decided on the connection thread.
enum Write {
  Applied,
  /// A referenced catalog entry does not exist.
  Missing(Uuid),
  /// The primary key already exists.
  Duplicate,
}

fn entry_exists(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM catalog_search WHERE catalog_search_uuid = ?1",
        rusqlite::params![id],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A catalog store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// How long a write waits for another connection's lock before failing.
  pub async fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Validate inputs and assign ids; nothing touches the database.
  fn prepare_entries(
    project_uuid: Uuid,
    entries: Vec<NewCatalogEntry>,
  ) -> Result<(Vec<CatalogEntry>, Vec<EncodedEntry>)> {
    for entry in &entries {
      entry.validate()?;
    }
    let built: Vec<CatalogEntry> = entries
      .into_iter()
      .map(|e| build_entry(project_uuid, e))
      .collect();
    let encoded = built
      .iter()
      .map(EncodedEntry::encode)
      .collect::<Result<Vec<_>>>()?;
    Ok((built, encoded))
  }

  async fn query_entries(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Vec<CatalogEntry>> {
    let raws: Vec<RawEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEntry::into_entry).collect()
  }
}

// ─── CatalogStore impl ───────────────────────────────────────────────────────

impl CatalogStore for SqliteStore {
  type Error = Error;

  // ── Catalog entries ───────────────────────────────────────────────────────

  async fn insert_many(
    &self,
    project_uuid: Uuid,
    entries: Vec<NewCatalogEntry>,
  ) -> Result<Vec<CatalogEntry>> {
    let (built, encoded) = Self::prepare_entries(project_uuid, entries)?;
    let count = encoded.len();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for row in &encoded {
          row.insert(&tx)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(Error::from_write)?;

    tracing::debug!(%project_uuid, count, "inserted catalog entries");
    Ok(built)
  }

  async fn remove_by_name(&self, project_uuid: Uuid, name: &str) -> Result<usize> {
    let project_str = encode_uuid(project_uuid);
    let name_owned = name.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM catalog_search WHERE project_uuid = ?1 AND name = ?2",
          rusqlite::params![project_str, name_owned],
        )?)
      })
      .await?;

    tracing::debug!(%project_uuid, name, removed, "removed catalog entries");
    Ok(removed)
  }

  async fn reindex(
    &self,
    project_uuid: Uuid,
    names: Vec<String>,
    entries: Vec<NewCatalogEntry>,
  ) -> Result<ReindexSummary> {
    let (_, encoded) = Self::prepare_entries(project_uuid, entries)?;
    let project_str = encode_uuid(project_uuid);

    let summary = self
      .conn
      .call(move |conn| Ok(reindex::reindex(conn, &project_str, &names, &encoded)?))
      .await
      .map_err(Error::from_write)?;

    tracing::info!(
      %project_uuid,
      removed = summary.removed,
      inserted = summary.inserted,
      migrated_tags = summary.migrated_tags,
      migrated_icons = summary.migrated_icons,
      migrated_edges = summary.migrated_edges,
      "reindexed catalog entries"
    );
    Ok(summary)
  }

  async fn update_scalar_field(
    &self,
    catalog_search_uuid: Uuid,
    update: ScalarUpdate,
  ) -> Result<()> {
    let column = update.column().as_str();
    let value = encode_scalar_update(update)?;
    let id_str = encode_uuid(catalog_search_uuid);

    // A single-column UPDATE: concurrent writes to other columns of the same
    // row are never overwritten.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          &format!("UPDATE catalog_search SET {column} = ?1 WHERE catalog_search_uuid = ?2"),
          rusqlite::params![value, id_str],
        )?)
      })
      .await
      .map_err(Error::from_write)?;

    if changed == 0 {
      return Err(Error::NotFound(catalog_search_uuid));
    }
    Ok(())
  }

  async fn get_entry(&self, catalog_search_uuid: Uuid) -> Result<Option<CatalogEntry>> {
    let id_str = encode_uuid(catalog_search_uuid);

    let raw: Option<RawEntry> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ENTRY_COLUMNS} FROM catalog_search WHERE catalog_search_uuid = ?1"
              ),
              rusqlite::params![id_str],
              RawEntry::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEntry::into_entry).transpose()
  }

  async fn find_by_property(
    &self,
    project_uuid: Uuid,
    property: CatalogProperty,
    value: PropertyValue,
  ) -> Result<Vec<CatalogEntry>> {
    let column = property.column()?.as_str();
    let value = match value {
      PropertyValue::Null => rusqlite::types::Value::Null,
      PropertyValue::Integer(n) => rusqlite::types::Value::Integer(n),
      PropertyValue::Text(s) => rusqlite::types::Value::Text(s),
    };

    // `IS` matches NULL as well as equal values.
    self
      .query_entries(
        format!(
          "SELECT {ENTRY_COLUMNS} FROM catalog_search
           WHERE project_uuid = ?1 AND {column} IS ?2
           ORDER BY table_name, name"
        ),
        vec![rusqlite::types::Value::Text(encode_uuid(project_uuid)), value],
      )
      .await
  }

  async fn orphaned_fields(&self, project_uuid: Uuid) -> Result<Vec<CatalogEntry>> {
    self
      .query_entries(
        format!(
          "SELECT {ENTRY_COLUMNS} FROM catalog_search f
           WHERE f.project_uuid = ?1
             AND f.type = 'field'
             AND NOT EXISTS (
               SELECT 1 FROM catalog_search t
               WHERE t.project_uuid = f.project_uuid
                 AND t.type = 'table'
                 AND t.table_name = f.table_name
             )
           ORDER BY f.table_name, f.name"
        ),
        vec![rusqlite::types::Value::Text(encode_uuid(project_uuid))],
      )
      .await
  }

  // ── Tags ──────────────────────────────────────────────────────────────────

  async fn attach(
    &self,
    catalog_search_uuid: Uuid,
    tag_uuid: Uuid,
    created_by_user_uuid: Option<Uuid>,
    is_from_yaml: bool,
  ) -> Result<CatalogTag> {
    let tag = CatalogTag {
      catalog_search_uuid,
      tag_uuid,
      created_at: Utc::now(),
      created_by_user_uuid,
      is_from_yaml,
    };

    let id_str  = encode_uuid(catalog_search_uuid);
    let tag_str = encode_uuid(tag_uuid);
    let at_str  = encode_dt(tag.created_at);
    let by_str  = created_by_user_uuid.map(encode_uuid);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !entry_exists(&tx, &id_str)? {
          return Ok(Write::Missing(catalog_search_uuid));
        }
        let inserted = tx.execute(
          "INSERT INTO catalog_search_tags (
             catalog_search_uuid, tag_uuid, created_at, created_by_user_uuid, is_from_yaml
           ) VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (catalog_search_uuid, tag_uuid) DO NOTHING",
          rusqlite::params![id_str, tag_str, at_str, by_str, is_from_yaml],
        )?;
        tx.commit()?;
        Ok(if inserted == 0 { Write::Duplicate } else { Write::Applied })
      })
      .await
      .map_err(Error::from_write)?;

    match outcome {
      Write::Applied => Ok(tag),
      Write::Missing(id) => Err(Error::NotFound(id)),
      Write::Duplicate => Err(Error::Conflict(format!(
        "tag {tag_uuid} is already attached to {catalog_search_uuid}"
      ))),
    }
  }

  async fn detach(&self, catalog_search_uuid: Uuid, tag_uuid: Uuid) -> Result<()> {
    let id_str  = encode_uuid(catalog_search_uuid);
    let tag_str = encode_uuid(tag_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM catalog_search_tags WHERE catalog_search_uuid = ?1 AND tag_uuid = ?2",
          rusqlite::params![id_str, tag_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn replace_yaml_tags(
    &self,
    catalog_search_uuid: Uuid,
    tag_uuids: Vec<Uuid>,
  ) -> Result<Vec<CatalogTag>> {
    let created_at = Utc::now();
    let id_str = encode_uuid(catalog_search_uuid);
    let at_str = encode_dt(created_at);
    let wanted: BTreeSet<Uuid> = tag_uuids.into_iter().collect();
    let wanted_strs: Vec<(Uuid, String)> =
      wanted.iter().map(|t| (*t, encode_uuid(*t))).collect();

    let (outcome, removed, applied) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !entry_exists(&tx, &id_str)? {
          return Ok((Write::Missing(catalog_search_uuid), 0, Vec::new()));
        }
        let removed = tx.execute(
          "DELETE FROM catalog_search_tags
           WHERE catalog_search_uuid = ?1 AND is_from_yaml = 1",
          rusqlite::params![id_str],
        )?;
        // A tag that is already attached manually stays manual.
        let mut applied = Vec::with_capacity(wanted_strs.len());
        for (tag_uuid, tag_str) in &wanted_strs {
          let inserted = tx.execute(
            "INSERT INTO catalog_search_tags (
               catalog_search_uuid, tag_uuid, created_at, created_by_user_uuid, is_from_yaml
             ) VALUES (?1, ?2, ?3, NULL, 1)
             ON CONFLICT (catalog_search_uuid, tag_uuid) DO NOTHING",
            rusqlite::params![id_str, tag_str, at_str],
          )?;
          if inserted > 0 {
            applied.push(*tag_uuid);
          }
        }
        tx.commit()?;
        Ok((Write::Applied, removed, applied))
      })
      .await
      .map_err(Error::from_write)?;

    if let Write::Missing(id) = outcome {
      return Err(Error::NotFound(id));
    }

    tracing::debug!(
      %catalog_search_uuid,
      removed,
      inserted = applied.len(),
      "replaced yaml tags"
    );

    Ok(
      applied
        .into_iter()
        .map(|tag_uuid| CatalogTag {
          catalog_search_uuid,
          tag_uuid,
          created_at,
          created_by_user_uuid: None,
          is_from_yaml: true,
        })
        .collect(),
    )
  }

  async fn list_tags(&self, catalog_search_uuid: Uuid) -> Result<Vec<CatalogTag>> {
    let id_str = encode_uuid(catalog_search_uuid);

    let raws: Vec<RawTag> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT catalog_search_uuid, tag_uuid, created_at, created_by_user_uuid, is_from_yaml
           FROM catalog_search_tags
           WHERE catalog_search_uuid = ?1
           ORDER BY created_at, tag_uuid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawTag::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTag::into_tag).collect()
  }

  // ── Metrics tree ──────────────────────────────────────────────────────────

  async fn add_edge(
    &self,
    source_metric_uuid: Uuid,
    target_metric_uuid: Uuid,
    created_by_user_uuid: Option<Uuid>,
  ) -> Result<MetricsTreeEdge> {
    if source_metric_uuid == target_metric_uuid {
      return Err(Error::SelfLoop(source_metric_uuid));
    }

    let edge = MetricsTreeEdge {
      source_metric_uuid,
      target_metric_uuid,
      created_at: Utc::now(),
      created_by_user_uuid,
    };

    let source_str = encode_uuid(source_metric_uuid);
    let target_str = encode_uuid(target_metric_uuid);
    let at_str     = encode_dt(edge.created_at);
    let by_str     = created_by_user_uuid.map(encode_uuid);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (id, id_str) in [
          (source_metric_uuid, &source_str),
          (target_metric_uuid, &target_str),
        ] {
          if !entry_exists(&tx, id_str)? {
            return Ok(Write::Missing(id));
          }
        }
        let inserted = tx.execute(
          "INSERT INTO metrics_tree_edges (
             source_metric_catalog_search_uuid, target_metric_catalog_search_uuid,
             created_at, created_by_user_uuid
           ) VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT DO NOTHING",
          rusqlite::params![source_str, target_str, at_str, by_str],
        )?;
        tx.commit()?;
        Ok(if inserted == 0 { Write::Duplicate } else { Write::Applied })
      })
      .await
      .map_err(Error::from_write)?;

    match outcome {
      Write::Applied => Ok(edge),
      Write::Missing(id) => Err(Error::NotFound(id)),
      Write::Duplicate => Err(Error::Conflict(format!(
        "edge {source_metric_uuid} -> {target_metric_uuid} already exists"
      ))),
    }
  }

  async fn remove_edge(
    &self,
    source_metric_uuid: Uuid,
    target_metric_uuid: Uuid,
  ) -> Result<()> {
    let source_str = encode_uuid(source_metric_uuid);
    let target_str = encode_uuid(target_metric_uuid);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM metrics_tree_edges
           WHERE source_metric_catalog_search_uuid = ?1
             AND target_metric_catalog_search_uuid = ?2",
          rusqlite::params![source_str, target_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn edges_for_project(&self, project_uuid: Uuid) -> Result<Vec<MetricsTreeEdge>> {
    let project_str = encode_uuid(project_uuid);

    let raws: Vec<RawEdge> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT e.source_metric_catalog_search_uuid, e.target_metric_catalog_search_uuid,
                  e.created_at, e.created_by_user_uuid
           FROM metrics_tree_edges e
           JOIN catalog_search s
             ON s.catalog_search_uuid = e.source_metric_catalog_search_uuid
           JOIN catalog_search t
             ON t.catalog_search_uuid = e.target_metric_catalog_search_uuid
           WHERE s.project_uuid = ?1 AND t.project_uuid = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![project_str], RawEdge::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEdge::into_edge).collect()
  }
}
