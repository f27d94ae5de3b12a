//! Delete-then-reinsert refresh of catalog entries in one transaction.
//!
//! Replacement rows get fresh ids, so everything keyed on the old ids is
//! snapshotted first and re-pointed at the new row with the same
//! `(type, table_name, name)`. Anything without a replacement is dropped with
//! its row by the cascading deletes.

use std::collections::{BTreeSet, HashMap, HashSet};

use catalog_core::store::ReindexSummary;
use rusqlite::TransactionBehavior;

use crate::encode::EncodedEntry;

type Granularity = (String, String, String);

struct OldRow {
  uuid: String,
  key:  Granularity,
  icon: Option<String>,
}

struct OldTag {
  catalog_search_uuid:  String,
  tag_uuid:             String,
  created_at:           String,
  created_by_user_uuid: Option<String>,
  is_from_yaml:         bool,
}

struct OldEdge {
  source:               String,
  target:               String,
  created_at:           String,
  created_by_user_uuid: Option<String>,
}

pub fn reindex(
  conn: &mut rusqlite::Connection,
  project_uuid: &str,
  names: &[String],
  rows: &[EncodedEntry],
) -> rusqlite::Result<ReindexSummary> {
  // IMMEDIATE takes the write lock up front so the snapshot below cannot go
  // stale before the deletes run.
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

  // A repeated name would snapshot the same rows twice.
  let names: BTreeSet<&str> = names.iter().map(String::as_str).collect();

  // ── Snapshot state keyed on the rows about to be removed ─────────────────
  let mut old_rows = Vec::new();
  {
    let mut stmt = tx.prepare(
      "SELECT catalog_search_uuid, type, table_name, name, icon
       FROM catalog_search
       WHERE project_uuid = ?1 AND name = ?2",
    )?;
    for &name in &names {
      let found = stmt
        .query_map(rusqlite::params![project_uuid, name], |row| {
          Ok(OldRow {
            uuid: row.get(0)?,
            key:  (row.get(1)?, row.get(2)?, row.get(3)?),
            icon: row.get(4)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      old_rows.extend(found);
    }
  }

  let mut old_tags = Vec::new();
  let mut old_edges = Vec::new();
  {
    let mut tags_stmt = tx.prepare(
      "SELECT catalog_search_uuid, tag_uuid, created_at, created_by_user_uuid, is_from_yaml
       FROM catalog_search_tags
       WHERE catalog_search_uuid = ?1",
    )?;
    let mut edges_stmt = tx.prepare(
      "SELECT source_metric_catalog_search_uuid, target_metric_catalog_search_uuid,
              created_at, created_by_user_uuid
       FROM metrics_tree_edges
       WHERE source_metric_catalog_search_uuid = ?1
          OR target_metric_catalog_search_uuid = ?1",
    )?;
    let mut seen_edges = HashSet::new();

    for old in &old_rows {
      let tags = tags_stmt
        .query_map(rusqlite::params![old.uuid], |row| {
          Ok(OldTag {
            catalog_search_uuid:  row.get(0)?,
            tag_uuid:             row.get(1)?,
            created_at:           row.get(2)?,
            created_by_user_uuid: row.get(3)?,
            is_from_yaml:         row.get(4)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      old_tags.extend(tags);

      let edges = edges_stmt
        .query_map(rusqlite::params![old.uuid], |row| {
          Ok(OldEdge {
            source:               row.get(0)?,
            target:               row.get(1)?,
            created_at:           row.get(2)?,
            created_by_user_uuid: row.get(3)?,
          })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      for edge in edges {
        // An edge between two removed rows is returned for both endpoints.
        if seen_edges.insert((edge.source.clone(), edge.target.clone())) {
          old_edges.push(edge);
        }
      }
    }
  }

  // ── Delete, then insert ──────────────────────────────────────────────────
  let mut removed = 0;
  for &name in &names {
    removed += tx.execute(
      "DELETE FROM catalog_search WHERE project_uuid = ?1 AND name = ?2",
      rusqlite::params![project_uuid, name],
    )?;
  }

  let mut replacement_by_key: HashMap<Granularity, &str> = HashMap::new();
  for row in rows {
    row.insert(&tx)?;
    replacement_by_key.insert(row.granularity(), &row.catalog_search_uuid);
  }

  let mut renamed: HashMap<&str, &str> = HashMap::new();
  let mut summary = ReindexSummary {
    removed,
    inserted: rows.len(),
    ..ReindexSummary::default()
  };

  for old in &old_rows {
    let Some(new_uuid) = replacement_by_key.get(&old.key).copied() else {
      continue;
    };
    renamed.insert(old.uuid.as_str(), new_uuid);

    if let Some(icon) = &old.icon {
      summary.migrated_icons += tx.execute(
        "UPDATE catalog_search SET icon = ?1 WHERE catalog_search_uuid = ?2",
        rusqlite::params![icon, new_uuid],
      )?;
    }
  }

  // ── Re-point tags and edges ──────────────────────────────────────────────
  for tag in &old_tags {
    let Some(new_uuid) = renamed.get(tag.catalog_search_uuid.as_str()) else {
      continue;
    };
    summary.migrated_tags += tx.execute(
      "INSERT INTO catalog_search_tags (
         catalog_search_uuid, tag_uuid, created_at, created_by_user_uuid, is_from_yaml
       ) VALUES (?1, ?2, ?3, ?4, ?5)
       ON CONFLICT (catalog_search_uuid, tag_uuid) DO NOTHING",
      rusqlite::params![
        new_uuid,
        tag.tag_uuid,
        tag.created_at,
        tag.created_by_user_uuid,
        tag.is_from_yaml,
      ],
    )?;
  }

  // Endpoints outside the removed set were not touched and keep their ids;
  // removed endpoints without a replacement drop the edge.
  let old_ids: HashSet<&str> = old_rows.iter().map(|r| r.uuid.as_str()).collect();
  let endpoint = |id: &str| -> Option<String> {
    if old_ids.contains(id) {
      renamed.get(id).map(|s| (*s).to_owned())
    } else {
      Some(id.to_owned())
    }
  };

  for edge in &old_edges {
    let (Some(source), Some(target)) = (endpoint(&edge.source), endpoint(&edge.target))
    else {
      continue;
    };
    summary.migrated_edges += tx.execute(
      "INSERT INTO metrics_tree_edges (
         source_metric_catalog_search_uuid, target_metric_catalog_search_uuid,
         created_at, created_by_user_uuid
       ) VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT DO NOTHING",
      rusqlite::params![source, target, edge.created_at, edge.created_by_user_uuid],
    )?;
  }

  tx.commit()?;
  Ok(summary)
}
