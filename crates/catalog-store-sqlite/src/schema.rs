//! SQL schema for the catalog SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS catalog_search (
    catalog_search_uuid TEXT PRIMARY KEY,
    cached_explore_uuid TEXT NOT NULL,
    project_uuid        TEXT NOT NULL,
    name                TEXT NOT NULL,
    label               TEXT,
    description         TEXT,
    type                TEXT NOT NULL CHECK (type IN ('table', 'field')),
    search_vector       TEXT NOT NULL DEFAULT '',  -- opaque, caller-supplied
    embedding_vector    BLOB,                      -- opaque, caller-supplied
    field_type          TEXT,                      -- 'metric' | 'dimension'; fields only
    required_attributes TEXT,                      -- JSON object or NULL
    chart_usage         INTEGER CHECK (chart_usage >= 0),
    icon                TEXT,                      -- JSON-encoded CatalogItemIcon or NULL
    table_name          TEXT NOT NULL,
    spotlight_show      INTEGER NOT NULL DEFAULT 1
);

-- One row per granularity within a project. A field's table_name is not a
-- foreign key: the indexing pipeline is only eventually consistent.
CREATE UNIQUE INDEX IF NOT EXISTS catalog_search_granularity_idx
    ON catalog_search(project_uuid, type, table_name, name);
CREATE INDEX IF NOT EXISTS catalog_search_project_name_idx
    ON catalog_search(project_uuid, name);
CREATE INDEX IF NOT EXISTS catalog_search_type_idx
    ON catalog_search(type);

CREATE TABLE IF NOT EXISTS catalog_search_tags (
    catalog_search_uuid  TEXT NOT NULL
        REFERENCES catalog_search(catalog_search_uuid) ON DELETE CASCADE,
    tag_uuid             TEXT NOT NULL,
    created_at           TEXT NOT NULL,   -- ISO 8601 UTC; server-assigned
    created_by_user_uuid TEXT,
    is_from_yaml         INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (catalog_search_uuid, tag_uuid)
);

CREATE TABLE IF NOT EXISTS metrics_tree_edges (
    source_metric_catalog_search_uuid TEXT NOT NULL
        REFERENCES catalog_search(catalog_search_uuid) ON DELETE CASCADE,
    target_metric_catalog_search_uuid TEXT NOT NULL
        REFERENCES catalog_search(catalog_search_uuid) ON DELETE CASCADE,
    created_at                        TEXT NOT NULL,
    created_by_user_uuid              TEXT,
    PRIMARY KEY (source_metric_catalog_search_uuid, target_metric_catalog_search_uuid)
);

CREATE INDEX IF NOT EXISTS metrics_tree_edges_target_idx
    ON metrics_tree_edges(target_metric_catalog_search_uuid);

PRAGMA user_version = 1;
";
