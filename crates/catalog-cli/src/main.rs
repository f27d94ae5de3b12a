//! `catalog` — operator tool for the warehouse catalog store.
//!
//! # Usage
//!
//! ```text
//! catalog column tableLabel
//! catalog reindex --project <uuid> batch.json
//! catalog find --project <uuid> --property type --value field
//! catalog update <entry-uuid> '{"field":"chart_usage","value":5}'
//! catalog yaml-tags <entry-uuid> <tag-uuid>...
//! catalog edges --project <uuid>
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use catalog_core::{
  entry::{NewCatalogEntry, ScalarUpdate},
  property::{CatalogProperty, column_for},
  store::{CatalogStore, PropertyValue},
};
use catalog_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use settings::CatalogConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "catalog", author, version, about = "Warehouse catalog store tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "catalog.toml", env = "CATALOG_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Print the storage column behind a logical catalog property.
  Column { property: String },

  /// Atomically replace entries of a project from a JSON batch file.
  Reindex {
    #[arg(long)]
    project: Uuid,
    /// JSON file shaped like `{"remove": [...names], "entries": [...]}`.
    file:    PathBuf,
  },

  /// List entries whose property equals a value (`NULL` when omitted).
  Find {
    #[arg(long)]
    project:  Uuid,
    #[arg(long)]
    property: String,
    #[arg(long)]
    value:    Option<String>,
  },

  /// Apply a single-column update, e.g. `{"field":"chart_usage","value":5}`.
  Update { id: Uuid, update: String },

  /// Replace the YAML-sourced tags of an entry.
  YamlTags { id: Uuid, tags: Vec<Uuid> },

  /// Dump the metrics tree of a project.
  Edges {
    #[arg(long)]
    project: Uuid,
  },

  /// List fields whose owning table is not indexed.
  Orphans {
    #[arg(long)]
    project: Uuid,
  },
}

/// Shape of a re-index batch file.
#[derive(Deserialize)]
struct ReindexBatch {
  #[serde(default)]
  remove:  Vec<String>,
  entries: Vec<NewCatalogEntry>,
}

/// Integers compare as integers, everything else as text.
fn parse_value(raw: Option<String>) -> PropertyValue {
  match raw {
    None => PropertyValue::Null,
    Some(s) => s
      .parse::<i64>()
      .map(PropertyValue::Integer)
      .unwrap_or(PropertyValue::Text(s)),
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    // Property lookups need no store.
    Command::Column { property } => {
      println!("{}", column_for(&property)?);
    }
    Command::Reindex { project, file } => {
      let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading batch file {}", file.display()))?;
      let batch: ReindexBatch =
        serde_json::from_str(&raw).context("parsing batch file")?;
      let store = open_store(&cli.config).await?;
      let summary = store.reindex(project, batch.remove, batch.entries).await?;
      print_json(&summary)?;
    }
    Command::Find { project, property, value } => {
      let property = CatalogProperty::from_name(&property)?;
      let store = open_store(&cli.config).await?;
      let entries = store
        .find_by_property(project, property, parse_value(value))
        .await?;
      print_json(&entries)?;
    }
    Command::Update { id, update } => {
      let update: ScalarUpdate =
        serde_json::from_str(&update).context("parsing scalar update")?;
      open_store(&cli.config)
        .await?
        .update_scalar_field(id, update)
        .await?;
    }
    Command::YamlTags { id, tags } => {
      let applied = open_store(&cli.config)
        .await?
        .replace_yaml_tags(id, tags)
        .await?;
      print_json(&applied)?;
    }
    Command::Edges { project } => {
      let store = open_store(&cli.config).await?;
      print_json(&store.edges_for_project(project).await?)?;
    }
    Command::Orphans { project } => {
      let store = open_store(&cli.config).await?;
      print_json(&store.orphaned_fields(project).await?)?;
    }
  }

  Ok(())
}

/// Load configuration and open the SQLite store it points at.
async fn open_store(config_path: &Path) -> Result<SqliteStore> {
  let cfg = CatalogConfig::load(config_path)?;
  let store_path = cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  store.set_busy_timeout(cfg.busy_timeout()).await?;
  tracing::debug!(?store_path, "opened catalog store");
  Ok(store)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn values_parse_as_integer_text_or_null() {
    assert_eq!(parse_value(None), PropertyValue::Null);
    assert_eq!(parse_value(Some("5".into())), PropertyValue::Integer(5));
    assert_eq!(
      parse_value(Some("orders".into())),
      PropertyValue::Text("orders".into())
    );
  }

  #[test]
  fn batch_file_defaults_to_no_removals() {
    let batch: ReindexBatch = serde_json::from_str(
      r#"{"entries": [{
        "cached_explore_uuid": "00000000-0000-0000-0000-000000000000",
        "name": "orders", "type": "table", "table_name": "orders"
      }]}"#,
    )
    .unwrap();
    assert!(batch.remove.is_empty());
    assert_eq!(batch.entries.len(), 1);
  }

  #[test]
  fn cli_parses_find() {
    let cli = Cli::try_parse_from([
      "catalog",
      "find",
      "--project",
      "00000000-0000-0000-0000-000000000000",
      "--property",
      "tableLabel",
      "--value",
      "orders",
    ])
    .unwrap();
    assert!(matches!(cli.command, Command::Find { ref property, .. } if property == "tableLabel"));
  }
}
