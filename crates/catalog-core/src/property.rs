//! Logical catalog properties and the columns that back them.
//!
//! Query builders receive property names from the catalog field and table
//! views. [`CatalogProperty::column`] is the single place that decides which
//! of those names are stored and under which column. The match has no
//! wildcard arm: a property added to the enum does not compile until it is
//! classified.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

/// Columns of the `catalog_search` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CatalogColumn {
  CatalogSearchUuid,
  CachedExploreUuid,
  ProjectUuid,
  Name,
  Label,
  Description,
  Type,
  SearchVector,
  EmbeddingVector,
  FieldType,
  RequiredAttributes,
  ChartUsage,
  Icon,
  TableName,
  SpotlightShow,
}

impl CatalogColumn {
  pub fn as_str(self) -> &'static str { self.into() }
}

/// Every property exposed by the catalog field and catalog table views.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "camelCase")]
pub enum CatalogProperty {
  // ── Persisted ─────────────────────────────────────────────────────────
  Name,
  Label,
  Description,
  Type,
  ChartUsage,
  RequiredAttributes,
  #[strum(to_string = "catalogSearchId", serialize = "catalogSearchUuid")]
  CatalogSearchId,
  Icon,
  TableLabel,

  // ── Derived at read time ──────────────────────────────────────────────
  Categories,
  Tags,
  FieldType,
  TableName,
  BasicType,
  TableGroupLabel,
  GroupLabel,
  Errors,
  JoinedTables,
}

impl CatalogProperty {
  /// Parse an external property name.
  ///
  /// Fails with [`Error::UnknownProperty`] for names outside the closed set.
  pub fn from_name(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownProperty(name.to_owned()))
  }

  /// The column storing this property, or [`Error::UnmappedProperty`] for
  /// properties that are computed and never persisted.
  pub fn column(self) -> Result<CatalogColumn> {
    match self {
      Self::Name => Ok(CatalogColumn::Name),
      Self::Label => Ok(CatalogColumn::Label),
      Self::Description => Ok(CatalogColumn::Description),
      Self::Type => Ok(CatalogColumn::Type),
      Self::ChartUsage => Ok(CatalogColumn::ChartUsage),
      Self::RequiredAttributes => Ok(CatalogColumn::RequiredAttributes),
      Self::CatalogSearchId => Ok(CatalogColumn::CatalogSearchUuid),
      Self::Icon => Ok(CatalogColumn::Icon),
      // The view's table label is the denormalized owning table name.
      Self::TableLabel => Ok(CatalogColumn::TableName),
      Self::Categories
      | Self::Tags
      | Self::FieldType
      | Self::TableName
      | Self::BasicType
      | Self::TableGroupLabel
      | Self::GroupLabel
      | Self::Errors
      | Self::JoinedTables => Err(Error::UnmappedProperty(self)),
    }
  }

  pub fn is_persisted(self) -> bool { self.column().is_ok() }
}

/// Resolve a property name straight to its column.
pub fn column_for(name: &str) -> Result<CatalogColumn> {
  CatalogProperty::from_name(name)?.column()
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  const MAPPED: &[(&str, &str)] = &[
    ("name", "name"),
    ("label", "label"),
    ("description", "description"),
    ("type", "type"),
    ("chartUsage", "chart_usage"),
    ("requiredAttributes", "required_attributes"),
    ("catalogSearchId", "catalog_search_uuid"),
    ("icon", "icon"),
    ("tableLabel", "table_name"),
  ];

  const UNMAPPED: &[&str] = &[
    "categories",
    "tags",
    "fieldType",
    "tableName",
    "basicType",
    "tableGroupLabel",
    "groupLabel",
    "errors",
    "joinedTables",
  ];

  #[test]
  fn mapped_properties_resolve_to_stable_columns() {
    for (property, column) in MAPPED {
      for _ in 0..3 {
        assert_eq!(column_for(property).unwrap().as_str(), *column, "{property}");
      }
    }
  }

  #[test]
  fn derived_properties_are_unmapped_not_unknown() {
    for property in UNMAPPED {
      let err = column_for(property).unwrap_err();
      assert!(
        matches!(err, Error::UnmappedProperty(p) if p.to_string() == *property),
        "{property}: {err}"
      );
    }
  }

  #[test]
  fn names_outside_the_set_are_unknown() {
    for name in ["bogus", "", "Name", "chart_usage", "table_name"] {
      let err = column_for(name).unwrap_err();
      assert!(matches!(err, Error::UnknownProperty(ref n) if n == name), "{name}");
    }
  }

  #[test]
  fn table_label_maps_to_table_name_column() {
    assert_eq!(column_for("tableLabel").unwrap(), CatalogColumn::TableName);
    assert!(matches!(
      column_for("categories"),
      Err(Error::UnmappedProperty(CatalogProperty::Categories))
    ));
    assert!(matches!(column_for("bogus"), Err(Error::UnknownProperty(_))));
  }

  #[test]
  fn catalog_search_uuid_is_accepted_as_alias() {
    let property = CatalogProperty::from_name("catalogSearchUuid").unwrap();
    assert_eq!(property, CatalogProperty::CatalogSearchId);
    assert_eq!(property.to_string(), "catalogSearchId");
  }

  #[test]
  fn every_property_is_classified_and_named_round_trip() {
    let known: Vec<_> = CatalogProperty::iter().collect();
    assert_eq!(known.len(), MAPPED.len() + UNMAPPED.len());
    for property in known {
      let name = property.to_string();
      assert_eq!(CatalogProperty::from_name(&name).unwrap(), property);
      let listed = MAPPED.iter().any(|(p, _)| *p == name) || UNMAPPED.contains(&name.as_str());
      assert!(listed, "{name} is not covered by the fixtures");
    }
  }

  #[test]
  fn mapped_columns_exist_in_the_table() {
    let columns: Vec<_> = CatalogColumn::iter().collect();
    for property in CatalogProperty::iter().filter(|p| p.is_persisted()) {
      assert!(columns.contains(&property.column().unwrap()));
    }
  }
}
