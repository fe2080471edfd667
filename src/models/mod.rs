use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Property groups keyed by their section heading, in order of first appearance.
pub type PropertyGroups = IndexMap<String, Vec<PropertyRow>>;

/// One line of a property table
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRow {
    pub property_name: String,
    pub metric_value: String,
    pub english_value: String,
    pub comments: String,
}

/// A material scraped from a single detail page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialRecord {
    pub name: String,
    pub properties: PropertyGroups,
}
