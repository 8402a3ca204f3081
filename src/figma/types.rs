//! Typed views of the Figma REST API payloads.
//!
//! Only the fields the server actually consumes are modelled; everything else
//! stays in the raw JSON value. Upstream payloads use camelCase throughout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A design-token variable.
///
/// For alias-typed values, `values_by_mode` holds objects of the shape
/// `{"type": "VARIABLE_ALIAS", "id": "<variable id>"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// Unique variable identifier (e.g. `VariableID:1:2`).
    pub id: String,

    /// Human-readable name.
    pub name: String,

    /// Resolved type: `BOOLEAN`, `FLOAT`, `STRING` or `COLOR`.
    #[serde(default)]
    pub resolved_type: String,

    /// Identifier of the collection this variable belongs to.
    #[serde(default)]
    pub variable_collection_id: Option<String>,

    /// Per-mode values. Preserves upstream ordering.
    #[serde(default)]
    pub values_by_mode: IndexMap<String, Value>,

    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
}

impl Variable {
    /// Returns the identifiers of all variables this one aliases, in mode
    /// order, without duplicates.
    #[must_use]
    pub fn alias_targets(&self) -> Vec<String> {
        let mut targets = Vec::new();
        for value in self.values_by_mode.values() {
            let Some(obj) = value.as_object() else {
                continue;
            };
            if obj.get("type").and_then(Value::as_str) != Some("VARIABLE_ALIAS") {
                continue;
            }
            if let Some(id) = obj.get("id").and_then(Value::as_str) {
                if !targets.iter().any(|t| t == id) {
                    targets.push(id.to_string());
                }
            }
        }
        targets
    }

    /// Whether this variable references another variable in at least one mode.
    #[must_use]
    pub fn is_alias(&self) -> bool {
        !self.alias_targets().is_empty()
    }
}

/// A mode within a variable collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableMode {
    /// Mode identifier.
    pub mode_id: String,
    /// Mode name (e.g. "Light", "Dark").
    pub name: String,
}

/// A collection of variables sharing a set of modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableCollection {
    /// Collection identifier.
    pub id: String,
    /// Collection name.
    pub name: String,
    /// Modes defined on this collection.
    #[serde(default)]
    pub modes: Vec<VariableMode>,
    /// Identifier of the default mode.
    #[serde(default)]
    pub default_mode_id: Option<String>,
}

/// Payload of `GET /v1/files/{key}/variables/local`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalVariables {
    /// The `meta` envelope.
    #[serde(default)]
    pub meta: VariablesMeta,
}

/// The `meta` object of a local-variables response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesMeta {
    /// Variables keyed by identifier, in upstream order.
    #[serde(default)]
    pub variables: IndexMap<String, Variable>,

    /// Collections keyed by identifier.
    #[serde(default)]
    pub variable_collections: IndexMap<String, VariableCollection>,
}

impl LocalVariables {
    /// Returns the variables as a flat slice-backed vector, preserving order.
    #[must_use]
    pub fn variables(&self) -> Vec<Variable> {
        self.meta.variables.values().cloned().collect()
    }

    /// Looks up a variable by its human-readable name.
    #[must_use]
    pub fn variable_by_name(&self, name: &str) -> Option<&Variable> {
        self.meta.variables.values().find(|v| v.name == name)
    }
}

/// One file entry in a project-files listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// File key, usable with `get-file`.
    pub key: String,
    /// File name.
    pub name: String,
    /// Last-modified timestamp as reported upstream.
    #[serde(default)]
    pub last_modified: Option<String>,
}

/// Payload of `GET /v1/projects/{id}/files`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectFiles {
    /// Project name, when reported.
    #[serde(default)]
    pub name: Option<String>,
    /// Files in the project.
    #[serde(default)]
    pub files: Vec<ProjectFile>,
}
