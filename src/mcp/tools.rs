//! Tool catalogue and dispatch.
//!
//! Tools are described once, at startup, in a lookup table mapping tool name
//! to its argument schema and handler. `invoke` validates arguments against
//! the declared schema before the handler runs, so individual handlers never
//! re-implement validation.
//!
//! Handler failures never escape as protocol faults: every error path is
//! converted into a `ToolCallResult` with `is_error` set, and upstream
//! 403/404 statuses are uniformly rephrased via
//! [`UpstreamError::describe`](crate::figma::UpstreamError::describe).

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::figma::stats::DispatchStats;
use crate::figma::types::{LocalVariables, Variable};
use crate::figma::FigmaClient;
use crate::graph;

/// A tool definition for tools/list responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

/// Maps tool names to schemas and handlers; owns the dispatch statistics.
///
/// One router exists per process; every session's endpoint dispatches
/// through it. The Figma client (and with it the response cache and API
/// statistics) is shared by reference.
pub struct ToolRouter {
    figma: Arc<FigmaClient>,
    definitions: Vec<ToolDefinition>,
    stats: Mutex<DispatchStats>,
}

impl ToolRouter {
    /// Builds the router and its static tool catalogue.
    #[must_use]
    pub fn new(figma: Arc<FigmaClient>) -> Self {
        Self {
            figma,
            definitions: build_catalogue(),
            stats: Mutex::new(DispatchStats::new()),
        }
    }

    /// The static tool catalogue. Pure; no side effects.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns a snapshot of the dispatch statistics.
    #[must_use]
    pub fn dispatch_snapshot(&self) -> DispatchStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the shared Figma client (for health reporting).
    #[must_use]
    pub fn figma(&self) -> &Arc<FigmaClient> {
        &self.figma
    }

    /// Invokes a tool by name.
    ///
    /// Unknown names and schema violations yield error results, never
    /// protocol faults. Every invocation, successful or not, updates the
    /// dispatch statistics.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> ToolCallResult {
        let started = Instant::now();
        let result = self.dispatch(name, arguments).await;
        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = started.elapsed().as_millis() as u64;

        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(latency_ms, !result.is_error);

        debug!(tool = name, latency_ms, is_error = result.is_error, "tool invocation finished");
        result
    }

    async fn dispatch(&self, name: &str, arguments: &Value) -> ToolCallResult {
        let Some(definition) = self.definitions.iter().find(|d| d.name == name) else {
            return ToolCallResult::error(format!("Unknown tool: {name}"));
        };

        let violations = validate_arguments(&definition.input_schema, arguments);
        if !violations.is_empty() {
            return ToolCallResult::error(format!(
                "Invalid arguments for {name}: {}",
                violations.join("; ")
            ));
        }

        match name {
            "get-file" => self.call_get_file(arguments).await,
            "list-files" => self.call_list_files(arguments).await,
            "create_variables" => self.call_create_variables(arguments).await,
            "update_variables" => self.call_update_variables(arguments).await,
            "delete_variables" => self.call_delete_variables(arguments).await,
            "create_reference" => self.call_create_reference(arguments).await,
            "validate_references" => self.call_validate_references(arguments).await,
            "create_theme" => self.call_create_theme(arguments).await,
            // The catalogue and this match are maintained together; a name
            // found in one but not the other is a programming error surfaced
            // as a result, not a crash.
            _ => ToolCallResult::error(format!("Tool not wired: {name}")),
        }
    }

    // ==================== Tool Handlers ====================

    /// Fetches a file and returns a summary of its document.
    async fn call_get_file(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");

        match self.figma.get_file(file_key).await {
            Ok(doc) => {
                let pages = doc
                    .pointer("/document/children")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len);
                let summary = json!({
                    "fileKey": file_key,
                    "name": doc.get("name"),
                    "lastModified": doc.get("lastModified"),
                    "version": doc.get("version"),
                    "editorType": doc.get("editorType"),
                    "pages": pages,
                });
                ToolCallResult::text(pretty(&summary))
            }
            Err(e) => ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        }
    }

    /// Lists the files of a project.
    async fn call_list_files(&self, arguments: &Value) -> ToolCallResult {
        let project_id = str_arg(arguments, "projectId");

        match self.figma.get_project_files(project_id).await {
            Ok(listing) => {
                let result = json!({
                    "projectId": project_id,
                    "name": listing.name,
                    "fileCount": listing.files.len(),
                    "files": listing.files,
                });
                ToolCallResult::text(pretty(&result))
            }
            Err(e) => ToolCallResult::error(e.describe(&format!("project {project_id}"))),
        }
    }

    /// Creates variables in a file, one upstream call per variable.
    async fn call_create_variables(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");
        let items = array_arg(arguments, "variables");

        let current = match self.figma.get_local_variables(file_key, true).await {
            Ok(current) => current,
            Err(e) => return ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        };
        let existing_names: HashSet<&str> = current
            .meta
            .variables
            .values()
            .map(|v| v.name.as_str())
            .collect();

        let outcomes = join_all(items.iter().map(|item| {
            let existing = &existing_names;
            async move {
                let Some(name) = item.get("name").and_then(Value::as_str) else {
                    return outcome_error("(unnamed)", "variable definition is missing a name");
                };
                if existing.contains(name) {
                    return outcome_error(name, "a variable with this name already exists");
                }

                let mut action = item.clone();
                action["action"] = json!("CREATE");
                let payload = json!({ "variables": [action] });
                match self.figma.post_variables(file_key, &payload).await {
                    Ok(_) => json!({ "name": name, "status": "created" }),
                    Err(e) => outcome_error(name, &e.describe(&format!("variable {name}"))),
                }
            }
        }))
        .await;

        ToolCallResult::text(pretty(&batch_summary(file_key, &outcomes)))
    }

    /// Updates variables in a file, one upstream call per update.
    async fn call_update_variables(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");
        let items = array_arg(arguments, "updates");

        let current = match self.figma.get_local_variables(file_key, true).await {
            Ok(current) => current,
            Err(e) => return ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        };
        let known: HashSet<&str> = current.meta.variables.keys().map(String::as_str).collect();

        let outcomes = join_all(items.iter().map(|item| {
            let known = &known;
            async move {
                let Some(id) = item.get("id").and_then(Value::as_str) else {
                    return outcome_error("(missing id)", "update is missing the variable id");
                };
                if !known.contains(id) {
                    return outcome_error(id, &format!("Resource not found: variable {id}"));
                }

                let mut action = item.clone();
                action["action"] = json!("UPDATE");
                let payload = json!({ "variables": [action] });
                match self.figma.post_variables(file_key, &payload).await {
                    Ok(_) => json!({ "id": id, "status": "updated" }),
                    Err(e) => outcome_error(id, &e.describe(&format!("variable {id}"))),
                }
            }
        }))
        .await;

        ToolCallResult::text(pretty(&batch_summary(file_key, &outcomes)))
    }

    /// Deletes variables from a file, one upstream call per id.
    async fn call_delete_variables(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");
        let soft_delete = arguments
            .get("softDelete")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let ids: Vec<&str> = array_arg(arguments, "variableIds")
            .iter()
            .filter_map(Value::as_str)
            .collect();

        let current = match self.figma.get_local_variables(file_key, true).await {
            Ok(current) => current,
            Err(e) => return ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        };
        let known: HashSet<&str> = current.meta.variables.keys().map(String::as_str).collect();

        let outcomes = join_all(ids.iter().map(|id| {
            let known = &known;
            async move {
                if !known.contains(id) {
                    return outcome_error(id, &format!("Resource not found: variable {id}"));
                }

                let (payload, done_status) = if soft_delete {
                    (
                        json!({ "variables": [{ "action": "UPDATE", "id": id, "deleted": true }] }),
                        "soft_deleted",
                    )
                } else {
                    (
                        json!({ "variables": [{ "action": "DELETE", "id": id }] }),
                        "deleted",
                    )
                };
                match self.figma.post_variables(file_key, &payload).await {
                    Ok(_) => json!({ "id": id, "status": done_status }),
                    Err(e) => outcome_error(id, &e.describe(&format!("variable {id}"))),
                }
            }
        }))
        .await;

        ToolCallResult::text(pretty(&batch_summary(file_key, &outcomes)))
    }

    /// Creates an alias from one variable to another, refusing edges that
    /// would close a reference cycle.
    async fn call_create_reference(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");
        let source_id = str_arg(arguments, "sourceId");
        let target_id = str_arg(arguments, "targetId");
        let expression = arguments.get("expression").and_then(Value::as_str);

        let current = match self.figma.get_local_variables(file_key, true).await {
            Ok(current) => current,
            Err(e) => return ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        };
        let variables = current.variables();

        let Some(source) = variables.iter().find(|v| v.id == source_id) else {
            return ToolCallResult::error(format!("Resource not found: variable {source_id}"));
        };
        if !variables.iter().any(|v| v.id == target_id) {
            return ToolCallResult::error(format!("Resource not found: variable {target_id}"));
        }

        // Reject the write if the proposed edge would close a cycle.
        let mut graph = graph::build_graph(&variables);
        let entry = graph.entry(source_id.to_string()).or_default();
        if !entry.iter().any(|t| t == target_id) {
            entry.push(target_id.to_string());
        }
        if graph::has_cycle(&graph, source_id) {
            return ToolCallResult::error(format!(
                "Reference rejected: {source_id} -> {target_id} would create a circular reference"
            ));
        }

        let Some(mode_id) = default_mode_for(&current, source) else {
            return ToolCallResult::error(format!(
                "Variable {source_id} belongs to no collection with a usable mode"
            ));
        };

        let mut action = json!({
            "action": "UPDATE",
            "id": source_id,
            "valuesByMode": {
                (mode_id.clone()): { "type": "VARIABLE_ALIAS", "id": target_id },
            },
        });
        if let Some(expression) = expression {
            action["expression"] = json!(expression);
        }
        let payload = json!({ "variables": [action] });

        match self.figma.post_variables(file_key, &payload).await {
            Ok(_) => ToolCallResult::text(pretty(&json!({
                "status": "reference_created",
                "sourceId": source_id,
                "targetId": target_id,
                "modeId": mode_id,
            }))),
            Err(e) => {
                ToolCallResult::error(e.describe(&format!("reference {source_id} -> {target_id}")))
            }
        }
    }

    /// Validates variable references: cycles and dangling targets.
    async fn call_validate_references(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");

        let current = match self.figma.get_local_variables(file_key, false).await {
            Ok(current) => current,
            Err(e) => return ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        };
        let variables = current.variables();

        let ids_to_check: Vec<String> = match arguments.get("variableIds").and_then(Value::as_array)
        {
            Some(ids) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            None => variables.iter().map(|v| v.id.clone()).collect(),
        };

        let problems = graph::validate(&variables, &ids_to_check);
        ToolCallResult::text(pretty(&json!({
            "fileKey": file_key,
            "checked": ids_to_check.len(),
            "valid": problems.is_empty(),
            "problems": problems,
        })))
    }

    /// Creates a theme: a collection, its modes, and per-mode variable values.
    async fn call_create_theme(&self, arguments: &Value) -> ToolCallResult {
        let file_key = str_arg(arguments, "fileKey");
        let theme_name = str_arg(arguments, "name");
        let modes = array_arg(arguments, "modes");

        let current = match self.figma.get_local_variables(file_key, true).await {
            Ok(current) => current,
            Err(e) => return ToolCallResult::error(e.describe(&format!("file {file_key}"))),
        };

        let collection_payload = json!({
            "variableCollections": [{ "action": "CREATE", "id": "tmp_collection", "name": theme_name }],
        });
        let collection_id = match self.figma.post_variables(file_key, &collection_payload).await {
            Ok(response) => response
                .pointer("/meta/tempIdToRealId/tmp_collection")
                .and_then(Value::as_str)
                .unwrap_or("tmp_collection")
                .to_string(),
            Err(e) => {
                return ToolCallResult::error(e.describe(&format!("theme collection {theme_name}")))
            }
        };

        let mut mode_outcomes = Vec::with_capacity(modes.len());
        for mode in modes {
            mode_outcomes.push(
                self.create_theme_mode(file_key, &collection_id, mode, &current)
                    .await,
            );
        }

        ToolCallResult::text(pretty(&json!({
            "theme": theme_name,
            "fileKey": file_key,
            "collectionId": collection_id,
            "modes": mode_outcomes,
        })))
    }

    /// Creates one mode of a theme and applies its variable values,
    /// aggregating a nested per-variable outcome list.
    async fn create_theme_mode(
        &self,
        file_key: &str,
        collection_id: &str,
        mode: &Value,
        current: &LocalVariables,
    ) -> Value {
        let Some(mode_name) = mode.get("name").and_then(Value::as_str) else {
            return outcome_error("(unnamed)", "mode definition is missing a name");
        };

        let mode_payload = json!({
            "variableModes": [{
                "action": "CREATE",
                "id": "tmp_mode",
                "name": mode_name,
                "variableCollectionId": collection_id,
            }],
        });
        let mode_id = match self.figma.post_variables(file_key, &mode_payload).await {
            Ok(response) => response
                .pointer("/meta/tempIdToRealId/tmp_mode")
                .and_then(Value::as_str)
                .unwrap_or("tmp_mode")
                .to_string(),
            Err(e) => {
                return outcome_error(mode_name, &e.describe(&format!("theme mode {mode_name}")))
            }
        };

        let empty = serde_json::Map::new();
        let values = mode
            .get("variableValues")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let variable_outcomes = join_all(values.iter().map(|(variable_name, value)| {
            let mode_id = mode_id.clone();
            async move {
                let Some(variable) = current.variable_by_name(variable_name) else {
                    return outcome_error(
                        variable_name,
                        &format!("Resource not found: variable {variable_name}"),
                    );
                };

                let payload = json!({
                    "variableModeValues": [{
                        "variableId": variable.id,
                        "modeId": mode_id,
                        "value": value,
                    }],
                });
                match self.figma.post_variables(file_key, &payload).await {
                    Ok(_) => json!({ "name": variable_name, "status": "set" }),
                    Err(e) => outcome_error(
                        variable_name,
                        &e.describe(&format!("variable {variable_name}")),
                    ),
                }
            }
        }))
        .await;

        json!({
            "name": mode_name,
            "modeId": mode_id,
            "status": "created",
            "variables": variable_outcomes,
        })
    }
}

/// Default mode for the collection a variable belongs to, falling back to
/// the collection's first mode.
fn default_mode_for(current: &LocalVariables, variable: &Variable) -> Option<String> {
    let collection_id = variable.variable_collection_id.as_deref()?;
    let collection = current.meta.variable_collections.get(collection_id)?;
    collection
        .default_mode_id
        .clone()
        .or_else(|| collection.modes.first().map(|m| m.mode_id.clone()))
}

fn str_arg<'a>(arguments: &'a Value, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn array_arg<'a>(arguments: &'a Value, key: &str) -> &'a [Value] {
    arguments
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn outcome_error(id: &str, message: &str) -> Value {
    json!({ "id": id, "status": "error", "error": message })
}

/// Aggregates per-item outcome lines with success/failure counts.
fn batch_summary(file_key: &str, outcomes: &[Value]) -> Value {
    let failed = outcomes
        .iter()
        .filter(|o| o.get("status").and_then(Value::as_str) == Some("error"))
        .count();
    json!({
        "fileKey": file_key,
        "total": outcomes.len(),
        "succeeded": outcomes.len() - failed,
        "failed": failed,
        "results": outcomes,
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Checks `arguments` against a tool's input schema.
///
/// Returns one line per violation: every missing required field and every
/// type mismatch is reported, not just the first.
fn validate_arguments(schema: &Value, arguments: &Value) -> Vec<String> {
    let mut violations = Vec::new();

    let Some(args) = arguments.as_object() else {
        // tools/call without arguments arrives as null; treat it as {}.
        if arguments.is_null() {
            if let Some(required) = schema.get("required").and_then(Value::as_array) {
                for name in required.iter().filter_map(Value::as_str) {
                    violations.push(format!("missing required parameter: {name}"));
                }
            }
            return violations;
        }
        return vec!["arguments must be an object".to_string()];
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(name) {
                violations.push(format!("missing required parameter: {name}"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return violations;
    };

    for (name, value) in args {
        let Some(property) = properties.get(name) else {
            continue; // unknown fields are tolerated
        };
        let Some(expected) = property.get("type").and_then(Value::as_str) else {
            continue;
        };

        if !type_matches(expected, value) {
            violations.push(format!(
                "parameter {name}: expected {expected}, got {}",
                type_name(value)
            ));
            continue;
        }

        // One level of item-type checking for arrays.
        if expected == "array" {
            if let (Some(item_type), Some(items)) = (
                property.pointer("/items/type").and_then(Value::as_str),
                value.as_array(),
            ) {
                for (index, item) in items.iter().enumerate() {
                    if !type_matches(item_type, item) {
                        violations.push(format!(
                            "parameter {name}[{index}]: expected {item_type}, got {}",
                            type_name(item)
                        ));
                    }
                }
            }
        }
    }

    violations
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "boolean" => value.is_boolean(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        _ => true,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The static tool catalogue.
#[allow(clippy::too_many_lines)]
fn build_catalogue() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get-file".to_string(),
            description: Some(
                "Fetch a Figma file by key and return a summary of its document \
                 (name, version, last modification, page count). Responses are cached."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    }
                },
                "required": ["fileKey"]
            }),
        },
        ToolDefinition {
            name: "list-files".to_string(),
            description: Some(
                "List the files of a Figma project with their keys and last-modified \
                 timestamps. Responses are cached."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "projectId": {
                        "type": "string",
                        "description": "Identifier of the project"
                    }
                },
                "required": ["projectId"]
            }),
        },
        ToolDefinition {
            name: "create_variables".to_string(),
            description: Some(
                "Create design-token variables in a file. Each entry needs a name, a \
                 resolvedType (BOOLEAN, FLOAT, STRING or COLOR) and a \
                 variableCollectionId. One outcome line is returned per variable; the \
                 remote API may reject individual entries."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "variables": {
                        "type": "array",
                        "description": "Variable definitions to create",
                        "items": { "type": "object" }
                    }
                },
                "required": ["fileKey", "variables"]
            }),
        },
        ToolDefinition {
            name: "update_variables".to_string(),
            description: Some(
                "Update existing variables in a file. Each entry needs the variable id \
                 plus the fields to change. Targets are checked against a fresh \
                 variable list; one outcome line is returned per update."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "updates": {
                        "type": "array",
                        "description": "Updates, each carrying the variable id",
                        "items": { "type": "object" }
                    }
                },
                "required": ["fileKey", "updates"]
            }),
        },
        ToolDefinition {
            name: "delete_variables".to_string(),
            description: Some(
                "Delete variables from a file by id. With softDelete the variables are \
                 marked deleted instead of removed. One outcome line is returned per \
                 id; a missing id fails that line only."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "variableIds": {
                        "type": "array",
                        "description": "Identifiers of the variables to delete",
                        "items": { "type": "string" }
                    },
                    "softDelete": {
                        "type": "boolean",
                        "description": "Mark deleted instead of removing (default: false)"
                    }
                },
                "required": ["fileKey", "variableIds"]
            }),
        },
        ToolDefinition {
            name: "create_reference".to_string(),
            description: Some(
                "Make one variable an alias of another. The edge is checked against \
                 the current reference graph and rejected if it would create a \
                 circular reference."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "sourceId": {
                        "type": "string",
                        "description": "Variable that will hold the alias"
                    },
                    "targetId": {
                        "type": "string",
                        "description": "Variable being referenced"
                    },
                    "expression": {
                        "type": "string",
                        "description": "Optional expression attached to the reference"
                    }
                },
                "required": ["fileKey", "sourceId", "targetId"]
            }),
        },
        ToolDefinition {
            name: "validate_references".to_string(),
            description: Some(
                "Check variable references for circular chains and dangling targets. \
                 Without variableIds every variable in the file is checked. Read-only; \
                 returns the complete list of problems."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "variableIds": {
                        "type": "array",
                        "description": "Optional: restrict the check to these ids",
                        "items": { "type": "string" }
                    }
                },
                "required": ["fileKey"]
            }),
        },
        ToolDefinition {
            name: "create_theme".to_string(),
            description: Some(
                "Create a theme: a new variable collection with one mode per entry in \
                 modes, applying each mode's variableValues (a map from variable name \
                 to value). Outcomes are reported per mode and per variable."
                    .to_string(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fileKey": {
                        "type": "string",
                        "description": "Key of the Figma file"
                    },
                    "name": {
                        "type": "string",
                        "description": "Theme (collection) name"
                    },
                    "modes": {
                        "type": "array",
                        "description": "Modes, each { name, variableValues }",
                        "items": { "type": "object" }
                    }
                },
                "required": ["fileKey", "name", "modes"]
            }),
        },
    ]
}
