//! Operation registry.
//!
//! An explicit catalog of every operation this client exposes, used to
//! generate agent tool definitions and operation listings. The registry is
//! a plain value: construct it once at startup and pass it by reference —
//! there is no module-level singleton to initialize behind the caller's
//! back.

use serde_json::{json, Value};

/// One exposed API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDef {
    /// Stable operation name, e.g. `"triggers.create"`
    pub name: &'static str,
    pub method: &'static str,
    /// Path template with `{placeholders}` for path parameters
    pub path: &'static str,
    pub description: &'static str,
    /// Whether the operation takes a JSON request body
    pub has_body: bool,
}

impl OperationDef {
    /// Names of the `{placeholders}` in the path template, in order.
    pub fn path_params(&self) -> impl Iterator<Item = &'static str> {
        self.path
            .split('/')
            .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
    }
}

/// Catalog of the operations this client exposes.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: Vec<OperationDef>,
}

impl OperationRegistry {
    /// Build the full catalog.
    #[must_use]
    pub fn new() -> Self {
        let operations = vec![
            op("auth.get", "GET", "/1/auth", "Describe the authenticated key", false),
            op("datasets.list", "GET", "/1/datasets", "List datasets", false),
            op("datasets.get", "GET", "/1/datasets/{slug}", "Fetch a dataset", false),
            op("datasets.create", "POST", "/1/datasets", "Create a dataset", true),
            op("datasets.update", "PUT", "/1/datasets/{slug}", "Update a dataset", true),
            op("datasets.delete", "DELETE", "/1/datasets/{slug}", "Delete a dataset", false),
            op("columns.list", "GET", "/1/columns/{dataset}", "List columns", false),
            op("columns.get", "GET", "/1/columns/{dataset}/{id}", "Fetch a column", false),
            op("columns.create", "POST", "/1/columns/{dataset}", "Create a column", true),
            op("columns.update", "PUT", "/1/columns/{dataset}/{id}", "Update a column", true),
            op("columns.delete", "DELETE", "/1/columns/{dataset}/{id}", "Delete a column", false),
            op(
                "derived_columns.list",
                "GET",
                "/1/derived_columns/{dataset}",
                "List derived columns",
                false,
            ),
            op(
                "derived_columns.get",
                "GET",
                "/1/derived_columns/{dataset}/{id}",
                "Fetch a derived column",
                false,
            ),
            op(
                "derived_columns.create",
                "POST",
                "/1/derived_columns/{dataset}",
                "Create a derived column",
                true,
            ),
            op(
                "derived_columns.update",
                "PUT",
                "/1/derived_columns/{dataset}/{id}",
                "Update a derived column",
                true,
            ),
            op(
                "derived_columns.delete",
                "DELETE",
                "/1/derived_columns/{dataset}/{id}",
                "Delete a derived column",
                false,
            ),
            op("queries.create", "POST", "/1/queries/{dataset}", "Persist a query", true),
            op("queries.get", "GET", "/1/queries/{dataset}/{id}", "Fetch a query", false),
            op(
                "query_results.create",
                "POST",
                "/1/query_results/{dataset}",
                "Start computing a query result",
                true,
            ),
            op(
                "query_results.get",
                "GET",
                "/1/query_results/{dataset}/{id}",
                "Poll a query result",
                false,
            ),
            op("triggers.list", "GET", "/1/triggers/{dataset}", "List triggers", false),
            op("triggers.get", "GET", "/1/triggers/{dataset}/{id}", "Fetch a trigger", false),
            op("triggers.create", "POST", "/1/triggers/{dataset}", "Create a trigger", true),
            op("triggers.update", "PUT", "/1/triggers/{dataset}/{id}", "Update a trigger", true),
            op(
                "triggers.delete",
                "DELETE",
                "/1/triggers/{dataset}/{id}",
                "Delete a trigger",
                false,
            ),
            op("boards.list", "GET", "/1/boards", "List boards", false),
            op("boards.get", "GET", "/1/boards/{id}", "Fetch a board", false),
            op("boards.create", "POST", "/1/boards", "Create a board", true),
            op("boards.update", "PUT", "/1/boards/{id}", "Update a board", true),
            op("boards.delete", "DELETE", "/1/boards/{id}", "Delete a board", false),
            op("markers.list", "GET", "/1/markers/{dataset}", "List markers", false),
            op("markers.create", "POST", "/1/markers/{dataset}", "Create a marker", true),
            op("markers.update", "PUT", "/1/markers/{dataset}/{id}", "Update a marker", true),
            op(
                "markers.delete",
                "DELETE",
                "/1/markers/{dataset}/{id}",
                "Delete a marker",
                false,
            ),
            op("slos.list", "GET", "/1/slos/{dataset}", "List SLOs", false),
            op("slos.get", "GET", "/1/slos/{dataset}/{id}", "Fetch an SLO", false),
            op("slos.create", "POST", "/1/slos/{dataset}", "Create an SLO", true),
            op("slos.update", "PUT", "/1/slos/{dataset}/{id}", "Update an SLO", true),
            op("slos.delete", "DELETE", "/1/slos/{dataset}/{id}", "Delete an SLO", false),
            op(
                "burn_alerts.list",
                "GET",
                "/1/burn_alerts/{dataset}",
                "List burn alerts for an SLO",
                false,
            ),
            op(
                "burn_alerts.get",
                "GET",
                "/1/burn_alerts/{dataset}/{id}",
                "Fetch a burn alert",
                false,
            ),
            op(
                "burn_alerts.create",
                "POST",
                "/1/burn_alerts/{dataset}",
                "Create a burn alert",
                true,
            ),
            op(
                "burn_alerts.update",
                "PUT",
                "/1/burn_alerts/{dataset}/{id}",
                "Update a burn alert",
                true,
            ),
            op(
                "burn_alerts.delete",
                "DELETE",
                "/1/burn_alerts/{dataset}/{id}",
                "Delete a burn alert",
                false,
            ),
            op("recipients.list", "GET", "/1/recipients", "List recipients", false),
            op("recipients.get", "GET", "/1/recipients/{id}", "Fetch a recipient", false),
            op("recipients.create", "POST", "/1/recipients", "Create a recipient", true),
            op("recipients.update", "PUT", "/1/recipients/{id}", "Update a recipient", true),
            op(
                "recipients.delete",
                "DELETE",
                "/1/recipients/{id}",
                "Delete a recipient",
                false,
            ),
        ];
        Self { operations }
    }

    /// All operations, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationDef> {
        self.operations.iter()
    }

    /// Look up one operation by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OperationDef> {
        self.operations.iter().find(|op| op.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Tool definitions for agent integrations: one JSON object per
    /// operation with an input schema covering path parameters and, when
    /// applicable, a free-form `body`.
    #[must_use]
    pub fn tool_schemas(&self) -> Vec<Value> {
        self.operations
            .iter()
            .map(|op| {
                let mut properties = serde_json::Map::new();
                let mut required = Vec::new();
                for param in op.path_params() {
                    properties.insert(
                        param.to_owned(),
                        json!({"type": "string", "description": format!("Path parameter '{param}'")}),
                    );
                    required.push(Value::from(param));
                }
                if op.has_body {
                    properties.insert(
                        "body".to_owned(),
                        json!({"type": "object", "description": "JSON request body"}),
                    );
                    required.push(Value::from("body"));
                }
                json!({
                    "name": op.name,
                    "description": op.description,
                    "input_schema": {
                        "type": "object",
                        "properties": Value::Object(properties),
                        "required": required,
                    },
                })
            })
            .collect()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn op(
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    has_body: bool,
) -> OperationDef {
    OperationDef {
        name,
        method,
        path,
        description,
        has_body,
    }
}
