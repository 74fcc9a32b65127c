//! Column CRUD (per dataset).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;

/// Value type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Float,
    Integer,
    Boolean,
}

/// A column as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub key_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_written: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or updating a column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewColumn {
    pub key_name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

impl NewColumn {
    pub fn new(key_name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            key_name: key_name.into(),
            column_type,
            description: None,
            hidden: false,
        }
    }
}

/// Column CRUD.
pub struct Columns<'c> {
    client: &'c Client,
}

impl<'c> Columns<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List all columns in a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self, dataset: &str) -> Result<Vec<Column>, ApiError> {
        self.client.get_json(&format!("/1/columns/{dataset}")).await
    }

    /// Fetch one column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, dataset: &str, id: &str) -> Result<Column, ApiError> {
        self.client
            .get_json(&format!("/1/columns/{dataset}/{id}"))
            .await
    }

    /// Create a column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the server rejects the payload.
    pub async fn create(&self, dataset: &str, column: &NewColumn) -> Result<Column, ApiError> {
        self.client
            .post_json(&format!("/1/columns/{dataset}"), column)
            .await
    }

    /// Replace a column's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn update(
        &self,
        dataset: &str,
        id: &str,
        column: &NewColumn,
    ) -> Result<Column, ApiError> {
        self.client
            .put_json(&format!("/1/columns/{dataset}/{id}"), column)
            .await
    }

    /// Delete a column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/columns/{dataset}/{id}"))
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn column_type_uses_lowercase_wire_names() {
        assert_eq!(
            serde_json::to_string(&ColumnType::Float).unwrap(),
            r#""float""#
        );
        let parsed: ColumnType = serde_json::from_str(r#""boolean""#).unwrap();
        assert_eq!(parsed, ColumnType::Boolean);
    }

    #[test]
    fn new_column_serializes_type_key() {
        let json = serde_json::to_value(NewColumn::new("duration_ms", ColumnType::Float)).unwrap();
        assert_eq!(json["key_name"], "duration_ms");
        assert_eq!(json["type"], "float");
        assert_eq!(json["hidden"], false);
    }
}
