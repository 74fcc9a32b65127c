//! Derived column CRUD (per dataset).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;

/// A derived column: an alias computed from an expression at query time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedColumn {
    pub id: String,
    pub alias: String,
    /// Derived column expression, e.g. `IF(EXISTS($error), "error", "ok")`
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or updating a derived column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDerivedColumn {
    pub alias: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewDerivedColumn {
    pub fn new(alias: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            expression: expression.into(),
            description: None,
        }
    }
}

/// Derived column CRUD.
pub struct DerivedColumns<'c> {
    client: &'c Client,
}

impl<'c> DerivedColumns<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List derived columns in a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self, dataset: &str) -> Result<Vec<DerivedColumn>, ApiError> {
        self.client
            .get_json(&format!("/1/derived_columns/{dataset}"))
            .await
    }

    /// Fetch one derived column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, dataset: &str, id: &str) -> Result<DerivedColumn, ApiError> {
        self.client
            .get_json(&format!("/1/derived_columns/{dataset}/{id}"))
            .await
    }

    /// Create a derived column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] for expression errors.
    pub async fn create(
        &self,
        dataset: &str,
        column: &NewDerivedColumn,
    ) -> Result<DerivedColumn, ApiError> {
        self.client
            .post_json(&format!("/1/derived_columns/{dataset}"), column)
            .await
    }

    /// Replace a derived column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn update(
        &self,
        dataset: &str,
        id: &str,
        column: &NewDerivedColumn,
    ) -> Result<DerivedColumn, ApiError> {
        self.client
            .put_json(&format!("/1/derived_columns/{dataset}/{id}"), column)
            .await
    }

    /// Delete a derived column.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/derived_columns/{dataset}/{id}"))
            .await
    }
}
