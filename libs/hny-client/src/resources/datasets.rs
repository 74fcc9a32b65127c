//! Dataset CRUD.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;

/// A dataset as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand_json_depth: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_written_at: Option<DateTime<Utc>>,
}

/// Payload for creating a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDataset {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand_json_depth: Option<u8>,
}

impl NewDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            expand_json_depth: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Mutable dataset fields for updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expand_json_depth: Option<u8>,
}

/// Dataset CRUD.
pub struct Datasets<'c> {
    client: &'c Client,
}

impl<'c> Datasets<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List all datasets visible to the key's environment.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self) -> Result<Vec<Dataset>, ApiError> {
        self.client.get_json("/1/datasets").await
    }

    /// Fetch one dataset by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown slugs.
    pub async fn get(&self, slug: &str) -> Result<Dataset, ApiError> {
        self.client.get_json(&format!("/1/datasets/{slug}")).await
    }

    /// Create a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the server rejects the payload.
    pub async fn create(&self, dataset: &NewDataset) -> Result<Dataset, ApiError> {
        self.client.post_json("/1/datasets", dataset).await
    }

    /// Update a dataset's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn update(&self, slug: &str, update: &UpdateDataset) -> Result<Dataset, ApiError> {
        self.client
            .put_json(&format!("/1/datasets/{slug}"), update)
            .await
    }

    /// Delete a dataset. Requires deletion to be enabled for the key.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] when the key lacks the scope.
    pub async fn delete(&self, slug: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/datasets/{slug}"))
            .await
    }
}
