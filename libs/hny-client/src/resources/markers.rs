//! Marker CRUD (per dataset).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;

/// A deploy/incident marker on a dataset's timeline.
///
/// Times are Unix-epoch seconds, matching the wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Groups markers in the UI, e.g. `"deploy"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or updating a marker.
///
/// An omitted `start_time` means "now", resolved server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMarker {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl NewMarker {
    #[must_use]
    pub fn now() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn marker_type(mut self, marker_type: impl Into<String>) -> Self {
        self.marker_type = Some(marker_type.into());
        self
    }

    #[must_use]
    pub fn at(mut self, start_time: i64) -> Self {
        self.start_time = Some(start_time);
        self
    }
}

/// Marker CRUD.
pub struct Markers<'c> {
    client: &'c Client,
}

impl<'c> Markers<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List markers on a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self, dataset: &str) -> Result<Vec<Marker>, ApiError> {
        self.client.get_json(&format!("/1/markers/{dataset}")).await
    }

    /// Create a marker.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the server rejects the payload.
    pub async fn create(&self, dataset: &str, marker: &NewMarker) -> Result<Marker, ApiError> {
        self.client
            .post_json(&format!("/1/markers/{dataset}"), marker)
            .await
    }

    /// Update a marker (e.g. set `end_time` when a deploy finishes).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn update(
        &self,
        dataset: &str,
        id: &str,
        marker: &NewMarker,
    ) -> Result<Marker, ApiError> {
        self.client
            .put_json(&format!("/1/markers/{dataset}/{id}"), marker)
            .await
    }

    /// Delete a marker.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/markers/{dataset}/{id}"))
            .await
    }
}
