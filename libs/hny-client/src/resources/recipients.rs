//! Notification recipients, shared by triggers and burn alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;

/// Delivery channel of a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Email,
    Slack,
    #[serde(rename = "pagerduty")]
    PagerDuty,
    Webhook,
    #[serde(rename = "msteams")]
    MsTeams,
}

/// A provisioned notification recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    #[serde(rename = "type")]
    pub recipient_type: RecipientType,
    /// Address for the channel: email address, channel name, webhook URL.
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or updating a recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipient {
    #[serde(rename = "type")]
    pub recipient_type: RecipientType,
    pub target: String,
}

impl NewRecipient {
    pub fn new(recipient_type: RecipientType, target: impl Into<String>) -> Self {
        Self {
            recipient_type,
            target: target.into(),
        }
    }
}

/// Reference to a recipient as embedded in triggers and burn alerts.
///
/// Either an `id` of an existing recipient, or an inline `type` + `target`
/// pair the server resolves (creating the recipient if needed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub recipient_type: Option<RecipientType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl RecipientRef {
    /// Reference an existing recipient by id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            recipient_type: None,
            target: None,
        }
    }

    /// Inline reference the server resolves by type and target.
    pub fn inline(recipient_type: RecipientType, target: impl Into<String>) -> Self {
        Self {
            id: None,
            recipient_type: Some(recipient_type),
            target: Some(target.into()),
        }
    }
}

/// Append `extra` recipients onto `list`, skipping ones already present.
///
/// Trigger and burn-alert payload constructors call this explicitly instead
/// of inheriting shared recipient handling, so each payload's field set
/// stays visible at its definition.
pub fn attach_recipients(list: &mut Vec<RecipientRef>, extra: &[RecipientRef]) {
    for recipient in extra {
        if !list.contains(recipient) {
            list.push(recipient.clone());
        }
    }
}

/// Recipient CRUD.
///
/// Recipients are team-scoped: paths carry no dataset segment.
pub struct Recipients<'c> {
    client: &'c Client,
}

impl<'c> Recipients<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List all recipients for the team.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self) -> Result<Vec<Recipient>, ApiError> {
        self.client.get_json("/1/recipients").await
    }

    /// Fetch one recipient.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, id: &str) -> Result<Recipient, ApiError> {
        self.client.get_json(&format!("/1/recipients/{id}")).await
    }

    /// Create a recipient.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the server rejects the payload.
    pub async fn create(&self, recipient: &NewRecipient) -> Result<Recipient, ApiError> {
        self.client.post_json("/1/recipients", recipient).await
    }

    /// Replace a recipient.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn update(&self, id: &str, recipient: &NewRecipient) -> Result<Recipient, ApiError> {
        self.client
            .put_json(&format!("/1/recipients/{id}"), recipient)
            .await
    }

    /// Delete a recipient.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure; deleting a recipient
    /// still referenced by a trigger fails with
    /// [`ApiError::Validation`].
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/recipients/{id}"))
            .await
    }
}
