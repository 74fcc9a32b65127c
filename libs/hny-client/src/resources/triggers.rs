//! Trigger CRUD.
//!
//! Triggers evaluate a narrowed query on a schedule and alert when the
//! single calculation crosses a threshold. The query shape is enforced by
//! [`TriggerQuerySpec`] at build time; the numeric bounds the API documents
//! (`frequency`, `exceeded_limit`) are checked here before any request goes
//! out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hny_query::{QuerySpec, TriggerQuerySpec};

use crate::client::Client;
use crate::error::ApiError;
use crate::resources::recipients::{attach_recipients, RecipientRef};

/// Accepted `frequency` range in seconds: one minute to one day.
pub const MIN_FREQUENCY: u64 = 60;
/// Upper bound of the accepted `frequency` range.
pub const MAX_FREQUENCY: u64 = 86_400;

/// Accepted `exceeded_limit` range: alert after 1..=5 consecutive breaches.
pub const MAX_EXCEEDED_LIMIT: u32 = 5;

/// Comparison operator of a trigger threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

/// Threshold a trigger's calculation is compared against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub op: ThresholdOp,
    pub value: f64,
    /// Consecutive breaches required before alerting (1..=5).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exceeded_limit: Option<u32>,
}

impl Threshold {
    pub fn new(op: ThresholdOp, value: f64) -> Self {
        Self {
            op,
            value,
            exceeded_limit: None,
        }
    }

    #[must_use]
    pub fn exceeded_limit(mut self, limit: u32) -> Self {
        self.exceeded_limit = Some(limit);
        self
    }
}

/// When a trigger sends notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Alert once when crossing the threshold, again when recovering.
    OnChange,
    /// Alert on every evaluation while the threshold is breached.
    OnTrue,
}

/// A trigger as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub threshold: Threshold,
    pub frequency: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<AlertType>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered: Option<bool>,
    #[serde(default)]
    pub recipients: Vec<RecipientRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QuerySpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or replacing a trigger.
///
/// Holding a [`TriggerQuerySpec`] (not a plain [`QuerySpec`]) means the
/// query already passed the trigger-shape checks; this type only adds the
/// resource-level field bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrigger {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: TriggerQuerySpec,
    pub threshold: Threshold,
    pub frequency: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<AlertType>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub recipients: Vec<RecipientRef>,
}

impl NewTrigger {
    /// A trigger evaluating `query` against `threshold` every 15 minutes.
    pub fn new(name: impl Into<String>, query: TriggerQuerySpec, threshold: Threshold) -> Self {
        Self {
            name: name.into(),
            description: None,
            query,
            threshold,
            frequency: 900,
            alert_type: None,
            disabled: false,
            recipients: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Evaluation interval in seconds (60..=86400).
    #[must_use]
    pub fn frequency(mut self, seconds: u64) -> Self {
        self.frequency = seconds;
        self
    }

    #[must_use]
    pub fn alert_type(mut self, alert_type: AlertType) -> Self {
        self.alert_type = Some(alert_type);
        self
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Attach notification recipients, skipping duplicates.
    #[must_use]
    pub fn recipients(mut self, recipients: &[RecipientRef]) -> Self {
        attach_recipients(&mut self.recipients, recipients);
        self
    }

    /// Check the documented field bounds locally.
    ///
    /// The `frequency <= time_range * 4` ratio some docs mention is NOT
    /// checked here; the server stays authoritative for it.
    fn validate(&self) -> Result<(), ApiError> {
        if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&self.frequency) {
            return Err(ApiError::InvalidRequest {
                message: format!(
                    "frequency must be between {MIN_FREQUENCY} and {MAX_FREQUENCY} seconds, got {}",
                    self.frequency
                ),
            });
        }
        if let Some(limit) = self.threshold.exceeded_limit
            && !(1..=MAX_EXCEEDED_LIMIT).contains(&limit)
        {
            return Err(ApiError::InvalidRequest {
                message: format!(
                    "exceeded_limit must be between 1 and {MAX_EXCEEDED_LIMIT}, got {limit}"
                ),
            });
        }
        Ok(())
    }
}

/// Trigger CRUD.
pub struct Triggers<'c> {
    client: &'c Client,
}

impl<'c> Triggers<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List triggers on a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self, dataset: &str) -> Result<Vec<Trigger>, ApiError> {
        self.client.get_json(&format!("/1/triggers/{dataset}")).await
    }

    /// Fetch one trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, dataset: &str, id: &str) -> Result<Trigger, ApiError> {
        self.client
            .get_json(&format!("/1/triggers/{dataset}/{id}"))
            .await
    }

    /// Create a trigger. Field bounds are checked locally first, so a bad
    /// `frequency` never costs a round trip.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for local bound violations, or
    /// any terminal failure from the server.
    pub async fn create(&self, dataset: &str, trigger: &NewTrigger) -> Result<Trigger, ApiError> {
        trigger.validate()?;
        self.client
            .post_json(&format!("/1/triggers/{dataset}"), trigger)
            .await
    }

    /// Replace a trigger.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub async fn update(
        &self,
        dataset: &str,
        id: &str,
        trigger: &NewTrigger,
    ) -> Result<Trigger, ApiError> {
        trigger.validate()?;
        self.client
            .put_json(&format!("/1/triggers/{dataset}/{id}"), trigger)
            .await
    }

    /// Delete a trigger.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/triggers/{dataset}/{id}"))
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::resources::recipients::RecipientType;
    use hny_query::{Filter, QueryBuilder};

    fn trigger_query() -> TriggerQuerySpec {
        QueryBuilder::new()
            .count()
            .filter(Filter::gte("status_code", 500))
            .time_range(900)
            .build_for_trigger()
            .unwrap()
    }

    fn new_trigger() -> NewTrigger {
        NewTrigger::new(
            "5xx spike",
            trigger_query(),
            Threshold::new(ThresholdOp::Gt, 100.0),
        )
    }

    #[test]
    fn defaults_are_sane() {
        let trigger = new_trigger();
        assert_eq!(trigger.frequency, 900);
        assert!(!trigger.disabled);
        assert!(trigger.recipients.is_empty());
        assert!(trigger.validate().is_ok());
    }

    #[test]
    fn frequency_bounds_are_enforced() {
        assert!(new_trigger().frequency(59).validate().is_err());
        assert!(new_trigger().frequency(86_401).validate().is_err());
        assert!(new_trigger().frequency(60).validate().is_ok());
        assert!(new_trigger().frequency(86_400).validate().is_ok());
    }

    #[test]
    fn exceeded_limit_bounds_are_enforced() {
        let bad = NewTrigger::new(
            "t",
            trigger_query(),
            Threshold::new(ThresholdOp::Gt, 1.0).exceeded_limit(6),
        );
        assert!(bad.validate().is_err());

        let zero = NewTrigger::new(
            "t",
            trigger_query(),
            Threshold::new(ThresholdOp::Gt, 1.0).exceeded_limit(0),
        );
        assert!(zero.validate().is_err());

        let ok = NewTrigger::new(
            "t",
            trigger_query(),
            Threshold::new(ThresholdOp::Gt, 1.0).exceeded_limit(3),
        );
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn recipients_attach_without_duplicates() {
        let trigger = new_trigger()
            .recipients(&[
                RecipientRef::by_id("rcp-1"),
                RecipientRef::inline(RecipientType::Email, "oncall@example.com"),
            ])
            .recipients(&[RecipientRef::by_id("rcp-1")]);
        assert_eq!(trigger.recipients.len(), 2);
    }

    #[test]
    fn serializes_in_upstream_shape() {
        let trigger = new_trigger().frequency(300);
        let json = serde_json::to_value(&trigger).unwrap();
        assert_eq!(json["name"], "5xx spike");
        assert_eq!(json["frequency"], 300);
        assert_eq!(json["threshold"]["op"], ">");
        assert_eq!(json["query"]["time_range"], 900);
        assert_eq!(json["query"]["calculations"][0]["op"], "COUNT");
        // The trigger query serializes transparently, not nested under a wrapper.
        assert!(json["query"].get("0").is_none());
    }
}
