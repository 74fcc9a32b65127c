//! Burn alert CRUD (per SLO).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;
use crate::resources::recipients::{attach_recipients, RecipientRef};

/// What a burn alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnAlertType {
    /// Alert when the error budget would be exhausted within
    /// `exhaustion_minutes`.
    ExhaustionTime,
    /// Alert when the budget drops faster than a threshold over a window.
    BudgetRate,
}

/// Reference to the SLO a burn alert belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloRef {
    pub id: String,
}

/// A burn alert as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnAlert {
    pub id: String,
    pub alert_type: BurnAlertType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhaustion_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_rate_window_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_rate_decrease_threshold_per_million: Option<u32>,
    pub slo: SloRef,
    #[serde(default)]
    pub recipients: Vec<RecipientRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or replacing a burn alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBurnAlert {
    pub alert_type: BurnAlertType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhaustion_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_rate_window_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_rate_decrease_threshold_per_million: Option<u32>,
    pub slo: SloRef,
    #[serde(default)]
    pub recipients: Vec<RecipientRef>,
}

impl NewBurnAlert {
    /// An exhaustion-time alert: fire when the budget would run out within
    /// `exhaustion_minutes`.
    pub fn exhaustion_time(slo_id: impl Into<String>, exhaustion_minutes: u32) -> Self {
        Self {
            alert_type: BurnAlertType::ExhaustionTime,
            exhaustion_minutes: Some(exhaustion_minutes),
            budget_rate_window_minutes: None,
            budget_rate_decrease_threshold_per_million: None,
            slo: SloRef { id: slo_id.into() },
            recipients: Vec::new(),
        }
    }

    /// A budget-rate alert: fire when the budget drops by more than
    /// `threshold_per_million` within `window_minutes`.
    pub fn budget_rate(
        slo_id: impl Into<String>,
        window_minutes: u32,
        threshold_per_million: u32,
    ) -> Self {
        Self {
            alert_type: BurnAlertType::BudgetRate,
            exhaustion_minutes: None,
            budget_rate_window_minutes: Some(window_minutes),
            budget_rate_decrease_threshold_per_million: Some(threshold_per_million),
            slo: SloRef { id: slo_id.into() },
            recipients: Vec::new(),
        }
    }

    /// Attach notification recipients, skipping duplicates.
    #[must_use]
    pub fn recipients(mut self, recipients: &[RecipientRef]) -> Self {
        attach_recipients(&mut self.recipients, recipients);
        self
    }

    /// Check the documented field requirements locally.
    fn validate(&self) -> Result<(), ApiError> {
        match self.alert_type {
            BurnAlertType::ExhaustionTime => {
                if self.exhaustion_minutes.is_none() {
                    return Err(ApiError::InvalidRequest {
                        message: "exhaustion_time alerts require exhaustion_minutes".to_owned(),
                    });
                }
            }
            BurnAlertType::BudgetRate => {
                let window = self.budget_rate_window_minutes.unwrap_or(0);
                if window < 60 {
                    return Err(ApiError::InvalidRequest {
                        message: format!(
                            "budget_rate_window_minutes must be at least 60, got {window}"
                        ),
                    });
                }
                if self.budget_rate_decrease_threshold_per_million.is_none() {
                    return Err(ApiError::InvalidRequest {
                        message: "budget_rate alerts require a decrease threshold".to_owned(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Burn alert CRUD.
pub struct BurnAlerts<'c> {
    client: &'c Client,
}

impl<'c> BurnAlerts<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List burn alerts attached to one SLO.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self, dataset: &str, slo_id: &str) -> Result<Vec<BurnAlert>, ApiError> {
        self.client
            .get_json(&format!("/1/burn_alerts/{dataset}?slo_id={slo_id}"))
            .await
    }

    /// Fetch one burn alert.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, dataset: &str, id: &str) -> Result<BurnAlert, ApiError> {
        self.client
            .get_json(&format!("/1/burn_alerts/{dataset}/{id}"))
            .await
    }

    /// Create a burn alert. Field requirements are checked locally first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for local violations, or any
    /// terminal failure from the server.
    pub async fn create(&self, dataset: &str, alert: &NewBurnAlert) -> Result<BurnAlert, ApiError> {
        alert.validate()?;
        self.client
            .post_json(&format!("/1/burn_alerts/{dataset}"), alert)
            .await
    }

    /// Replace a burn alert.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub async fn update(
        &self,
        dataset: &str,
        id: &str,
        alert: &NewBurnAlert,
    ) -> Result<BurnAlert, ApiError> {
        alert.validate()?;
        self.client
            .put_json(&format!("/1/burn_alerts/{dataset}/{id}"), alert)
            .await
    }

    /// Delete a burn alert.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/burn_alerts/{dataset}/{id}"))
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_time_requires_minutes() {
        let ok = NewBurnAlert::exhaustion_time("slo-1", 120);
        assert!(ok.validate().is_ok());

        let mut broken = ok.clone();
        broken.exhaustion_minutes = None;
        assert!(broken.validate().is_err());
    }

    #[test]
    fn budget_rate_requires_window_and_threshold() {
        assert!(NewBurnAlert::budget_rate("slo-1", 60, 1000).validate().is_ok());
        assert!(NewBurnAlert::budget_rate("slo-1", 30, 1000).validate().is_err());

        let mut missing_threshold = NewBurnAlert::budget_rate("slo-1", 60, 1000);
        missing_threshold.budget_rate_decrease_threshold_per_million = None;
        assert!(missing_threshold.validate().is_err());
    }

    #[test]
    fn alert_type_wire_names() {
        assert_eq!(
            serde_json::to_value(BurnAlertType::ExhaustionTime).unwrap(),
            serde_json::json!("exhaustion_time")
        );
    }
}
