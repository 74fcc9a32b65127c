//! SLO CRUD (per dataset).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ApiError;

/// Largest meaningful `target_per_million` (six nines would be 999999).
pub const MAX_TARGET_PER_MILLION: u32 = 999_999;

/// Reference to the derived column acting as the SLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliRef {
    pub alias: String,
}

/// A service level objective as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slo {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sli: SliRef,
    pub time_period_days: u32,
    pub target_per_million: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or replacing an SLO.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSlo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub sli: SliRef,
    pub time_period_days: u32,
    /// Success target out of one million events, e.g. 999000 for 99.9%.
    pub target_per_million: u32,
}

impl NewSlo {
    pub fn new(
        name: impl Into<String>,
        sli_alias: impl Into<String>,
        time_period_days: u32,
        target_per_million: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            sli: SliRef {
                alias: sli_alias.into(),
            },
            time_period_days,
            target_per_million,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Check the documented field bounds locally.
    fn validate(&self) -> Result<(), ApiError> {
        if self.time_period_days == 0 {
            return Err(ApiError::InvalidRequest {
                message: "time_period_days must be at least 1".to_owned(),
            });
        }
        if !(1..=MAX_TARGET_PER_MILLION).contains(&self.target_per_million) {
            return Err(ApiError::InvalidRequest {
                message: format!(
                    "target_per_million must be between 1 and {MAX_TARGET_PER_MILLION}, got {}",
                    self.target_per_million
                ),
            });
        }
        Ok(())
    }
}

/// SLO CRUD.
pub struct Slos<'c> {
    client: &'c Client,
}

impl<'c> Slos<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List SLOs on a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self, dataset: &str) -> Result<Vec<Slo>, ApiError> {
        self.client.get_json(&format!("/1/slos/{dataset}")).await
    }

    /// Fetch one SLO.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, dataset: &str, id: &str) -> Result<Slo, ApiError> {
        self.client.get_json(&format!("/1/slos/{dataset}/{id}")).await
    }

    /// Create an SLO. Field bounds are checked locally first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] for local bound violations, or
    /// any terminal failure from the server.
    pub async fn create(&self, dataset: &str, slo: &NewSlo) -> Result<Slo, ApiError> {
        slo.validate()?;
        self.client
            .post_json(&format!("/1/slos/{dataset}"), slo)
            .await
    }

    /// Replace an SLO.
    ///
    /// # Errors
    ///
    /// As [`create`](Self::create).
    pub async fn update(&self, dataset: &str, id: &str, slo: &NewSlo) -> Result<Slo, ApiError> {
        slo.validate()?;
        self.client
            .put_json(&format!("/1/slos/{dataset}/{id}"), slo)
            .await
    }

    /// Delete an SLO.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, dataset: &str, id: &str) -> Result<(), ApiError> {
        self.client
            .delete_resource(&format!("/1/slos/{dataset}/{id}"))
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn target_bounds_are_enforced() {
        assert!(NewSlo::new("s", "sli_ok", 30, 0).validate().is_err());
        assert!(NewSlo::new("s", "sli_ok", 30, 1_000_000).validate().is_err());
        assert!(NewSlo::new("s", "sli_ok", 30, 999_000).validate().is_ok());
    }

    #[test]
    fn time_period_must_be_positive() {
        assert!(NewSlo::new("s", "sli_ok", 0, 999_000).validate().is_err());
        assert!(NewSlo::new("s", "sli_ok", 1, 999_000).validate().is_ok());
    }
}
