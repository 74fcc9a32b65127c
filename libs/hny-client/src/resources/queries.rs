//! Saved queries and query results.
//!
//! Running a query is a two-step protocol upstream: persist the query
//! (`POST /1/queries/{dataset}`), then create a query result referencing it
//! and poll until the result is complete. [`Queries::run`] wraps the whole
//! dance.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use hny_query::{BuildError, QueryBuilder, QuerySpec};

use crate::client::Client;
use crate::error::ApiError;

/// Either a builder still to be finalized, or an already-built spec.
///
/// Resource calls accept `impl Into<QuerySource>` so call sites can hand
/// over whichever they hold; the discriminant is resolved exactly once, at
/// the call boundary.
#[derive(Debug, Clone)]
pub enum QuerySource {
    Builder(QueryBuilder),
    Spec(QuerySpec),
}

impl QuerySource {
    /// Resolve to a concrete spec, finalizing a builder if needed.
    ///
    /// # Errors
    ///
    /// Returns the builder's [`BuildError`] when finalization fails.
    pub fn resolve(self) -> Result<QuerySpec, BuildError> {
        match self {
            Self::Builder(builder) => builder.build(),
            Self::Spec(spec) => Ok(spec),
        }
    }
}

impl From<QueryBuilder> for QuerySource {
    fn from(builder: QueryBuilder) -> Self {
        Self::Builder(builder)
    }
}

impl From<QuerySpec> for QuerySource {
    fn from(spec: QuerySpec) -> Self {
        Self::Spec(spec)
    }
}

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        ApiError::InvalidRequest {
            message: format!("invalid query specification: {err}"),
        }
    }
}

/// A persisted query: the spec plus its server-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub id: String,
    #[serde(flatten)]
    pub spec: QuerySpec,
}

/// Reference payload for creating a query result.
#[derive(Debug, Clone, Serialize)]
struct QueryResultRequest<'a> {
    query_id: &'a str,
    disable_series: bool,
}

/// Result rows and time series of a completed query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResultData {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default)]
    pub series: Vec<Value>,
}

/// A query result, possibly still being computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub id: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub data: Option<QueryResultData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Value>,
}

/// Query and query-result operations.
pub struct Queries<'c> {
    client: &'c Client,
}

impl<'c> Queries<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// Persist a query against a dataset.
    ///
    /// Accepts a [`QueryBuilder`] or a finished [`QuerySpec`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] when a builder fails local
    /// validation — nothing is sent in that case.
    pub async fn create(
        &self,
        dataset: &str,
        query: impl Into<QuerySource>,
    ) -> Result<Query, ApiError> {
        let spec = query.into().resolve()?;
        self.client
            .post_json(&format!("/1/queries/{dataset}"), &spec)
            .await
    }

    /// Fetch a persisted query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, dataset: &str, id: &str) -> Result<Query, ApiError> {
        self.client
            .get_json(&format!("/1/queries/{dataset}/{id}"))
            .await
    }

    /// Start computing a result for a persisted query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn create_result(
        &self,
        dataset: &str,
        query_id: &str,
    ) -> Result<QueryResult, ApiError> {
        self.client
            .post_json(
                &format!("/1/query_results/{dataset}"),
                &QueryResultRequest {
                    query_id,
                    disable_series: false,
                },
            )
            .await
    }

    /// Poll a query result once.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get_result(&self, dataset: &str, id: &str) -> Result<QueryResult, ApiError> {
        self.client
            .get_json(&format!("/1/query_results/{dataset}/{id}"))
            .await
    }

    /// Persist a query, start a result, and poll until it completes.
    ///
    /// Polling backs off from 250ms to 2s between checks and gives up after
    /// `deadline` (wall clock, measured locally).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Timeout`] when the result is still incomplete at
    /// the deadline, or any earlier terminal failure.
    pub async fn run(
        &self,
        dataset: &str,
        query: impl Into<QuerySource>,
        deadline: Duration,
    ) -> Result<QueryResult, ApiError> {
        let query = self.create(dataset, query).await?;
        let started = self.create_result(dataset, &query.id).await?;
        if started.complete {
            return Ok(started);
        }

        let give_up = tokio::time::Instant::now() + deadline;
        let mut poll_interval = Duration::from_millis(250);

        loop {
            if tokio::time::Instant::now() >= give_up {
                return Err(ApiError::Timeout {
                    message: format!(
                        "query result {} incomplete after {deadline:?}",
                        started.id
                    ),
                });
            }
            tokio::time::sleep(poll_interval).await;
            poll_interval = (poll_interval * 2).min(Duration::from_secs(2));

            let result = self.get_result(dataset, &started.id).await?;
            if result.complete {
                return Ok(result);
            }
            tracing::debug!(result_id = %started.id, "query result not ready, polling again");
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use hny_query::Filter;

    #[test]
    fn source_resolves_builder_once() {
        let source: QuerySource = QueryBuilder::new()
            .count()
            .filter(Filter::gte("status_code", 500))
            .time_range(900)
            .into();
        let spec = source.resolve().unwrap();
        assert_eq!(spec.time_range, Some(900));
    }

    #[test]
    fn source_passes_spec_through() {
        let spec = QueryBuilder::new().count().build().unwrap();
        let source: QuerySource = spec.clone().into();
        assert_eq!(source.resolve().unwrap(), spec);
    }

    #[test]
    fn builder_failure_maps_to_invalid_request() {
        let source: QuerySource = QueryBuilder::new().count().limit(0).into();
        let err: ApiError = source.resolve().unwrap_err().into();
        assert!(matches!(err, ApiError::InvalidRequest { .. }));
    }

    #[test]
    fn query_flattens_spec_on_the_wire() {
        let spec = QueryBuilder::new().count().time_range(900).build().unwrap();
        let query = Query {
            id: "abc123".to_owned(),
            spec,
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["id"], "abc123");
        assert_eq!(json["time_range"], 900);
        assert_eq!(json["calculations"][0]["op"], "COUNT");
    }
}
