//! Board CRUD.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hny_query::QuerySpec;

use crate::client::Client;
use crate::error::ApiError;
use crate::resources::queries::QuerySource;

/// Board layout style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardStyle {
    List,
    Visual,
}

/// How a board query is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStyle {
    Graph,
    Table,
    Combo,
}

/// One query panel on a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Dataset the panel queries; environment-wide when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    pub query: QuerySpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_style: Option<QueryStyle>,
}

impl BoardQuery {
    /// A panel over `dataset`, accepting a builder or a finished spec.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidRequest`] when a builder fails local
    /// validation.
    pub fn new(dataset: &str, query: impl Into<QuerySource>) -> Result<Self, ApiError> {
        Ok(Self {
            caption: None,
            dataset: Some(dataset.to_owned()),
            query: query.into().resolve()?,
            query_style: None,
        })
    }

    #[must_use]
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    #[must_use]
    pub fn style(mut self, style: QueryStyle) -> Self {
        self.query_style = Some(style);
        self
    }
}

/// A board as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<BoardStyle>,
    #[serde(default)]
    pub queries: Vec<BoardQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating or replacing a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBoard {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<BoardStyle>,
    #[serde(default)]
    pub queries: Vec<BoardQuery>,
}

impl NewBoard {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            style: None,
            queries: Vec::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn style(mut self, style: BoardStyle) -> Self {
        self.style = Some(style);
        self
    }

    #[must_use]
    pub fn query(mut self, query: BoardQuery) -> Self {
        self.queries.push(query);
        self
    }
}

/// Board CRUD. Boards are team-scoped.
pub struct Boards<'c> {
    client: &'c Client,
}

impl<'c> Boards<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// List all boards.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn list(&self) -> Result<Vec<Board>, ApiError> {
        self.client.get_json("/1/boards").await
    }

    /// Fetch one board.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for unknown ids.
    pub async fn get(&self, id: &str) -> Result<Board, ApiError> {
        self.client.get_json(&format!("/1/boards/{id}")).await
    }

    /// Create a board.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] when the server rejects the payload.
    pub async fn create(&self, board: &NewBoard) -> Result<Board, ApiError> {
        self.client.post_json("/1/boards", board).await
    }

    /// Replace a board.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn update(&self, id: &str, board: &NewBoard) -> Result<Board, ApiError> {
        self.client.put_json(&format!("/1/boards/{id}"), board).await
    }

    /// Delete a board.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on any terminal failure.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete_resource(&format!("/1/boards/{id}")).await
    }
}
