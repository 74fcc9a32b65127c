//! Introspection of the authenticated key.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::Client;
use crate::error::ApiError;

/// Team or environment the key is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

/// What the current key is and may do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<String>,
    /// Permission flags by capability name (`"triggers"`, `"boards"`, ...).
    #[serde(default)]
    pub api_key_access: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ScopeInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<ScopeInfo>,
}

impl AuthInfo {
    /// Whether the key carries the named capability.
    #[must_use]
    pub fn can(&self, capability: &str) -> bool {
        self.api_key_access.get(capability).copied().unwrap_or(false)
    }
}

/// Key introspection endpoint.
pub struct AuthMeta<'c> {
    client: &'c Client,
}

impl<'c> AuthMeta<'c> {
    pub(crate) fn new(client: &'c Client) -> Self {
        Self { client }
    }

    /// Describe the authenticated key: scopes, team, environment.
    ///
    /// Useful as a connectivity/credentials check before doing real work.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Auth`] for unusable keys.
    pub async fn get(&self) -> Result<AuthInfo, ApiError> {
        self.client.get_json("/1/auth").await
    }
}
