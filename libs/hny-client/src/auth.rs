//! Credential shapes and request decoration.
//!
//! Exactly one credential variant is active per client. Validation happens
//! once, when the client is built; decoration is a pure function from
//! credentials to header pairs and never fails per request.

use http::header::{HeaderName, HeaderValue, AUTHORIZATION};

use crate::client::ConfigError;

/// Header carrying a plain API key.
pub const TEAM_KEY_HEADER: &str = "x-honeycomb-team";

/// Credentials for the upstream API.
#[derive(Clone)]
pub enum Credentials {
    /// Single API key, sent as `X-Honeycomb-Team`.
    ApiKey(String),
    /// Management key/secret pair, sent as `Authorization: Bearer key:secret`.
    Management { key: String, secret: String },
}

impl Credentials {
    /// Management-pair convenience constructor.
    pub fn management(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::Management {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Check the credentials are usable: non-empty and header-safe.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCredentials`] for empty or
    /// non-header-safe values.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::ApiKey(key) => {
                if key.is_empty() {
                    return Err(ConfigError::InvalidCredentials {
                        reason: "API key is empty".to_owned(),
                    });
                }
                HeaderValue::from_str(key).map_err(|_| ConfigError::InvalidCredentials {
                    reason: "API key contains characters not valid in a header".to_owned(),
                })?;
            }
            Self::Management { key, secret } => {
                if key.is_empty() || secret.is_empty() {
                    return Err(ConfigError::InvalidCredentials {
                        reason: "management key and secret must both be non-empty".to_owned(),
                    });
                }
                HeaderValue::from_str(&format!("Bearer {key}:{secret}")).map_err(|_| {
                    ConfigError::InvalidCredentials {
                        reason: "management credentials contain characters not valid in a header"
                            .to_owned(),
                    }
                })?;
            }
        }
        Ok(())
    }

    /// Header pairs decorating an outgoing request.
    ///
    /// Infallible for validated credentials; [`validate`](Self::validate)
    /// ran at client construction.
    pub(crate) fn header_pairs(&self) -> Vec<(HeaderName, HeaderValue)> {
        match self {
            Self::ApiKey(key) => match HeaderValue::from_str(key) {
                Ok(value) => vec![(HeaderName::from_static(TEAM_KEY_HEADER), value)],
                Err(_) => Vec::new(),
            },
            Self::Management { key, secret } => {
                match HeaderValue::from_str(&format!("Bearer {key}:{secret}")) {
                    Ok(value) => vec![(AUTHORIZATION, value)],
                    Err(_) => Vec::new(),
                }
            }
        }
    }
}

// Keys are secrets; never let Debug leak them into logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("Credentials::ApiKey(<redacted>)"),
            Self::Management { .. } => f.write_str("Credentials::Management(<redacted>)"),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn api_key_sets_team_header() {
        let creds = Credentials::ApiKey("hcaik_test123".to_owned());
        let headers = creds.header_pairs();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0.as_str(), TEAM_KEY_HEADER);
        assert_eq!(headers[0].1.to_str().unwrap(), "hcaik_test123");
    }

    #[test]
    fn management_key_sets_bearer_pair() {
        let creds = Credentials::management("mgmt_key", "mgmt_secret");
        let headers = creds.header_pairs();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].0, AUTHORIZATION);
        assert_eq!(headers[0].1.to_str().unwrap(), "Bearer mgmt_key:mgmt_secret");
    }

    #[test]
    fn empty_credentials_fail_validation() {
        assert!(Credentials::ApiKey(String::new()).validate().is_err());
        assert!(Credentials::management("", "secret").validate().is_err());
        assert!(Credentials::management("key", "").validate().is_err());
        assert!(Credentials::ApiKey("ok".to_owned()).validate().is_ok());
    }

    #[test]
    fn debug_never_prints_key_material() {
        let debug = format!("{:?}", Credentials::ApiKey("hcaik_secret".to_owned()));
        assert!(!debug.contains("hcaik_secret"));
    }
}
