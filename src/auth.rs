//! Caller identity
//!
//! Sessions are issued upstream; an authenticating proxy forwards the
//! caller's user id in a request header.

use crate::error::{ParleyError, Result};
use axum::http::{HeaderMap, HeaderName};

/// Resolves the authenticated user for a request
pub trait IdentityResolver: Send + Sync {
    /// Return the caller's user id
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Auth` when no usable identity is present
    fn resolve(&self, headers: &HeaderMap) -> Result<String>;
}

/// Reads the user id from a single trusted header
#[derive(Debug, Clone)]
pub struct HeaderIdentity {
    header: HeaderName,
}

impl HeaderIdentity {
    /// Create a resolver for `header`
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Config` if `header` is not a valid header name
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::auth::{HeaderIdentity, IdentityResolver};
    /// use axum::http::HeaderMap;
    ///
    /// let resolver = HeaderIdentity::new("x-user-id").unwrap();
    /// let mut headers = HeaderMap::new();
    /// headers.insert("x-user-id", "user_123".parse().unwrap());
    /// assert_eq!(resolver.resolve(&headers).unwrap(), "user_123");
    /// ```
    pub fn new(header: &str) -> Result<Self> {
        let header = HeaderName::from_bytes(header.trim().to_lowercase().as_bytes())
            .map_err(|e| ParleyError::Config(format!("Invalid identity header: {}", e)))?;
        Ok(Self { header })
    }
}

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Result<String> {
        let user = headers
            .get(&self.header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user| !user.is_empty() && !user.contains('/'))
            .ok_or(ParleyError::Auth)?;
        Ok(user.to_string())
    }
}
