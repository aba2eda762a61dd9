//! API-key handling.
//!
//! Keys live in `secrecy` boxes so they zeroize on drop and stay out of
//! Debug output and logs; the raw value is only reachable through
//! [`ApiKey::reveal`], at the point an outbound request is signed.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

/// A backend API key, redacted everywhere except [`ApiKey::reveal`].
pub struct ApiKey(SecretBox<str>);

impl ApiKey {
    pub fn new(key: impl Into<Box<str>>) -> Self {
        Self(SecretBox::new(key.into()))
    }

    /// The raw key, for signing an outbound request.
    pub fn reveal(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.reveal())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
