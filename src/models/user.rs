// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model and the OAuth credential pair carried by the session cookie.

use serde::{Deserialize, Serialize};

/// Identity record, as stored and as indexed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    /// Always lower-cased
    pub email: String,
    /// Local part of `email`
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    /// Derive the username from an email address.
    ///
    /// Returns `None` unless the address has exactly one `@` with a non-empty
    /// local part.
    pub fn username_for(email: &str) -> Option<String> {
        let lowered = email.to_lowercase();
        let mut parts = lowered.split('@');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(local), Some(_), None) if !local.is_empty() => Some(local.to_string()),
            _ => None,
        }
    }
}

/// Access token plus optional refresh token.
///
/// JSON-serialized and encrypted, this is the value of the credentials cookie.
/// Bearer-header clients only ever have the access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}
