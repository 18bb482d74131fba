// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Listing model.

use serde::{Deserialize, Serialize};

/// A user coordinating a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinator {
    pub id: u64,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// User who last changed the listing
    #[serde(default)]
    pub updated_by_id: Option<u64>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub coordinators: Vec<Coordinator>,
}
