// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod listing;
pub mod user;

pub use listing::{Coordinator, Listing};
pub use user::{CredentialPair, User};
