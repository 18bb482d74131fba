// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - cookie encryption, identity provider integration and
//! index maintenance.

pub mod crypto;
pub mod reindex;
pub mod token_manager;

pub use crypto::{Cipher, CipherError};
pub use reindex::{reindex, ReindexCounts, ReindexSummary};
pub use token_manager::TokenManager;
