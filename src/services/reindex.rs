// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rebuild the search index from the record store.
//!
//! The index is a read model. Any record whose write was lost (index down,
//! core wiped) is restored by pushing every stored user and listing again.

use crate::db::RecordStore;
use crate::search::{ListingIndex, UserIndex};
use serde::Serialize;

/// Outcome of pushing one entity type to the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReindexCounts {
    /// Documents written successfully.
    pub indexed: u32,
    /// Documents the index rejected or never received.
    pub failed: u32,
    /// Record ids that failed.
    pub failed_ids: Vec<u64>,
}

impl ReindexCounts {
    fn record(&mut self, id: u64, ok: bool) {
        if ok {
            self.indexed += 1;
        } else {
            self.failed += 1;
            self.failed_ids.push(id);
        }
    }
}

/// Result of a full reindex.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReindexSummary {
    pub users: ReindexCounts,
    pub listings: ReindexCounts,
}

impl ReindexSummary {
    /// Returns true if every record was written.
    pub fn is_complete_success(&self) -> bool {
        self.users.failed == 0 && self.listings.failed == 0
    }
}

/// Push every stored user, then every stored listing, to the index.
///
/// A failed write is logged and counted; the remaining records are still sent.
pub async fn reindex(
    store: &RecordStore,
    users: &UserIndex,
    listings: &ListingIndex,
) -> ReindexSummary {
    let mut summary = ReindexSummary::default();

    for user in store.users() {
        let result = users.add(&user).await;
        if let Err(e) = &result {
            tracing::warn!(user_id = user.id, error = %e, "Failed to reindex user");
        }
        summary.users.record(user.id, result.is_ok());
    }

    for listing in store.listings() {
        let result = listings.add(&listing).await;
        if let Err(e) = &result {
            tracing::warn!(listing_id = listing.id, error = %e, "Failed to reindex listing");
        }
        summary.listings.record(listing.id, result.is_ok());
    }

    tracing::info!(
        users = summary.users.indexed,
        listings = summary.listings.indexed,
        failed = summary.users.failed + summary.listings.failed,
        "Reindex finished"
    );
    summary
}
