// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process record store with typed operations.
//!
//! Provides:
//! - Users (created on first login, unique by username)
//! - Listings (created by an authenticated coordinator)
//!
//! The search index is only a read model; records are created here first and
//! then indexed by the caller.

use crate::error::AppError;
use crate::models::{Coordinator, Listing, User};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Fields a client supplies when creating a listing.
#[derive(Debug, Clone, Deserialize)]
pub struct NewListing {
    pub title: String,
    pub description: String,
}

#[derive(Default)]
struct Tables {
    users: DashMap<u64, User>,
    /// username -> user id
    usernames: DashMap<String, u64>,
    listings: DashMap<u64, Listing>,
    next_user_id: AtomicU64,
    next_listing_id: AtomicU64,
}

/// Shared handle to the record store.
#[derive(Clone, Default)]
pub struct RecordStore {
    tables: Arc<Tables>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Find the user owning a verified email, creating it if needed.
    ///
    /// The username is the lower-cased local part. Returns the user and
    /// whether it was created by this call. A different email that maps to
    /// an existing username is rejected.
    pub fn find_or_create_user(&self, email: &str) -> Result<(User, bool), AppError> {
        let email = email.to_lowercase();
        let username = User::username_for(&email)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid email address: {}", email)))?;

        match self.tables.usernames.entry(username.clone()) {
            Entry::Occupied(slot) => {
                let existing = self
                    .get_user(*slot.get())
                    .filter(|user| user.email == email)
                    .ok_or_else(|| {
                        AppError::Database(format!(
                            "A user with username {} already exists",
                            username
                        ))
                    })?;
                Ok((existing, false))
            }
            Entry::Vacant(slot) => {
                let id = self.tables.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;

                let user = User {
                    id,
                    email,
                    username,
                    first_name: None,
                    last_name: None,
                    is_active: true,
                    is_superuser: false,
                };
                self.tables.users.insert(id, user.clone());
                slot.insert(id);

                tracing::info!(user_id = id, username = %user.username, "User created");
                Ok((user, true))
            }
        }
    }

    pub fn get_user(&self, id: u64) -> Option<User> {
        self.tables.users.get(&id).map(|entry| entry.value().clone())
    }

    /// All users, ordered by id.
    pub fn users(&self) -> Vec<User> {
        let mut users: Vec<User> = self
            .tables
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by_key(|user| user.id);
        users
    }

    // ─── Listing Operations ──────────────────────────────────────

    /// Create a listing coordinated by `coordinator`.
    pub fn create_listing(&self, new: NewListing, coordinator: &User) -> Listing {
        let id = self.tables.next_listing_id.fetch_add(1, Ordering::SeqCst) + 1;

        let listing = Listing {
            id,
            title: new.title,
            description: new.description,
            updated_by_id: Some(coordinator.id),
            updated_at: Some(chrono::Utc::now().to_rfc3339()),
            coordinators: vec![Coordinator {
                id: coordinator.id,
                email: coordinator.email.clone(),
            }],
        };
        self.tables.listings.insert(id, listing.clone());

        tracing::info!(listing_id = id, coordinator_id = coordinator.id, "Listing created");
        listing
    }

    /// All listings, ordered by id.
    pub fn listings(&self) -> Vec<Listing> {
        let mut listings: Vec<Listing> = self
            .tables
            .listings
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        listings.sort_by_key(|listing| listing.id);
        listings
    }
}
