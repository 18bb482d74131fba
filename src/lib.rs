// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Listings backend: OAuth-backed sessions over a search-indexed read model.
//!
//! This crate provides the API for signing users in through an external
//! identity provider, keeping their session in an encrypted cookie, and
//! querying users and listings stored in a search index.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod search;
pub mod services;

use config::Config;
use db::RecordStore;
use middleware::AuthGate;
use search::{IndexClient, ListingIndex, UserIndex};
use services::{Cipher, TokenManager};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub token_manager: TokenManager,
    pub auth_gate: AuthGate,
    pub users: UserIndex,
    pub listings: ListingIndex,
    pub store: RecordStore,
}

impl AppState {
    /// Wire up all components from configuration.
    pub fn new(config: Config, cipher: Cipher) -> Self {
        let index = IndexClient::new(config.search_index_base());
        let users = UserIndex::new(index.clone());
        let listings = ListingIndex::new(index);
        let token_manager =
            TokenManager::new(config.provider.clone(), config.cookie.clone(), cipher);
        let auth_gate = AuthGate::new(token_manager.clone(), users.clone());

        Self {
            config,
            token_manager,
            auth_gate,
            users,
            listings,
            store: RecordStore::new(),
        }
    }
}
