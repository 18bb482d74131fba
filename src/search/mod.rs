// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Search index layer: field codec, HTTP client and per-entity indexes.

pub mod client;
pub mod codec;
pub mod listings;
pub mod users;

pub use client::{
    build_query, EntityIndex, IndexClient, IndexError, IndexedEntity, Page, SearchRequest,
    SelectQuery, SelectResult,
};
pub use codec::{CodecError, Document, FieldKind, Record, Schema};
pub use listings::ListingIndex;
pub use users::UserIndex;
