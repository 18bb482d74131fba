// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User documents in the search index.

use super::client::{record_of, EntityIndex, IndexClient, IndexError, IndexedEntity, Page, SearchRequest};
use super::codec::{FieldKind, Record, Schema};
use crate::models::User;
use serde_json::Value;

/// Duplicate of `email` analysed for partial (ngram) matching.
const EMAIL_NGRAM: &str = "email_ngram";

impl IndexedEntity for User {
    fn schema() -> Schema {
        Schema::entity("user").with_field(EMAIL_NGRAM, FieldKind::Ngram)
    }

    fn to_record(&self) -> Result<Record, IndexError> {
        let mut record = record_of(self)?;
        record.insert(EMAIL_NGRAM.to_string(), Value::String(self.email.clone()));
        Ok(record)
    }
}

#[derive(Clone)]
pub struct UserIndex {
    index: EntityIndex<User>,
}

impl UserIndex {
    pub fn new(client: IndexClient) -> Self {
        Self {
            index: EntityIndex::new(client),
        }
    }

    pub async fn add(&self, user: &User) -> Result<(), IndexError> {
        self.index.add(user).await
    }

    /// Exact, case-insensitive email lookup.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, IndexError> {
        let mut filter = Record::new();
        filter.insert("email".to_string(), Value::String(email.to_lowercase()));
        self.first_match(filter).await
    }

    pub async fn find_by_id(&self, id: u64) -> Result<Option<User>, IndexError> {
        let mut filter = Record::new();
        filter.insert("id".to_string(), Value::from(id));
        self.first_match(filter).await
    }

    /// Partial email match through the ngram field.
    pub async fn search_by_email(&self, email: &str, page: Page) -> Result<(Vec<User>, u64), IndexError> {
        let mut filter = Record::new();
        filter.insert(EMAIL_NGRAM.to_string(), Value::String(email.to_lowercase()));
        self.index.search(SearchRequest::new(filter, page)).await
    }

    pub async fn all_users(&self, page: Page) -> Result<(Vec<User>, u64), IndexError> {
        self.index.search(SearchRequest::new(Record::new(), page)).await
    }

    async fn first_match(&self, filter: Record) -> Result<Option<User>, IndexError> {
        let (users, _) = self
            .index
            .search(SearchRequest::new(filter, Page { offset: 0, limit: 1 }))
            .await?;
        Ok(users.into_iter().next())
    }
}
