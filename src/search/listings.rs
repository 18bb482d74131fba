// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Listing documents with nested coordinator child documents.
//!
//! A listing is stored as a parent document (`doc_type=listing`) whose
//! `coordinators` field holds one child per coordinator:
//!
//! ```text
//! { "id": "coordinator:<user-id>:<listing-id>", "doc_type_s": "coordinator",
//!   "coordinator_id_i": <user-id>, "coordinator_email_s": "<email>" }
//! ```

use super::client::{record_of, EntityIndex, IndexClient, IndexError, IndexedEntity, Page, SearchRequest};
use super::codec::{FieldKind, Record, Schema};
use crate::models::Listing;
use serde_json::{json, Value};

const DOC_TYPE: &str = "doc_type";
const COORDINATORS: &str = "coordinators";

/// Returns parents of the matching child documents.
const PARENT_QUERY_PREFIX: &str = "{!parent which=doc_type_s:listing}";
/// Attaches child documents to each returned parent.
const WITH_CHILDREN: &str = "*,[child childFilter=*:*]";

impl IndexedEntity for Listing {
    fn schema() -> Schema {
        // Child ids are "coordinator:<user-id>:<listing-id>"; the user id sits
        // one segment from the end.
        Schema::entity("listing").with_field(
            COORDINATORS,
            FieldKind::Nested(Box::new(Schema::child().with_id_position(1))),
        )
    }

    fn to_record(&self) -> Result<Record, IndexError> {
        let mut record = record_of(self)?;
        let children = self
            .coordinators
            .iter()
            .map(|coordinator| {
                json!({
                    DOC_TYPE: "coordinator",
                    "id": format!("coordinator:{}:{}", coordinator.id, self.id),
                    "coordinator_id": coordinator.id,
                    "coordinator_email": coordinator.email,
                })
            })
            .collect();
        record.insert(COORDINATORS.to_string(), Value::Array(children));
        record.insert(DOC_TYPE.to_string(), Value::String("listing".to_string()));
        Ok(record)
    }

    fn from_record(mut record: Record) -> Result<Self, serde_json::Error> {
        record.remove(DOC_TYPE);

        if let Some(Value::Array(children)) = record.remove(COORDINATORS) {
            let coordinators = children
                .iter()
                .filter_map(|child| {
                    let child = child.as_object()?;
                    let id = child
                        .get("coordinator_id")
                        .and_then(Value::as_u64)
                        .or_else(|| child.get("id").and_then(Value::as_u64))?;
                    let email = child.get("coordinator_email")?.as_str()?;
                    Some(json!({ "id": id, "email": email }))
                })
                .collect();
            record.insert(COORDINATORS.to_string(), Value::Array(coordinators));
        }

        serde_json::from_value(Value::Object(record))
    }
}

#[derive(Clone)]
pub struct ListingIndex {
    index: EntityIndex<Listing>,
}

impl ListingIndex {
    pub fn new(client: IndexClient) -> Self {
        Self {
            index: EntityIndex::new(client),
        }
    }

    pub async fn add(&self, listing: &Listing) -> Result<(), IndexError> {
        self.index.add(listing).await
    }

    /// Listings with a coordinator child pointing at `coordinator_id`.
    pub async fn search_by_coordinator_id(
        &self,
        coordinator_id: u64,
        page: Page,
    ) -> Result<(Vec<Listing>, u64), IndexError> {
        let mut filter = Record::new();
        filter.insert("coordinator_id".to_string(), Value::from(coordinator_id));

        let mut request = SearchRequest::new(filter, page);
        request.query_prefix = Some(PARENT_QUERY_PREFIX.to_string());
        request.field_list = Some(WITH_CHILDREN.to_string());
        self.index.search(request).await
    }
}
