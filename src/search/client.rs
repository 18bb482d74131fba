// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Search index HTTP client.
//!
//! Handles:
//! - Document upserts with immediate commit
//! - Raw select queries with paging, field lists and filter queries
//! - Typed, paginated searches that encode filters and decode results

use super::codec::{self, CodecError, Document, Record, Schema, ID_FIELD};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;

/// Query used when no clause restricts the match set.
const MATCH_ALL: &str = "*:*";

/// Field-value delimiter of the query syntax.
const DELIMITER: char = ':';

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Search index returned HTTP {status}: {body}")]
    Unavailable { status: u16, body: String },

    #[error("Search index request failed: {0}")]
    Transport(String),

    #[error("Unexpected search index response: {0}")]
    InvalidResponse(String),

    #[error("Record could not be serialized: {0}")]
    Serialization(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// One page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// Parameters of a raw select request.
#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub q: String,
    pub start: Option<u64>,
    pub rows: Option<u64>,
    pub fl: Option<String>,
    pub fq: Option<String>,
}

/// Documents of one page plus the total match count of the query.
#[derive(Debug, Clone)]
pub struct SelectResult {
    pub documents: Vec<Document>,
    pub total_count: u64,
}

#[derive(Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Deserialize)]
struct SelectBody {
    #[serde(default)]
    docs: Vec<Document>,
    #[serde(rename = "numFound", default)]
    num_found: u64,
}

/// Client bound to a single index core.
#[derive(Clone)]
pub struct IndexClient {
    http: reqwest::Client,
    base_url: String,
}

impl IndexClient {
    /// `base_url` is the core URL, e.g. `http://localhost:8983/solr/listings`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Upsert one document and commit immediately.
    pub async fn update(&self, document: &Document) -> Result<(), IndexError> {
        let response = self
            .http
            .post(format!("{}/update", self.base_url))
            .query(&[("commit", "true")])
            .json(&[document])
            .send()
            .await
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        check_response(response).await?;
        Ok(())
    }

    /// Run a read query. `total_count` is the match count of the whole query,
    /// not the size of the returned page.
    pub async fn select(&self, query: &SelectQuery) -> Result<SelectResult, IndexError> {
        let mut params: Vec<(&str, String)> = vec![("q", query.q.clone()), ("wt", "json".to_string())];
        if let Some(start) = query.start {
            params.push(("start", start.to_string()));
        }
        if let Some(rows) = query.rows {
            params.push(("rows", rows.to_string()));
        }
        if let Some(fl) = &query.fl {
            params.push(("fl", fl.clone()));
        }
        if let Some(fq) = &query.fq {
            params.push(("fq", fq.clone()));
        }

        let response = self
            .http
            .get(format!("{}/select", self.base_url))
            .query(&params)
            .send()
            .await
            .map_err(|e| IndexError::Transport(e.to_string()))?;

        let body: SelectResponse = check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        Ok(SelectResult {
            documents: body.response.docs,
            total_count: body.response.num_found,
        })
    }
}

async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(IndexError::Unavailable { status, body })
}

/// Escape the delimiter so a value cannot split its clause.
fn escape_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.replace(DELIMITER, "\\:"),
        other => other.to_string(),
    }
}

/// Build an AND-ed `field:value` query from a filter record, encoding field
/// names with the schema's suffixes. An empty filter yields an empty string.
pub fn build_query(filter: &Record, schema: &Schema) -> Result<String, CodecError> {
    let encoded = codec::encode(filter, schema)?;
    Ok(encoded
        .iter()
        .map(|(key, value)| format!("{key}:{}", escape_value(value)))
        .collect::<Vec<_>>()
        .join(" AND "))
}

/// Binds a model type to its index schema.
pub trait IndexedEntity: Serialize + DeserializeOwned {
    fn schema() -> Schema;

    /// Record written to the index.
    fn to_record(&self) -> Result<Record, IndexError> {
        record_of(self)
    }

    /// Rebuild the model from a decoded record. An error means the document
    /// does not satisfy the model and is skipped by searches.
    fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(record))
    }
}

/// Serialize a model into a record.
pub fn record_of<T: Serialize>(entity: &T) -> Result<Record, IndexError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(record)) => Ok(record),
        Ok(other) => Err(IndexError::Serialization(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(IndexError::Serialization(e.to_string())),
    }
}

/// A paginated search over one entity type.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub filter: Record,
    pub page: Page,
    /// Prepended verbatim to the built query (e.g. a block-join parser).
    pub query_prefix: Option<String>,
    pub field_list: Option<String>,
    pub extra_filter: Option<Record>,
}

impl SearchRequest {
    pub fn new(filter: Record, page: Page) -> Self {
        Self {
            filter,
            page,
            query_prefix: None,
            field_list: None,
            extra_filter: None,
        }
    }
}

/// Typed access to the documents of one entity type.
#[derive(Clone)]
pub struct EntityIndex<T> {
    client: IndexClient,
    schema: Schema,
    _entity: PhantomData<fn() -> T>,
}

impl<T: IndexedEntity> EntityIndex<T> {
    pub fn new(client: IndexClient) -> Self {
        Self {
            client,
            schema: T::schema(),
            _entity: PhantomData,
        }
    }

    /// Encode and upsert an entity.
    pub async fn add(&self, entity: &T) -> Result<(), IndexError> {
        let document = codec::encode(&entity.to_record()?, &self.schema)?;
        self.client.update(&document).await
    }

    /// Run a search and decode the page.
    ///
    /// Unless the filter pins an `id`, results are restricted to this entity's
    /// id namespace. Documents that do not decode into `T` are skipped.
    pub async fn search(&self, request: SearchRequest) -> Result<(Vec<T>, u64), IndexError> {
        let mut filter_query = request.extra_filter.unwrap_or_default();
        if !request.filter.contains_key(ID_FIELD) {
            filter_query.insert(ID_FIELD.to_string(), Value::String("*".to_string()));
        }
        let fq = if filter_query.is_empty() {
            None
        } else {
            Some(build_query(&filter_query, &self.schema)?)
        };

        let mut q = build_query(&request.filter, &self.schema)?;
        if q.is_empty() {
            q = MATCH_ALL.to_string();
        }
        if let Some(prefix) = &request.query_prefix {
            q = format!("{prefix}{q}");
        }

        let result = self
            .client
            .select(&SelectQuery {
                q,
                start: Some(request.page.offset),
                rows: Some(request.page.limit),
                fl: request.field_list,
                fq,
            })
            .await?;

        let entities = result
            .documents
            .iter()
            .filter_map(|document| {
                let decoded = codec::decode(document, &self.schema)
                    .map_err(|e| e.to_string())
                    .and_then(|record| T::from_record(record).map_err(|e| e.to_string()));
                match decoded {
                    Ok(entity) => Some(entity),
                    Err(reason) => {
                        tracing::warn!(
                            id = ?document.get(ID_FIELD),
                            reason = %reason,
                            "Skipping index document that does not match its model"
                        );
                        None
                    }
                }
            })
            .collect();

        Ok((entities, result.total_count))
    }
}
