//! Purpose: Submit validated collections to the platform, batching oversized ones.
//! Exports: `Uploader`, `UploadOptions`, `UploadResponse`, `BatchResponse`, `MAX_BATCH_ITEMS`.
//! Role: Orchestrates payload shape and batch sequencing over a `ProjectClient`.
//! Invariants: Batches are contiguous, at most `MAX_BATCH_ITEMS` long, sent in order, one at a time.
//! Invariants: The first failing batch stops the sequence; earlier batches are not rolled back.
//! Invariants: Empty collections are rejected before any request is made.
#![allow(clippy::result_large_err)]

use super::project::{ApiResult, ProjectClient};
use crate::core::collection::{UploadCollection, ensure_not_empty};
use crate::core::error::{Error, ErrorKind};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

pub const MAX_BATCH_ITEMS: usize = 1000;
pub(crate) const CONTENT_SOURCES_PATH: &str = "content/sources";

/// Payload variant. With a content source set, the data-upload shape
/// (`contentSource`, `items`, `requestUsage`) is sent; otherwise `{"items"}`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UploadOptions {
    pub content_source: Option<u64>,
    pub request_usage: bool,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_content_source(content_source: u64) -> Self {
        Self {
            content_source: Some(content_source),
            request_usage: false,
        }
    }

    pub fn with_request_usage(mut self, request_usage: bool) -> Self {
        self.request_usage = request_usage;
        self
    }
}

#[derive(Serialize)]
struct ContentUploadRequest<'a> {
    items: &'a UploadCollection,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataUploadRequest<'a> {
    content_source: u64,
    items: &'a UploadCollection,
    request_usage: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchResponse {
    pub index: usize,
    pub item_count: usize,
    pub response: Value,
}

impl BatchResponse {
    pub fn label(&self) -> String {
        format!("Batch {}", self.index)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UploadResponse {
    Single(Value),
    Batched(Vec<BatchResponse>),
}

impl UploadResponse {
    /// The raw response, or `{"Batch 0": ..., "Batch 1": ...}` in submission order.
    pub fn to_value(&self) -> Value {
        match self {
            UploadResponse::Single(value) => value.clone(),
            UploadResponse::Batched(batches) => {
                let mut out = Map::new();
                for batch in batches {
                    out.insert(batch.label(), batch.response.clone());
                }
                Value::Object(out)
            }
        }
    }

    pub fn batch_count(&self) -> usize {
        match self {
            UploadResponse::Single(_) => 1,
            UploadResponse::Batched(batches) => batches.len(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Uploader<C> {
    client: C,
}

impl<C: ProjectClient> Uploader<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Upload `items`; collections over `MAX_BATCH_ITEMS` go through `batch_upload`.
    pub fn upload(
        &self,
        items: &UploadCollection,
        options: &UploadOptions,
    ) -> ApiResult<UploadResponse> {
        ensure_not_empty(items)?;
        if items.len() > MAX_BATCH_ITEMS {
            info!(
                items = items.len(),
                batch_size = MAX_BATCH_ITEMS,
                "more than 1000 items found; uploading in batches of 1000"
            );
            return self
                .batch_upload(items, options)
                .map(UploadResponse::Batched);
        }
        self.submit(items, options).map(UploadResponse::Single)
    }

    /// Submit `items` in sequential chunks of at most `MAX_BATCH_ITEMS`.
    ///
    /// A failure aborts the remaining batches and carries the failing batch
    /// index; batches already accepted by the platform stay accepted.
    pub fn batch_upload(
        &self,
        items: &UploadCollection,
        options: &UploadOptions,
    ) -> ApiResult<Vec<BatchResponse>> {
        ensure_not_empty(items)?;
        let mut responses = Vec::new();
        for (index, batch) in items.batches(MAX_BATCH_ITEMS).enumerate() {
            let response = self
                .submit(&batch, options)
                .map_err(|err| err.with_batch(index))?;
            info!(batch = index, items = batch.len(), "uploaded batch");
            responses.push(BatchResponse {
                index,
                item_count: batch.len(),
                response,
            });
        }
        Ok(responses)
    }

    fn submit(&self, items: &UploadCollection, options: &UploadOptions) -> ApiResult<Value> {
        let url = self.client.endpoint(CONTENT_SOURCES_PATH)?;
        let payload = request_payload(items, options)?;
        self.client.post(&url, &payload)
    }
}

fn request_payload(items: &UploadCollection, options: &UploadOptions) -> ApiResult<Value> {
    let encoded = match options.content_source {
        Some(content_source) => serde_json::to_value(DataUploadRequest {
            content_source,
            items,
            request_usage: options.request_usage,
        }),
        None => serde_json::to_value(ContentUploadRequest { items }),
    };
    encoded.map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode upload payload")
            .with_source(err)
    })
}
