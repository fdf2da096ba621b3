//! Purpose: Create and list project content sources.
//! Exports: `ContentSource`, `ContentSourceApiExt`.
//! Role: Thin descriptor calls over any `ProjectClient`; no local state.
//! Invariants: Descriptors are JSON objects and are sent as given.
#![allow(clippy::result_large_err)]

use super::project::{ApiResult, ProjectClient};
use super::upload::CONTENT_SOURCES_PATH;
use crate::core::error::{Error, ErrorKind};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

const CONTENT_SOURCES_LIST_PATH: &str = "content/sources/list";

/// Minimal descriptor; the platform accepts more keys via `create_content_source`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ContentSource {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ContentSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn to_value(&self) -> ApiResult<Value> {
        serde_json::to_value(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode content source")
                .with_source(err)
        })
    }
}

pub trait ContentSourceApiExt {
    /// POST a descriptor object to the content-sources endpoint.
    fn create_content_source(&self, descriptor: &Value) -> ApiResult<Value>;

    fn create_named_content_source(&self, source: &ContentSource) -> ApiResult<Value>;

    /// Whatever the platform lists for the project, unmodified.
    fn list_content_sources(&self) -> ApiResult<Value>;
}

impl<C: ProjectClient + ?Sized> ContentSourceApiExt for C {
    fn create_content_source(&self, descriptor: &Value) -> ApiResult<Value> {
        if !descriptor.is_object() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("content source descriptor must be a JSON object")
                .with_hint("Pass an object such as {\"name\": \"My source\"}."));
        }
        let url = self.endpoint(CONTENT_SOURCES_PATH)?;
        let created = self.post(&url, descriptor)?;
        info!(url = %url, "created content source");
        Ok(created)
    }

    fn create_named_content_source(&self, source: &ContentSource) -> ApiResult<Value> {
        self.create_content_source(&source.to_value()?)
    }

    fn list_content_sources(&self) -> ApiResult<Value> {
        let url = self.endpoint(CONTENT_SOURCES_LIST_PATH)?;
        self.get(&url)
    }
}
