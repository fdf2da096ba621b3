//! Purpose: Define the public Rust API boundary for contentpush.
//! Exports: Validation models, the project client seam, upload and content-source calls.
//! Role: Public, additive-only surface used by the CLI and library callers.
//! Invariants: Everything callers need is re-exported here; `core` paths are not a contract.
//! Invariants: All platform traffic flows through `ProjectClient`.

mod project;
mod sources;
mod upload;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::collection::{UploadCollection, duplicate_guids};
pub use crate::core::date::normalize_date;
pub use crate::core::error::{Error, ErrorKind, ValidationIssue};
pub use crate::core::geolocation::Geolocation;
pub use crate::core::item::{EngagementType, Gender, UploadItem};
pub use crate::core::tabular::{NESTED_PREFIXES, Row, Table, flatten_record, nest_row};
pub use crate::core::text::repair_text;
pub use project::{ApiResult, DEFAULT_API_URL, HttpProjectClient, ProjectClient, ProjectConfig};
pub use sources::{ContentSource, ContentSourceApiExt};
pub use upload::{BatchResponse, MAX_BATCH_ITEMS, UploadOptions, UploadResponse, Uploader};
