//! Purpose: Library crate behind the `contentpush` CLI and tests.
//! Exports: `api` (public boundary), `core` (validation, normalization, errors).
//! Role: Validates content records and uploads them to a project's content API.
//! Invariants: Only validated collections reach the uploader.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
