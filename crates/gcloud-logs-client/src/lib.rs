//! Google Cloud Logging client for gcloud-logs
//!
//! This crate provides the `LogSource` seam the retrieval loop queries through,
//! and its production implementation backed by the Cloud Logging v2 REST API.

mod client;
mod source;
mod token_cache;

pub use client::{ApiError, LoggingClient, MAX_PAGE_SIZE};
pub use source::LogSource;
pub use token_cache::TokenCache;

// Re-export types that are used in our public API
pub use gcloud_logs_types::{LogPage, LogRecord};
