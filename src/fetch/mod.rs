//! Fetch client and request outcomes
//!
//! This module contains:
//! - [`FetchOutcome`] and the soft/hard failure taxonomy
//! - Soft-failure classification of HTTP-200 pages
//! - [`Credentials`], injected into the HTTP client at construction
//! - [`FetchClient`], which fetches pages through the page cache with retry

mod classify;
mod client;
mod credentials;
mod outcome;

pub use classify::classify_body;
pub use client::{build_http_client, FetchClient, FetchStats, RetryPolicy};
pub use credentials::Credentials;
pub(crate) use credentials::Redacted;
pub use outcome::{FailureReason, FetchOutcome, HardFailureKind, SoftFailureKind};
