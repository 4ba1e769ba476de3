//! Clinic Client - talking to the clinic service
//!
//! This library provides:
//! - A typed REST client for every endpoint of the clinic service
//! - A single application store updated through a pure reducer
//! - Store-backed operations with an explicit sample-data fallback
//!
//! Errors always reach the caller. Sample data is only shown when the caller
//! chose [`FallbackPolicy::SampleData`], and the store records which origin
//! the data came from.

pub mod api;
pub mod error;
pub mod service;
pub mod store;

pub use api::{ApiClient, HealthStatus, DEFAULT_BASE_URL};
pub use error::ClientError;
pub use service::{ClinicService, FallbackPolicy};
pub use store::{reduce, Action, AppState, Collections, DataOrigin, Store};
