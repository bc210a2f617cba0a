//! # API Shared
//!
//! Shared definitions for the Perisentez APIs.
//!
//! Contains:
//! - Request/response types (`dto` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//! - Session handling for clinician logins
//!
//! Used by `api-rest`; the types carry no HTTP framework dependency.

pub mod auth;
pub mod dto;
pub mod health;

pub use auth::{SessionStore, SESSION_HEADER};
pub use dto::*;
pub use health::HealthService;
