//! # Perisentez Core
//!
//! Core logic for the Perisentez prenatal syndrome risk tool.
//!
//! This crate contains the pure evaluation code and the file-backed stores:
//! - Reference tables and z-score evaluation of NT and FL measurements
//! - Rule-based syndrome scoring and ranking
//! - The tree-ensemble classifier used for saved predictions
//! - Clinician credentials and per-clinician patient records under the data directory
//! - PDF rendering of prediction reports
//!
//! **No API concerns**: HTTP servers, sessions and request DTOs belong in `api-rest` or
//! `api-shared`.

pub mod classifier;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod ids;
pub mod records;
pub mod reference;
pub mod report;
pub mod scoring;
pub mod validation;
pub mod zscore;

pub use config::CoreConfig;
pub use constants::DEFAULT_DATA_DIR;
pub use error::{CoreError, CoreResult};
pub use ids::RecordId;
pub use perisentez_types::{NonEmptyText, TextError, Username};
