//! Shared utilities, configuration, and error handling for WellFix
//!
//! This crate provides common functionality used across the WellFix application:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Custom axum extractors (pagination, validated JSON)

pub mod config;
pub mod error;
pub mod extractors;

pub use config::Config;
pub use error::{Error, Result};
pub use extractors::{Pagination, ValidatedJson};
