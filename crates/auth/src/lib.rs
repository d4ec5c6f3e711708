//! Actor identity and roles for WellFix
//!
//! Credential storage and token verification live upstream (the API gateway
//! authenticates and injects the caller's user id as a request header). This
//! crate resolves that id to an identity + role read model and exposes axum
//! extractors for handlers.

pub mod backend;
pub mod context;
pub mod error;
pub mod extractors;
pub mod types;

pub use backend::AuthBackend;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::{AdminUser, AuthUser};
pub use types::{AuthIdentity, UserRole};
