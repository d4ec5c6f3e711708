//! Accounts domain: users, addresses, serviceable areas
//!
//! Also owns the collaborator ports the jobs domain consumes at its
//! creation/assignment boundaries (`UserDirectory`, `AddressBook`,
//! `ServiceAreaDirectory`).

pub mod api;
pub mod domain;
pub mod ports;
pub mod repository;

pub use api::middleware::AccountsState;
pub use api::routes::routes;
pub use domain::entities::*;
pub use ports::{AddressBook, AddressRecord, DirectoryUser, ServiceAreaDirectory, UserDirectory};
pub use repository::AccountsRepositories;
