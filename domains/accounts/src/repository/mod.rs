//! Repository implementations for the accounts domain

pub mod addresses;
pub mod service_areas;
pub mod users;

use sqlx::PgPool;

pub use addresses::AddressRepository;
pub use service_areas::ServiceAreaRepository;
pub use users::UserRepository;

/// Combined repository access for the accounts domain
#[derive(Clone)]
pub struct AccountsRepositories {
    pub users: UserRepository,
    pub addresses: AddressRepository,
    pub service_areas: ServiceAreaRepository,
}

impl AccountsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            addresses: AddressRepository::new(pool.clone()),
            service_areas: ServiceAreaRepository::new(pool),
        }
    }
}
