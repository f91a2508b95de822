//! Service layer for the user record store.
//! - `user_store` holds the in-memory map, id allocation and snapshot reconciliation.
//! - `user_service` shares one store between tasks behind a single lock.
//! - `storage::snapshot` is the on-disk JSON format.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod user_service;
pub mod user_store;

pub use errors::{ServiceError, StoreError};
pub use user_service::{SharedUserStore, UserRepository};
pub use user_store::{LoadSummary, UserStore};
