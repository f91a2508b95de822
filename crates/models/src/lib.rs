//! Domain types for the user record store.
//! - `UserId` is the only identity a record has; it lives in the owning map's key.
//! - `UserRecord` is what the store keeps, `User` is what callers get back.

pub mod errors;
pub mod user;

pub use errors::ModelError;
pub use user::{User, UserId, UserRecord, MAX_USER_ID};
