//! Storage helpers for the service layer
//!
//! The JSON snapshot codec used to persist the user map to a single file.

pub mod snapshot;
