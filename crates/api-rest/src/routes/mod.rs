//! Route modules, one per API area.
//!
//! Each module exposes `router()` returning a `Router<AppState>` that the
//! top-level router merges.

pub mod export;
pub mod locations;
pub mod patients;
pub mod pharmacy;
pub mod records;
pub mod registration;
pub mod session;
pub mod users;
pub mod visits;
