//! # API Shared
//!
//! Shared utilities for the clinic's API surfaces.
//!
//! Contains:
//! - Bearer-token issuance and verification (`auth` module)
//! - The request identity type with its anonymous fallback
//! - The pluggable access-policy seam (`policy` module)
//!
//! Kept free of any HTTP framework so alternative surfaces can reuse it.

pub mod auth;
pub mod policy;

pub use auth::{AuthConfig, AuthMode, Claims, Identity};
pub use policy::AccessPolicy;
