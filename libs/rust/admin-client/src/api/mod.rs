//! Typed wrappers for the admin API endpoints.

pub mod auth;
pub mod merchant_ops;
