//! # Nexus Shared Library
//!
//! This crate contains the domain types, persistence access and
//! authorization logic used by the Nexus API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication, role hierarchy, one-time tokens and invitations
//! - `store`: The access store consumed by the authorization chain
//! - `mailer`: Transactional email delivery
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod mailer;
pub mod models;
pub mod store;

/// Current version of the Nexus shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
