//! # Nexus API Server Library
//!
//! HTTP surface of the Nexus collaboration backend: users, boards, lists,
//! workspaces and projects behind a role-based middleware chain.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Environment configuration
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Request extractors (validated JSON, pagination, tokens)
//! - `middleware`: Authentication, role guards and security headers
//! - `oauth`: Google sign-in
//! - `response`: The `{status, message, data}` envelope
//! - `routes`: API route handlers
//! - `validation`: Custom field validation rules

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod oauth;
pub mod response;
pub mod routes;
pub mod validation;
