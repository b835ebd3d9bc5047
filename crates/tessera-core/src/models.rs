//! Domain models for Tessera.
//!
//! These are the core types shared across all crates.

pub mod auth_client;
pub mod identity_provider;
pub mod organization;
pub mod role;
pub mod security_event;
pub mod tenant;
pub mod tenant_member;
pub mod user;
pub mod user_identity;
pub mod user_token;
