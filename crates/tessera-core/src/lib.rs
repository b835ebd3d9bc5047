//! Tessera Core: domain models, error taxonomy, repository traits and
//! the collaborator interfaces the credential engine calls out to.

pub mod collaborators;
pub mod error;
pub mod models;
pub mod repository;
