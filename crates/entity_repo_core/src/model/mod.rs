//! Data shapes exchanged with repositories.
//!
//! # Responsibility
//! - Define the record mapping read from and written to storage.
//! - Define the entity descriptor trait and key/payload argument types.
//!
//! # Invariants
//! - Records and entity instances live only for the call that produced them.

pub mod entity;
pub mod record;
