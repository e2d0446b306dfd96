//! Domain model for time-locked voice notes.
//!
//! # Responsibility
//! - Define the single persisted record shape shared by all store tiers.
//!
//! # Invariants
//! - Every echo is identified by a stable `EchoId`.
//! - Echoes are created once and never updated in place.

pub mod echo;
