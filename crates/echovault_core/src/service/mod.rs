//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate asset, store and notification calls into screen-level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod echo_service;
