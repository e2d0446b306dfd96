//! Flutter-facing FFI surface for EchoVault core.

pub mod api;
