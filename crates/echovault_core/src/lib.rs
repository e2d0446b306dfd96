//! Core domain logic for EchoVault.
//! This crate is the single source of truth for echo lifecycle invariants.

pub mod asset;
pub mod config;
pub mod db;
pub mod identity;
pub mod insights;
pub mod logging;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;
pub mod unlock;

pub use asset::{AssetError, AssetRef, AssetStore, LocalAssetStore};
pub use config::{ConfigError, EchoVaultConfig};
pub use identity::{AnonymousIdentity, IdentityResolver, SessionIdentity, ANONYMOUS_USER_ID};
pub use insights::{compute_insights, EchoInsights};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::echo::{Echo, EchoDraft, EchoId, EchoValidationError};
pub use notify::{
    alert_request_for, AlertDeliveryHandler, AlertPayload, AlertRequest, DeliveryOutcome,
    EchoNavigator, InMemoryNotificationBackend, NotificationBackend, NotificationId,
    NotificationScheduler, NotifyError, PendingAlert,
};
pub use service::echo_service::{
    EchoService, EchoServiceError, LockedEntry, RecordEchoRequest, RecordedEcho, VaultView,
};
pub use store::kv::JsonFileEchoRepository;
pub use store::sqlite::SqliteEchoRepository;
pub use store::tiered::{
    FallbackPolicy, ListOutcome, ListSource, SaveOutcome, StoreTier, TieredEchoStore,
};
pub use store::{EchoRepository, StoreError, StoreResult};
pub use unlock::{
    compute_unlock_at, compute_unlock_at_with_rng, lock_state, partition, time_until_unlock,
    LockPolicy, LockState, UnlockError, VaultPartition,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
