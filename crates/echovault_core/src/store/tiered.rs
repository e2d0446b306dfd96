//! Two-tier echo store with an explicit fallback policy.
//!
//! # Responsibility
//! - Route writes to the primary tier and duplicate them to the secondary
//!   tier only when the primary fails.
//! - Route reads to the primary tier and fall back per [`FallbackPolicy`].
//!
//! # Invariants
//! - Fallback writes are at-least-once and never reconciled: after a primary
//!   outage the tiers can hold different record sets.
//! - Caller errors (validation, duplicate id) are surfaced, never retried.
//! - With `read_on_empty` set, an empty primary result resurrects whatever
//!   the secondary holds. A genuinely empty remote account therefore shows
//!   stale local data; this is the offline-first trade-off, kept on purpose.
//! - Every absorbed failure is logged at `warn`.

use crate::model::echo::{Echo, EchoDraft, EchoId};
use crate::store::{EchoRepository, StoreResult};
use log::{error, info, warn};

/// Deterministic fallback rules for [`TieredEchoStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Read the secondary tier when the primary returns zero records.
    pub read_on_empty: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            read_on_empty: true,
        }
    }
}

/// Tier that accepted a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTier {
    Primary,
    Secondary,
}

/// Where a list result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Primary,
    Secondary,
    /// Both tiers failed; the result is empty.
    Unavailable,
}

/// Result of [`TieredEchoStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub echo: Echo,
    pub tier: StoreTier,
}

/// Result of [`TieredEchoStore::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOutcome {
    /// Records sorted by `created_at DESC`.
    pub echoes: Vec<Echo>,
    pub source: ListSource,
}

/// Primary store with a local fallback tier.
pub struct TieredEchoStore<P: EchoRepository, S: EchoRepository> {
    primary: P,
    secondary: S,
    policy: FallbackPolicy,
}

impl<P: EchoRepository, S: EchoRepository> TieredEchoStore<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self::with_policy(primary, secondary, FallbackPolicy::default())
    }

    pub fn with_policy(primary: P, secondary: S, policy: FallbackPolicy) -> Self {
        Self {
            primary,
            secondary,
            policy,
        }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn secondary(&self) -> &S {
        &self.secondary
    }

    /// Completes and persists a draft.
    ///
    /// # Contract
    /// - Assigns `id` and `created_at` when absent (see `EchoDraft::finalize`).
    /// - Primary failure triggers one secondary write; the outcome reports
    ///   which tier accepted the record.
    ///
    /// # Errors
    /// - Validation or duplicate-id errors from the primary are returned as-is.
    /// - When both tiers fail, the secondary error is returned.
    pub fn save(&self, draft: EchoDraft, now_ms: i64) -> StoreResult<SaveOutcome> {
        let echo = draft.finalize(now_ms);
        echo.validate()?;
        let tier = self.write_with_fallback(&echo)?;
        Ok(SaveOutcome { echo, tier })
    }

    /// Lists all echoes owned by `user_id`, newest first.
    ///
    /// Never fails: when both tiers are unreachable the outcome is empty with
    /// `ListSource::Unavailable`.
    pub fn list(&self, user_id: &str) -> ListOutcome {
        match self.primary.list_echoes(user_id) {
            Ok(echoes) if !echoes.is_empty() || !self.policy.read_on_empty => ListOutcome {
                echoes,
                source: ListSource::Primary,
            },
            Ok(_) => {
                info!("event=store_list module=store status=fallback reason=primary_empty");
                self.list_secondary(user_id)
            }
            Err(err) => {
                warn!(
                    "event=store_list module=store status=fallback reason=primary_error error_code={} error={}",
                    err.code(),
                    err
                );
                self.list_secondary(user_id)
            }
        }
    }

    /// Loads one echo, checking the primary tier first.
    pub fn get(&self, id: EchoId) -> StoreResult<Option<Echo>> {
        match self.primary.get_echo(id) {
            Ok(Some(echo)) => Ok(Some(echo)),
            Ok(None) => self.secondary.get_echo(id),
            Err(err) => {
                warn!(
                    "event=store_get module=store status=fallback echo_id={} error_code={} error={}",
                    id,
                    err.code(),
                    err
                );
                self.secondary.get_echo(id)
            }
        }
    }

    fn write_with_fallback(&self, echo: &Echo) -> StoreResult<StoreTier> {
        let primary_err = match self.primary.create_echo(echo) {
            Ok(_) => return Ok(StoreTier::Primary),
            Err(err) if err.is_caller_error() => return Err(err),
            Err(err) => err,
        };

        warn!(
            "event=store_save module=store status=fallback echo_id={} error_code={} error={}",
            echo.id,
            primary_err.code(),
            primary_err
        );

        match self.secondary.create_echo(echo) {
            Ok(_) => Ok(StoreTier::Secondary),
            Err(err) => {
                error!(
                    "event=store_save module=store status=error echo_id={} primary_error={} secondary_error={}",
                    echo.id, primary_err, err
                );
                Err(err)
            }
        }
    }

    fn list_secondary(&self, user_id: &str) -> ListOutcome {
        match self.secondary.list_echoes(user_id) {
            Ok(echoes) => ListOutcome {
                echoes,
                source: ListSource::Secondary,
            },
            Err(err) => {
                error!(
                    "event=store_list module=store status=error reason=secondary_error error_code={} error={}",
                    err.code(),
                    err
                );
                ListOutcome {
                    echoes: Vec::new(),
                    source: ListSource::Unavailable,
                }
            }
        }
    }
}

impl<P: EchoRepository, S: EchoRepository> EchoRepository for TieredEchoStore<P, S> {
    fn create_echo(&self, echo: &Echo) -> StoreResult<EchoId> {
        echo.validate()?;
        self.write_with_fallback(echo)?;
        Ok(echo.id)
    }

    fn get_echo(&self, id: EchoId) -> StoreResult<Option<Echo>> {
        self.get(id)
    }

    fn list_echoes(&self, user_id: &str) -> StoreResult<Vec<Echo>> {
        Ok(self.list(user_id).echoes)
    }
}
