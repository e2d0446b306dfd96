//! Echo use-case service.
//!
//! # Responsibility
//! - Run the record flow: store audio, pick unlock time, persist, schedule.
//! - Build vault and insights read models for the UI layer.
//!
//! # Invariants
//! - No echo is persisted unless its audio asset was stored successfully.
//! - No stored asset outlives a failed save.
//! - `unlock_at` is computed exactly once per recorded echo.
//! - Lock status is recomputed on every vault read.
//! - A failed alert does not roll back a persisted echo.

use crate::asset::{
    generate_asset_name, AssetError, AssetRef, AssetStore, DEFAULT_AUDIO_EXTENSION,
};
use crate::insights::{compute_insights, EchoInsights};
use crate::model::echo::{Echo, EchoDraft, EchoId};
use crate::notify::{NotificationBackend, NotificationId, NotificationScheduler};
use crate::store::tiered::{ListSource, StoreTier, TieredEchoStore};
use crate::store::{EchoRepository, StoreError};
use crate::unlock::{
    compute_unlock_at_with_rng, partition, sort_newest_first, time_until_unlock, LockPolicy,
    UnlockError,
};
use chrono::{DateTime, Local, TimeZone};
use log::{info, warn};
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Service error for echo use-cases.
#[derive(Debug)]
pub enum EchoServiceError {
    Asset(AssetError),
    Unlock(UnlockError),
    Store(StoreError),
}

impl Display for EchoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Asset(err) => write!(f, "{err}"),
            Self::Unlock(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EchoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Asset(err) => Some(err),
            Self::Unlock(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<AssetError> for EchoServiceError {
    fn from(value: AssetError) -> Self {
        Self::Asset(value)
    }
}

impl From<UnlockError> for EchoServiceError {
    fn from(value: UnlockError) -> Self {
        Self::Unlock(value)
    }
}

impl From<StoreError> for EchoServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Input for the record flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEchoRequest {
    pub user_id: String,
    /// Temporary capture file reported by the platform recorder.
    pub source_path: PathBuf,
    pub policy: LockPolicy,
    pub mood_tag: Option<String>,
}

/// Result of a completed record flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEcho {
    pub echo: Echo,
    /// Tier that accepted the record.
    pub tier: StoreTier,
    /// `None` when no alert was needed, alerts are disabled, or scheduling failed.
    pub notification_id: Option<NotificationId>,
}

/// Locked echo plus its countdown label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedEntry {
    pub echo: Echo,
    pub time_until_unlock: String,
}

/// Vault screen read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultView {
    /// Newest first.
    pub available: Vec<Echo>,
    /// Newest first.
    pub locked: Vec<LockedEntry>,
    pub source: ListSource,
}

/// Use-case facade over asset, store and notification capabilities.
pub struct EchoService<P, S, A, B>
where
    P: EchoRepository,
    S: EchoRepository,
    A: AssetStore,
    B: NotificationBackend,
{
    store: TieredEchoStore<P, S>,
    assets: A,
    scheduler: NotificationScheduler<B>,
}

impl<P, S, A, B> EchoService<P, S, A, B>
where
    P: EchoRepository,
    S: EchoRepository,
    A: AssetStore,
    B: NotificationBackend,
{
    pub fn new(
        store: TieredEchoStore<P, S>,
        assets: A,
        scheduler: NotificationScheduler<B>,
    ) -> Self {
        Self {
            store,
            assets,
            scheduler,
        }
    }

    pub fn store(&self) -> &TieredEchoStore<P, S> {
        &self.store
    }

    pub fn scheduler(&self) -> &NotificationScheduler<B> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut NotificationScheduler<B> {
        &mut self.scheduler
    }

    /// Records an echo using the local time zone and the thread RNG.
    pub fn record_echo(
        &mut self,
        request: &RecordEchoRequest,
    ) -> Result<RecordedEcho, EchoServiceError> {
        self.record_echo_at(request, &Local::now(), &mut rand::thread_rng())
    }

    /// Records an echo at an explicit `now` with a caller-provided RNG.
    ///
    /// # Contract
    /// - Asset failures abort before anything is persisted.
    /// - Save failures remove the stored asset again.
    /// - Calendar-day arithmetic runs in `now`'s time zone.
    /// - Alert failures are logged and reported as `notification_id = None`.
    pub fn record_echo_at<Tz: TimeZone, R: Rng + ?Sized>(
        &mut self,
        request: &RecordEchoRequest,
        now: &DateTime<Tz>,
        rng: &mut R,
    ) -> Result<RecordedEcho, EchoServiceError> {
        let now_ms = now.timestamp_millis();
        let unlock_at = compute_unlock_at_with_rng(request.policy, now, rng)?.timestamp_millis();

        let extension = request
            .source_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or(DEFAULT_AUDIO_EXTENSION);
        let asset_name = generate_asset_name(now_ms, extension, rng);
        let audio_ref = self.assets.store(&request.source_path, &asset_name)?;

        let mut draft = EchoDraft::new(request.user_id.as_str(), audio_ref.as_str(), unlock_at);
        draft.mood_tag = request.mood_tag.clone();

        let saved = match self.store.save(draft, now_ms) {
            Ok(saved) => saved,
            Err(err) => {
                self.discard_asset(&audio_ref);
                return Err(err.into());
            }
        };
        info!(
            "event=echo_record module=service status=ok echo_id={} policy={} tier={:?}",
            saved.echo.id, request.policy, saved.tier
        );

        let notification_id = match self.scheduler.schedule(&saved.echo, now_ms) {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    "event=echo_record module=service status=degraded echo_id={} reason=alert_failed error={}",
                    saved.echo.id, err
                );
                None
            }
        };

        Ok(RecordedEcho {
            echo: saved.echo,
            tier: saved.tier,
            notification_id,
        })
    }

    fn discard_asset(&self, audio_ref: &AssetRef) {
        match self.assets.remove(audio_ref) {
            Ok(()) => info!("event=echo_record module=service status=rolled_back reason=save_failed"),
            Err(err) => warn!(
                "event=echo_record module=service status=degraded reason=orphan_asset error={}",
                err
            ),
        }
    }

    /// Builds the vault view for `user_id` at `now_ms`.
    pub fn vault(&self, user_id: &str, now_ms: i64) -> VaultView {
        let listed = self.store.list(user_id);
        let mut split = partition(listed.echoes, now_ms);
        sort_newest_first(&mut split.available);
        sort_newest_first(&mut split.locked);

        let locked = split
            .locked
            .into_iter()
            .map(|echo| {
                // Locked entries always carry an unlock time.
                let label = time_until_unlock(echo.unlock_at.unwrap_or(now_ms), now_ms);
                LockedEntry {
                    echo,
                    time_until_unlock: label,
                }
            })
            .collect();

        VaultView {
            available: split.available,
            locked,
            source: listed.source,
        }
    }

    /// Computes insights for `user_id` at `now_ms`.
    pub fn insights(&self, user_id: &str, now_ms: i64) -> EchoInsights {
        let listed = self.store.list(user_id);
        compute_insights(&listed.echoes, now_ms)
    }

    /// Loads one echo for playback.
    ///
    /// # Errors
    /// - `StoreError::NotFound` when neither tier holds the id.
    pub fn get_echo(&self, id: EchoId) -> Result<Echo, EchoServiceError> {
        self.store
            .get(id)?
            .ok_or(EchoServiceError::Store(StoreError::NotFound(id)))
    }
}
