//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose record/vault/insights use-cases to Dart via FRB.
//! - Hand alert requests to Dart, which owns the platform notification plugin.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures are reported inside response envelopes, never thrown.
//! - Timestamps cross the boundary as epoch milliseconds.

use echovault_core::db::open_db;
use echovault_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AlertRequest, Echo, EchoService, EchoVaultConfig, IdentityResolver, JsonFileEchoRepository,
    LocalAssetStore, LockPolicy, NotificationBackend, NotificationId, NotificationScheduler,
    NotifyError, PendingAlert, RecordEchoRequest, SessionIdentity, SqliteEchoRepository,
    TieredEchoStore,
};
use std::path::PathBuf;
use std::sync::OnceLock;

const CONFIG_FILE_NAME: &str = "echovault.toml";
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Lock policy ids accepted by [`vault_record_echo`].
#[flutter_rust_bridge::frb(sync)]
pub fn lock_policies() -> Vec<String> {
    LockPolicy::ALL
        .iter()
        .map(|policy| policy.as_str().to_string())
        .collect()
}

/// Echo row returned to Dart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoItem {
    pub echo_id: String,
    pub audio_ref: String,
    pub created_at_ms: i64,
    /// `None` only for malformed legacy records.
    pub unlock_at_ms: Option<i64>,
    pub mood_tag: Option<String>,
    /// Countdown label for locked rows, `None` for available rows.
    pub time_until_unlock: Option<String>,
}

/// Alert that Dart must schedule with the platform plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPlan {
    pub notification_id: String,
    pub fire_at_ms: i64,
    pub title: String,
    pub body: String,
    /// Opaque payload; pass back to [`vault_resolve_alert`] on delivery.
    pub echo_id: String,
}

/// Response envelope for the record flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEchoResponse {
    pub ok: bool,
    pub echo: Option<EchoItem>,
    pub alert: Option<AlertPlan>,
    /// `primary|secondary` on success.
    pub stored_in: Option<String>,
    pub message: String,
}

impl RecordEchoResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            echo: None,
            alert: None,
            stored_in: None,
            message: message.into(),
        }
    }
}

/// Vault screen envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultResponse {
    pub available: Vec<EchoItem>,
    pub locked: Vec<EchoItem>,
    /// `primary|secondary|unavailable`.
    pub source: String,
    pub message: String,
}

/// Insights screen envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsResponse {
    pub total: u32,
    pub locked: u32,
    pub available: u32,
    pub top_mood: Option<String>,
    pub next_unlock_at_ms: Option<i64>,
    pub message: String,
}

/// Records one echo from a finished capture file.
///
/// # FFI contract
/// - Sync call, file + DB backed.
/// - `policy` must be one of [`lock_policies`].
/// - On success with a future unlock time, `alert` must be scheduled by Dart.
#[flutter_rust_bridge::frb(sync)]
pub fn vault_record_echo(
    source_path: String,
    policy: String,
    mood_tag: Option<String>,
    session_user_id: Option<String>,
) -> RecordEchoResponse {
    let Some(policy) = LockPolicy::parse(&policy) else {
        return RecordEchoResponse::failure(format!("unknown lock policy `{policy}`"));
    };
    let user_id = SessionIdentity::new(session_user_id).current_user_id();
    let request = RecordEchoRequest {
        user_id,
        source_path: PathBuf::from(source_path.trim()),
        policy,
        mood_tag,
    };

    let result = with_service(|service| {
        let recorded = service.record_echo(&request).map_err(|err| err.to_string())?;
        let alert = service
            .scheduler_mut()
            .backend_mut()
            .take(recorded.notification_id.as_deref());
        Ok((recorded, alert))
    });

    match result {
        Ok((recorded, alert)) => RecordEchoResponse {
            ok: true,
            echo: Some(to_echo_item(&recorded.echo, None)),
            alert,
            stored_in: Some(format!("{:?}", recorded.tier).to_ascii_lowercase()),
            message: "Echo locked.".to_string(),
        },
        Err(err) => RecordEchoResponse::failure(format!("vault_record_echo failed: {err}")),
    }
}

/// Lists the current user's echoes split by lock status.
#[flutter_rust_bridge::frb(sync)]
pub fn vault_list(session_user_id: Option<String>, now_ms: i64) -> VaultResponse {
    let user_id = SessionIdentity::new(session_user_id).current_user_id();
    match with_service(|service| Ok(service.vault(&user_id, now_ms))) {
        Ok(view) => VaultResponse {
            available: view
                .available
                .iter()
                .map(|echo| to_echo_item(echo, None))
                .collect(),
            locked: view
                .locked
                .iter()
                .map(|entry| to_echo_item(&entry.echo, Some(entry.time_until_unlock.clone())))
                .collect(),
            source: format!("{:?}", view.source).to_ascii_lowercase(),
            message: String::new(),
        },
        Err(err) => VaultResponse {
            available: Vec::new(),
            locked: Vec::new(),
            source: "unavailable".to_string(),
            message: format!("vault_list failed: {err}"),
        },
    }
}

/// Computes insights for the current user.
#[flutter_rust_bridge::frb(sync)]
pub fn vault_insights(session_user_id: Option<String>, now_ms: i64) -> InsightsResponse {
    let user_id = SessionIdentity::new(session_user_id).current_user_id();
    match with_service(|service| Ok(service.insights(&user_id, now_ms))) {
        Ok(insights) => InsightsResponse {
            total: insights.total,
            locked: insights.locked,
            available: insights.available,
            top_mood: insights.top_mood().map(str::to_string),
            next_unlock_at_ms: insights.next_unlock_at,
            message: String::new(),
        },
        Err(err) => InsightsResponse {
            total: 0,
            locked: 0,
            available: 0,
            top_mood: None,
            next_unlock_at_ms: None,
            message: format!("vault_insights failed: {err}"),
        },
    }
}

/// Resolves a delivered alert payload to its echo for playback.
///
/// Returns `None` when the payload is malformed or the echo is unknown; Dart
/// then shows the vault list.
#[flutter_rust_bridge::frb(sync)]
pub fn vault_resolve_alert(echo_id: String) -> Option<EchoItem> {
    let id = uuid::Uuid::parse_str(echo_id.trim()).ok()?;
    with_service(|service| service.get_echo(id).map_err(|err| err.to_string()))
        .map_err(|err| log::warn!("event=ffi_resolve_alert module=ffi status=unresolved error={err}"))
        .ok()
        .map(|echo| to_echo_item(&echo, None))
}

/// Backend that hands scheduled alerts to Dart instead of a platform API.
#[derive(Debug, Default)]
struct DartHandoffBackend {
    queued: Vec<PendingAlert>,
}

impl DartHandoffBackend {
    fn take(&mut self, id: Option<&str>) -> Option<AlertPlan> {
        let id = id?;
        let index = self.queued.iter().position(|alert| alert.id == id)?;
        let alert = self.queued.remove(index);
        Some(AlertPlan {
            notification_id: alert.id,
            fire_at_ms: alert.request.fire_at_ms,
            title: alert.request.title,
            body: alert.request.body,
            echo_id: alert.request.payload.echo_id,
        })
    }
}

impl NotificationBackend for DartHandoffBackend {
    fn schedule_at(&mut self, request: AlertRequest) -> Result<NotificationId, NotifyError> {
        // Platform plugins key alerts by payload; reuse the echo id.
        let id = request.payload.echo_id.clone();
        self.queued.push(PendingAlert {
            id: id.clone(),
            request,
        });
        Ok(id)
    }

    // Dart cancels and lists delivered alerts through its plugin. These two
    // only see alerts queued during the current call.
    fn cancel(&mut self, id: &str) -> Result<(), NotifyError> {
        let before = self.queued.len();
        self.queued.retain(|alert| alert.id != id);
        if self.queued.len() == before {
            return Err(NotifyError::UnknownNotification(id.to_string()));
        }
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<PendingAlert>, NotifyError> {
        Ok(self.queued.clone())
    }
}

type FfiService<'conn> = EchoService<
    SqliteEchoRepository<'conn>,
    JsonFileEchoRepository,
    LocalAssetStore,
    DartHandoffBackend,
>;

fn with_service<T>(
    f: impl FnOnce(&mut FfiService<'_>) -> Result<T, String>,
) -> Result<T, String> {
    let data_dir = resolve_data_dir();
    let config = EchoVaultConfig::load(data_dir.join(CONFIG_FILE_NAME))
        .map_err(|err| err.to_string())?
        .with_data_dir(&data_dir);

    let conn = open_db(config.db_path()).map_err(|err| format!("vault DB open failed: {err}"))?;
    let primary = SqliteEchoRepository::try_new(&conn)
        .map_err(|err| format!("vault store init failed: {err}"))?;
    let store = TieredEchoStore::with_policy(
        primary,
        JsonFileEchoRepository::new(config.fallback_path()),
        config.fallback_policy(),
    );
    let scheduler = NotificationScheduler::new(DartHandoffBackend::default())
        .with_enabled(config.notifications.enabled)
        .with_text(
            config.notifications.title.as_str(),
            config.notifications.body.as_str(),
        );
    let mut service = EchoService::new(store, LocalAssetStore::new(config.asset_dir()), scheduler);
    f(&mut service)
}

fn resolve_data_dir() -> PathBuf {
    DATA_DIR
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("ECHOVAULT_DATA_DIR") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join("echovault")
        })
        .clone()
}

fn to_echo_item(echo: &Echo, time_until_unlock: Option<String>) -> EchoItem {
    EchoItem {
        echo_id: echo.id.to_string(),
        audio_ref: echo.audio_ref.clone(),
        created_at_ms: echo.created_at,
        unlock_at_ms: echo.unlock_at,
        mood_tag: echo.mood_tag.clone(),
        time_until_unlock,
    }
}
