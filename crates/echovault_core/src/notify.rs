//! One-shot unlock alerts and their delivery routing.
//!
//! # Responsibility
//! - Turn an echo with a future unlock time into a scheduled local alert.
//! - Route a delivered alert back to its echo through an injected navigator.
//!
//! # Invariants
//! - Past-due or already-unlocked echoes are never scheduled (no-op, not an
//!   error).
//! - The alert payload carries only the echo id; delivery re-reads the echo
//!   from the store.
//! - Delivery handling never reads process-wide navigation state.

use crate::model::echo::{Echo, EchoId};
use crate::store::EchoRepository;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const DEFAULT_ALERT_TITLE: &str = "An echo just unlocked";
pub const DEFAULT_ALERT_BODY: &str = "A voice note from your past self is ready to play.";

/// Platform-assigned identifier of a scheduled alert.
pub type NotificationId = String;

pub type NotifyResult<T> = Result<T, NotifyError>;

/// Alert scheduling failures reported by the platform backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    PermissionDenied,
    UnknownNotification(NotificationId),
    Backend(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "notification permission denied"),
            Self::UnknownNotification(id) => write!(f, "no pending notification `{id}`"),
            Self::Backend(message) => write!(f, "notification backend failed: {message}"),
        }
    }
}

impl Error for NotifyError {}

/// Opaque payload delivered back with an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPayload {
    pub echo_id: String,
}

/// Request handed to the platform scheduling capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRequest {
    pub fire_at_ms: i64,
    pub title: String,
    pub body: String,
    pub payload: AlertPayload,
}

/// Alert accepted by the backend and not yet delivered or cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAlert {
    pub id: NotificationId,
    pub request: AlertRequest,
}

/// Local notification capability provided by the platform.
pub trait NotificationBackend {
    fn schedule_at(&mut self, request: AlertRequest) -> NotifyResult<NotificationId>;
    fn cancel(&mut self, id: &str) -> NotifyResult<()>;
    fn list_pending(&self) -> NotifyResult<Vec<PendingAlert>>;
}

/// Process-local backend used by tests and headless hosts.
#[derive(Debug, Default)]
pub struct InMemoryNotificationBackend {
    pending: Vec<PendingAlert>,
}

impl InMemoryNotificationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns every alert whose fire time is `<= now_ms`,
    /// simulating platform delivery.
    pub fn take_due(&mut self, now_ms: i64) -> Vec<PendingAlert> {
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|alert| alert.request.fire_at_ms <= now_ms);
        self.pending = pending;
        due
    }
}

impl NotificationBackend for InMemoryNotificationBackend {
    fn schedule_at(&mut self, request: AlertRequest) -> NotifyResult<NotificationId> {
        let id = Uuid::new_v4().to_string();
        self.pending.push(PendingAlert {
            id: id.clone(),
            request,
        });
        Ok(id)
    }

    fn cancel(&mut self, id: &str) -> NotifyResult<()> {
        let before = self.pending.len();
        self.pending.retain(|alert| alert.id != id);
        if self.pending.len() == before {
            return Err(NotifyError::UnknownNotification(id.to_string()));
        }
        Ok(())
    }

    fn list_pending(&self) -> NotifyResult<Vec<PendingAlert>> {
        Ok(self.pending.clone())
    }
}

/// Builds the alert for `echo`, or `None` when it is already unlocked at
/// `now_ms` or has no unlock time.
pub fn alert_request_for(
    echo: &Echo,
    now_ms: i64,
    title: &str,
    body: &str,
) -> Option<AlertRequest> {
    let fire_at_ms = echo.unlock_at.filter(|unlock_at| *unlock_at > now_ms)?;
    Some(AlertRequest {
        fire_at_ms,
        title: title.to_string(),
        body: body.to_string(),
        payload: AlertPayload {
            echo_id: echo.id.to_string(),
        },
    })
}

/// Schedules unlock alerts through a platform backend.
pub struct NotificationScheduler<B: NotificationBackend> {
    backend: B,
    enabled: bool,
    title: String,
    body: String,
}

impl<B: NotificationBackend> NotificationScheduler<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            enabled: true,
            title: DEFAULT_ALERT_TITLE.to_string(),
            body: DEFAULT_ALERT_BODY.to_string(),
        }
    }

    pub fn with_text(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.title = title.into();
        self.body = body.into();
        self
    }

    /// Disabled schedulers accept every call and schedule nothing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Schedules the unlock alert for `echo`.
    ///
    /// Returns `Ok(None)` when the echo is not locked at `now_ms` or the
    /// scheduler is disabled.
    pub fn schedule(&mut self, echo: &Echo, now_ms: i64) -> NotifyResult<Option<NotificationId>> {
        if !self.enabled {
            return Ok(None);
        }
        let Some(request) = alert_request_for(echo, now_ms, &self.title, &self.body) else {
            info!(
                "event=alert_schedule module=notify status=skipped echo_id={} reason=not_in_future",
                echo.id
            );
            return Ok(None);
        };

        let fire_at_ms = request.fire_at_ms;
        let id = self.backend.schedule_at(request)?;
        info!(
            "event=alert_schedule module=notify status=ok echo_id={} fire_at_ms={}",
            echo.id, fire_at_ms
        );
        Ok(Some(id))
    }

    pub fn cancel(&mut self, id: &str) -> NotifyResult<()> {
        self.backend.cancel(id)
    }

    pub fn list_pending(&self) -> NotifyResult<Vec<PendingAlert>> {
        self.backend.list_pending()
    }
}

/// Screen routing capability supplied by the host app.
pub trait EchoNavigator {
    /// Opens playback for a resolved echo.
    fn open_echo(&self, echo: &Echo);
    /// Opens the vault list when the alert cannot be resolved.
    fn open_vault(&self);
}

impl<N: EchoNavigator + ?Sized> EchoNavigator for &N {
    fn open_echo(&self, echo: &Echo) {
        (**self).open_echo(echo)
    }

    fn open_vault(&self) {
        (**self).open_vault()
    }
}

/// What a delivered alert resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Opened(EchoId),
    /// Payload id is malformed or unknown to the store.
    Unresolved,
}

/// Resolves delivered alerts to echoes and routes the UI.
pub struct AlertDeliveryHandler<R: EchoRepository, N: EchoNavigator> {
    store: R,
    navigator: N,
}

impl<R: EchoRepository, N: EchoNavigator> AlertDeliveryHandler<R, N> {
    pub fn new(store: R, navigator: N) -> Self {
        Self { store, navigator }
    }

    pub fn handle_delivery(&self, payload: &AlertPayload) -> DeliveryOutcome {
        let Ok(echo_id) = Uuid::parse_str(payload.echo_id.trim()) else {
            warn!(
                "event=alert_delivery module=notify status=unresolved reason=malformed_payload"
            );
            self.navigator.open_vault();
            return DeliveryOutcome::Unresolved;
        };

        match self.store.get_echo(echo_id) {
            Ok(Some(echo)) => {
                info!(
                    "event=alert_delivery module=notify status=ok echo_id={}",
                    echo_id
                );
                self.navigator.open_echo(&echo);
                DeliveryOutcome::Opened(echo_id)
            }
            Ok(None) => {
                warn!(
                    "event=alert_delivery module=notify status=unresolved echo_id={} reason=not_found",
                    echo_id
                );
                self.navigator.open_vault();
                DeliveryOutcome::Unresolved
            }
            Err(err) => {
                warn!(
                    "event=alert_delivery module=notify status=unresolved echo_id={} error_code={} error={}",
                    echo_id,
                    err.code(),
                    err
                );
                self.navigator.open_vault();
                DeliveryOutcome::Unresolved
            }
        }
    }
}
