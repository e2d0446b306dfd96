//! Echo domain model.
//!
//! # Responsibility
//! - Define the canonical voice-note record persisted by every store tier.
//! - Turn capture-time drafts into complete records (id + creation time).
//!
//! # Invariants
//! - `id` is stable and never reused for another echo.
//! - `unlock_at` is fixed at creation and never recomputed.
//! - Locked/available status is derived from `unlock_at`, never stored.
//!
//! # See also
//! - crate::unlock

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one echo record.
pub type EchoId = Uuid;

/// Canonical persisted voice note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Echo {
    /// Stable client-generated ID.
    pub id: EchoId,
    /// Owner identifier (anonymous id when no session exists).
    pub user_id: String,
    /// Durable path or URL of the audio asset.
    pub audio_ref: String,
    /// Capture time in epoch milliseconds.
    pub created_at: i64,
    /// Unlock time in epoch milliseconds.
    ///
    /// Always `Some` for records written by this crate. `None` only appears
    /// when a fallback store returns a malformed legacy record.
    #[serde(default)]
    pub unlock_at: Option<i64>,
    /// Optional free-text mood classification.
    #[serde(default)]
    pub mood_tag: Option<String>,
}

/// Capture-time input for a new echo.
///
/// `id` and `created_at` are filled in by [`EchoDraft::finalize`] when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoDraft {
    pub id: Option<EchoId>,
    pub user_id: String,
    pub audio_ref: String,
    pub created_at: Option<i64>,
    pub unlock_at: Option<i64>,
    pub mood_tag: Option<String>,
}

/// Validation failures for echo write paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoValidationError {
    EmptyUserId,
    EmptyAudioRef,
    MissingUnlockAt,
}

impl Display for EchoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUserId => write!(f, "user_id must not be empty"),
            Self::EmptyAudioRef => write!(f, "audio_ref must not be empty"),
            Self::MissingUnlockAt => write!(f, "unlock_at is required for new echoes"),
        }
    }
}

impl Error for EchoValidationError {}

impl EchoDraft {
    /// Creates a draft for the given owner, audio reference and unlock time.
    pub fn new(user_id: impl Into<String>, audio_ref: impl Into<String>, unlock_at: i64) -> Self {
        Self {
            user_id: user_id.into(),
            audio_ref: audio_ref.into(),
            unlock_at: Some(unlock_at),
            ..Self::default()
        }
    }

    pub fn with_mood_tag(mut self, mood_tag: impl Into<String>) -> Self {
        self.mood_tag = Some(mood_tag.into());
        self
    }

    /// Completes the draft into a persistable record.
    ///
    /// # Contract
    /// - Missing `id` gets a fresh UUID v4.
    /// - Missing `created_at` becomes `now_ms`.
    /// - Fields are kept as entered; only blank mood tags become `None`.
    /// - Does not validate; write paths call [`Echo::validate`].
    pub fn finalize(self, now_ms: i64) -> Echo {
        Echo {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_id: self.user_id,
            audio_ref: self.audio_ref,
            created_at: self.created_at.unwrap_or(now_ms),
            unlock_at: self.unlock_at,
            mood_tag: normalize_mood_tag(self.mood_tag),
        }
    }
}

impl Echo {
    /// Checks the invariants required before any store write.
    pub fn validate(&self) -> Result<(), EchoValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(EchoValidationError::EmptyUserId);
        }
        if self.audio_ref.trim().is_empty() {
            return Err(EchoValidationError::EmptyAudioRef);
        }
        if self.unlock_at.is_none() {
            return Err(EchoValidationError::MissingUnlockAt);
        }
        Ok(())
    }
}

/// Drops a mood tag that holds only whitespace.
pub fn normalize_mood_tag(value: Option<String>) -> Option<String> {
    value.filter(|tag| !tag.trim().is_empty())
}
