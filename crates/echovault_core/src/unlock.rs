//! Unlock-time bookkeeping for echoes.
//!
//! # Responsibility
//! - Compute an echo's unlock time once, from the chosen lock policy.
//! - Derive locked/available status and countdown labels on every read.
//!
//! # Invariants
//! - Unlock times use calendar-day arithmetic in the caller's time zone, so
//!   "7 days" keeps the same wall-clock time across DST transitions.
//! - An echo is available iff `unlock_at <= now`.
//! - Records with a missing `unlock_at` fail open (available) and log a
//!   warning, so a malformed record never locks its owner out.
//! - Countdown labels always round up.

use crate::model::echo::Echo;
use chrono::{DateTime, Days, TimeDelta, TimeZone};
use log::warn;
use rand::Rng;
use std::cmp::Reverse;
use std::error::Error;
use std::fmt::{Display, Formatter};

const MS_PER_HOUR: i64 = 60 * 60 * 1000;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Smallest offset drawn by [`LockPolicy::Random`].
pub const RANDOM_LOCK_MIN_DAYS: u32 = 1;
/// Largest offset drawn by [`LockPolicy::Random`].
pub const RANDOM_LOCK_MAX_DAYS: u32 = 30;

/// Rule used once at creation time to pick an unlock date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockPolicy {
    OneDay,
    SevenDays,
    ThirtyDays,
    /// Uniform draw from `[1, 30]` days, inclusive.
    Random,
}

impl LockPolicy {
    pub const ALL: [LockPolicy; 4] = [
        LockPolicy::OneDay,
        LockPolicy::SevenDays,
        LockPolicy::ThirtyDays,
        LockPolicy::Random,
    ];

    /// Stable string id used by config files and the FFI layer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::SevenDays => "7d",
            Self::ThirtyDays => "30d",
            Self::Random => "random",
        }
    }

    /// Parses a stable policy id (case-insensitive, surrounding whitespace ignored).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1d" => Some(Self::OneDay),
            "7d" => Some(Self::SevenDays),
            "30d" => Some(Self::ThirtyDays),
            "random" => Some(Self::Random),
            _ => None,
        }
    }

    /// Day offset for fixed policies; `None` for [`LockPolicy::Random`].
    pub fn fixed_days(self) -> Option<u32> {
        match self {
            Self::OneDay => Some(1),
            Self::SevenDays => Some(7),
            Self::ThirtyDays => Some(30),
            Self::Random => None,
        }
    }
}

impl Display for LockPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unlock computation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlockError {
    /// `now + days` is outside the representable date range.
    OutOfRange { days: u32 },
}

impl Display for UnlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { days } => {
                write!(f, "unlock date {days} day(s) from now is out of range")
            }
        }
    }
}

impl Error for UnlockError {}

/// Derived status of an echo relative to the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Available,
    Locked,
}

/// Echoes split by derived lock status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultPartition {
    pub available: Vec<Echo>,
    pub locked: Vec<Echo>,
}

/// Computes the unlock time for `policy` using the thread RNG.
pub fn compute_unlock_at<Tz: TimeZone>(
    policy: LockPolicy,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, UnlockError> {
    compute_unlock_at_with_rng(policy, now, &mut rand::thread_rng())
}

/// Computes the unlock time for `policy` with a caller-provided RNG.
///
/// The random policy draws exactly once per call.
pub fn compute_unlock_at_with_rng<Tz: TimeZone, R: Rng + ?Sized>(
    policy: LockPolicy,
    now: &DateTime<Tz>,
    rng: &mut R,
) -> Result<DateTime<Tz>, UnlockError> {
    let days = policy
        .fixed_days()
        .unwrap_or_else(|| rng.gen_range(RANDOM_LOCK_MIN_DAYS..=RANDOM_LOCK_MAX_DAYS));
    add_calendar_days(now, days)
}

/// Adds whole calendar days, keeping the local wall-clock time.
///
/// When the target wall-clock time does not exist or is ambiguous in the
/// zone (DST transition), falls back to fixed 24-hour increments.
pub fn add_calendar_days<Tz: TimeZone>(
    now: &DateTime<Tz>,
    days: u32,
) -> Result<DateTime<Tz>, UnlockError> {
    if let Some(unlock_at) = now.clone().checked_add_days(Days::new(u64::from(days))) {
        return Ok(unlock_at);
    }

    warn!(
        "event=unlock_compute module=unlock status=degraded reason=calendar_day_unrepresentable days={}",
        days
    );
    TimeDelta::try_days(i64::from(days))
        .and_then(|delta| now.clone().checked_add_signed(delta))
        .ok_or(UnlockError::OutOfRange { days })
}

/// Derives the lock status of one echo at `now_ms`.
pub fn lock_state(echo: &Echo, now_ms: i64) -> LockState {
    match echo.unlock_at {
        Some(unlock_at) if unlock_at > now_ms => LockState::Locked,
        Some(_) => LockState::Available,
        None => {
            warn!(
                "event=lock_state module=unlock status=degraded echo_id={} reason=missing_unlock_at policy=fail_open",
                echo.id
            );
            LockState::Available
        }
    }
}

/// Splits echoes into available and locked sets.
///
/// Pure: the same input and `now_ms` always yield the same partition, and
/// input order is preserved inside each set.
pub fn partition(echoes: impl IntoIterator<Item = Echo>, now_ms: i64) -> VaultPartition {
    let mut result = VaultPartition::default();
    for echo in echoes {
        match lock_state(&echo, now_ms) {
            LockState::Available => result.available.push(echo),
            LockState::Locked => result.locked.push(echo),
        }
    }
    result
}

/// Sorts echoes for display, newest capture first. Stable on ties.
pub fn sort_newest_first(echoes: &mut [Echo]) {
    echoes.sort_by_key(|echo| Reverse(echo.created_at));
}

/// Renders the remaining lock time as a short label.
///
/// Rules (always ceiling):
/// - more than one day remaining -> `"<N> days"`
/// - otherwise more than one hour -> `"<N> hours"`
/// - otherwise `"Less than an hour"`
///
/// Negative differences are clamped to zero.
pub fn time_until_unlock(unlock_at_ms: i64, now_ms: i64) -> String {
    let diff = unlock_at_ms.saturating_sub(now_ms).max(0);
    let days = ceil_div(diff, MS_PER_DAY);
    if days > 1 {
        return format!("{days} days");
    }
    let hours = ceil_div(diff, MS_PER_HOUR);
    if hours > 1 {
        return format!("{hours} hours");
    }
    "Less than an hour".to_string()
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    value / divisor + i64::from(value % divisor != 0)
}
