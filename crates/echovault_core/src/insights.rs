//! Usage statistics for the insights screen.

use crate::model::echo::Echo;
use crate::unlock::{lock_state, LockState};
use std::collections::BTreeMap;

/// Aggregate counters over one user's echoes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoInsights {
    pub total: u32,
    pub locked: u32,
    pub available: u32,
    /// Echo count per trimmed mood tag. Untagged echoes are not counted here.
    pub mood_counts: BTreeMap<String, u32>,
    /// Earliest future unlock time among locked echoes.
    pub next_unlock_at: Option<i64>,
    pub first_recorded_at: Option<i64>,
    pub last_recorded_at: Option<i64>,
}

impl EchoInsights {
    /// Most used mood tag; ties resolve to the alphabetically first tag.
    pub fn top_mood(&self) -> Option<&str> {
        self.mood_counts
            .iter()
            .fold(None, |best: Option<(&String, u32)>, (tag, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((tag, *count)),
            })
            .map(|(tag, _)| tag.as_str())
    }
}

/// Computes insights at `now_ms`. Lock status is derived, never stored.
pub fn compute_insights<'a>(echoes: impl IntoIterator<Item = &'a Echo>, now_ms: i64) -> EchoInsights {
    let mut insights = EchoInsights::default();
    for echo in echoes {
        insights.total += 1;
        match lock_state(echo, now_ms) {
            LockState::Available => insights.available += 1,
            LockState::Locked => {
                insights.locked += 1;
                if let Some(unlock_at) = echo.unlock_at {
                    insights.next_unlock_at = Some(
                        insights
                            .next_unlock_at
                            .map_or(unlock_at, |next| next.min(unlock_at)),
                    );
                }
            }
        }
        if let Some(tag) = echo.mood_tag.as_deref().map(str::trim) {
            *insights.mood_counts.entry(tag.to_string()).or_insert(0) += 1;
        }
        insights.first_recorded_at = Some(
            insights
                .first_recorded_at
                .map_or(echo.created_at, |first| first.min(echo.created_at)),
        );
        insights.last_recorded_at = Some(
            insights
                .last_recorded_at
                .map_or(echo.created_at, |last| last.max(echo.created_at)),
        );
    }
    insights
}
