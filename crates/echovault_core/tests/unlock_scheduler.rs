use chrono::{Duration, FixedOffset, TimeZone, Timelike, Utc};
use chrono_tz::America::New_York;
use echovault_core::unlock::{add_calendar_days, sort_newest_first};
use echovault_core::{
    compute_unlock_at, compute_unlock_at_with_rng, lock_state, partition, time_until_unlock,
    EchoDraft, LockPolicy, LockState,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

const MINUTE_MS: i64 = 60 * 1000;
const HOUR_MS: i64 = 60 * MINUTE_MS;

#[test]
fn fixed_policies_add_exact_days_and_keep_time_of_day() {
    let now = Utc.with_ymd_and_hms(2024, 2, 27, 18, 45, 12).unwrap();
    for (policy, days) in [
        (LockPolicy::OneDay, 1),
        (LockPolicy::SevenDays, 7),
        (LockPolicy::ThirtyDays, 30),
    ] {
        let unlock_at = compute_unlock_at(policy, &now).unwrap();
        assert_eq!(unlock_at, now + Duration::days(days));
        assert_eq!(unlock_at.time(), now.time());
    }
}

#[test]
fn fixed_policies_cross_month_and_leap_day_boundaries() {
    let offset = FixedOffset::east_opt(9 * 3600).unwrap();
    let now = offset.with_ymd_and_hms(2024, 2, 28, 23, 30, 0).unwrap();

    let one_day = compute_unlock_at(LockPolicy::OneDay, &now).unwrap();
    assert_eq!(one_day, offset.with_ymd_and_hms(2024, 2, 29, 23, 30, 0).unwrap());
    let thirty = compute_unlock_at(LockPolicy::ThirtyDays, &now).unwrap();
    assert_eq!(thirty, offset.with_ymd_and_hms(2024, 3, 29, 23, 30, 0).unwrap());
    assert_eq!(thirty.hour(), 23);
}

#[test]
fn one_day_across_spring_forward_keeps_wall_clock_time() {
    let now = New_York.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).unwrap();

    let unlock_at = compute_unlock_at(LockPolicy::OneDay, &now).unwrap();

    assert_eq!(unlock_at, New_York.with_ymd_and_hms(2025, 3, 9, 9, 0, 0).unwrap());
    assert_eq!((unlock_at - now).num_hours(), 23);
}

#[test]
fn one_day_across_fall_back_keeps_wall_clock_time() {
    let now = New_York.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap();

    let unlock_at = compute_unlock_at(LockPolicy::OneDay, &now).unwrap();

    assert_eq!(unlock_at, New_York.with_ymd_and_hms(2025, 11, 2, 9, 0, 0).unwrap());
    assert_eq!((unlock_at - now).num_hours(), 25);
}

#[test]
fn seven_days_spanning_a_transition_keeps_wall_clock_time() {
    let now = New_York.with_ymd_and_hms(2025, 3, 5, 20, 15, 0).unwrap();

    let unlock_at = compute_unlock_at(LockPolicy::SevenDays, &now).unwrap();

    assert_eq!(unlock_at, New_York.with_ymd_and_hms(2025, 3, 12, 20, 15, 0).unwrap());
    assert_eq!((unlock_at - now).num_hours(), 7 * 24 - 1);
}

#[test]
fn nonexistent_target_time_falls_back_to_fixed_hours() {
    // 02:30 on 2025-03-09 is skipped in New York.
    let now = New_York.with_ymd_and_hms(2025, 3, 8, 2, 30, 0).unwrap();

    let unlock_at = add_calendar_days(&now, 1).unwrap();

    assert_eq!(unlock_at - now, Duration::hours(24));
    assert_eq!(
        unlock_at.with_timezone(&Utc),
        Utc.with_ymd_and_hms(2025, 3, 9, 7, 30, 0).unwrap()
    );
}

#[test]
fn ambiguous_target_time_falls_back_to_fixed_hours() {
    // 01:30 on 2025-11-02 occurs twice in New York.
    let now = New_York.with_ymd_and_hms(2025, 11, 1, 1, 30, 0).unwrap();

    let unlock_at = add_calendar_days(&now, 1).unwrap();

    assert_eq!(unlock_at - now, Duration::hours(24));
}

#[test]
fn random_policy_draws_uniformly_from_one_to_thirty_days() {
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let trials = 10_000;
    let mut counts: BTreeMap<i64, u32> = BTreeMap::new();

    for _ in 0..trials {
        let unlock_at = compute_unlock_at_with_rng(LockPolicy::Random, &now, &mut rng).unwrap();
        let offset = unlock_at - now;
        assert_eq!(offset.num_seconds() % 86_400, 0, "offset must be whole days");
        *counts.entry(offset.num_days()).or_insert(0) += 1;
    }

    assert_eq!(counts.keys().copied().collect::<Vec<_>>(), (1..=30_i64).collect::<Vec<_>>());
    let expected = trials as f64 / 30.0;
    for (days, count) in counts {
        let deviation = (f64::from(count) - expected).abs() / expected;
        assert!(deviation < 0.25, "day {days} drawn {count} times");
    }
}

#[test]
fn calendar_day_addition_out_of_range_is_an_error() {
    let now = chrono::DateTime::<Utc>::MAX_UTC - Duration::hours(1);
    assert!(add_calendar_days(&now, 1).is_err());
}

#[test]
fn partition_is_exhaustive_disjoint_and_idempotent() {
    let now_ms = 1_000_000;
    let echoes = vec![
        EchoDraft::new("u", "past", now_ms - 1).finalize(1),
        EchoDraft::new("u", "exact", now_ms).finalize(2),
        EchoDraft::new("u", "future", now_ms + 1).finalize(3),
        EchoDraft::new("u", "far", now_ms + 10 * HOUR_MS).finalize(4),
    ];

    let first = partition(echoes.clone(), now_ms);
    let second = partition(echoes.clone(), now_ms);
    assert_eq!(first, second);

    let available: Vec<&str> = first.available.iter().map(|e| e.audio_ref.as_str()).collect();
    let locked: Vec<&str> = first.locked.iter().map(|e| e.audio_ref.as_str()).collect();
    assert_eq!(available, vec!["past", "exact"]);
    assert_eq!(locked, vec!["future", "far"]);

    let mut all_ids: Vec<_> = first
        .available
        .iter()
        .chain(first.locked.iter())
        .map(|echo| echo.id)
        .collect();
    let mut input_ids: Vec<_> = echoes.iter().map(|echo| echo.id).collect();
    all_ids.sort();
    input_ids.sort();
    assert_eq!(all_ids, input_ids);
}

#[test]
fn missing_unlock_at_fails_open() {
    let mut echo = EchoDraft::new("u", "legacy", 0).finalize(1);
    echo.unlock_at = None;

    assert_eq!(lock_state(&echo, 0), LockState::Available);
    let split = partition(vec![echo], 0);
    assert_eq!(split.available.len(), 1);
    assert!(split.locked.is_empty());
}

#[test]
fn sort_newest_first_orders_by_created_at_desc() {
    let mut echoes = vec![
        EchoDraft::new("u", "a", 0).finalize(10),
        EchoDraft::new("u", "b", 0).finalize(30),
        EchoDraft::new("u", "c", 0).finalize(20),
    ];
    sort_newest_first(&mut echoes);
    let refs: Vec<&str> = echoes.iter().map(|e| e.audio_ref.as_str()).collect();
    assert_eq!(refs, vec!["b", "c", "a"]);
}

#[test]
fn time_until_unlock_rounds_up() {
    let now = 1_700_000_000_000;
    assert_eq!(time_until_unlock(now + 25 * HOUR_MS, now), "2 days");
    assert_eq!(time_until_unlock(now + 30 * MINUTE_MS, now), "Less than an hour");
    assert_eq!(time_until_unlock(now + 90 * MINUTE_MS, now), "2 hours");
    assert_eq!(time_until_unlock(now + 10 * 24 * HOUR_MS, now), "10 days");
    assert_eq!(time_until_unlock(now + 24 * HOUR_MS + 1, now), "2 days");
}
