use chrono::{Duration, TimeZone, Utc};
use echovault_core::db::open_db_in_memory;
use echovault_core::{
    AssetError, Echo, EchoDraft, EchoId, EchoRepository, EchoService, EchoServiceError,
    InMemoryNotificationBackend, JsonFileEchoRepository, ListSource, LocalAssetStore, LockPolicy,
    NotificationScheduler, RecordEchoRequest, SqliteEchoRepository, StoreError, StoreResult,
    StoreTier, TieredEchoStore, ANONYMOUS_USER_ID,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

fn capture(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("capture.m4a");
    std::fs::write(&path, b"voice").unwrap();
    path
}

#[test]
fn record_flow_stores_audio_persists_and_schedules_alert() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = TieredEchoStore::new(
        SqliteEchoRepository::try_new(&conn).unwrap(),
        JsonFileEchoRepository::new(dir.path().join("echoes.json")),
    );
    let mut service = EchoService::new(
        store,
        LocalAssetStore::new(dir.path().join("recordings")),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    let request = RecordEchoRequest {
        user_id: ANONYMOUS_USER_ID.to_string(),
        source_path: capture(dir.path()),
        policy: LockPolicy::SevenDays,
        mood_tag: Some("hopeful".to_string()),
    };
    let recorded = service
        .record_echo_at(&request, &now, &mut StdRng::seed_from_u64(3))
        .unwrap();

    assert_eq!(recorded.tier, StoreTier::Primary);
    assert_eq!(
        recorded.echo.unlock_at,
        Some((now + Duration::days(7)).timestamp_millis())
    );
    assert_eq!(recorded.echo.created_at, now.timestamp_millis());
    assert_eq!(std::fs::read(&recorded.echo.audio_ref).unwrap(), b"voice");
    assert!(recorded.echo.audio_ref.ends_with(".m4a"));

    let notification_id = recorded.notification_id.clone().expect("alert scheduled");
    let pending = service.scheduler().list_pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, notification_id);

    let listed = service.store().list(ANONYMOUS_USER_ID);
    assert_eq!(listed.source, ListSource::Primary);
    assert_eq!(listed.echoes.len(), 1);
    let stored = &listed.echoes[0];
    assert_eq!(stored.audio_ref, recorded.echo.audio_ref);
    assert_eq!(stored.unlock_at, recorded.echo.unlock_at);
    assert_eq!(stored.mood_tag.as_deref(), Some("hopeful"));

    service.scheduler_mut().cancel(&notification_id).unwrap();
    assert!(service.scheduler().list_pending().unwrap().is_empty());
}

#[test]
fn asset_failure_aborts_before_persisting() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = TieredEchoStore::new(
        SqliteEchoRepository::try_new(&conn).unwrap(),
        JsonFileEchoRepository::new(dir.path().join("echoes.json")),
    );
    let mut service = EchoService::new(
        store,
        LocalAssetStore::new(dir.path().join("recordings")),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    let request = RecordEchoRequest {
        user_id: ANONYMOUS_USER_ID.to_string(),
        source_path: dir.path().join("missing.m4a"),
        policy: LockPolicy::OneDay,
        mood_tag: None,
    };
    let err = service
        .record_echo_at(&request, &Utc::now(), &mut StdRng::seed_from_u64(1))
        .unwrap_err();

    assert!(matches!(
        err,
        EchoServiceError::Asset(AssetError::SourceNotFound { .. })
    ));
    assert!(service.store().list(ANONYMOUS_USER_ID).echoes.is_empty());
    assert!(service.scheduler().list_pending().unwrap().is_empty());
}

/// Primary tier that is always unreachable.
struct OfflineRepository;

impl EchoRepository for OfflineRepository {
    fn create_echo(&self, _echo: &Echo) -> StoreResult<EchoId> {
        Err(StoreError::Connectivity("network unreachable".to_string()))
    }

    fn get_echo(&self, _id: EchoId) -> StoreResult<Option<Echo>> {
        Err(StoreError::Connectivity("network unreachable".to_string()))
    }

    fn list_echoes(&self, _user_id: &str) -> StoreResult<Vec<Echo>> {
        Err(StoreError::Connectivity("network unreachable".to_string()))
    }
}

#[test]
fn failed_save_removes_the_stored_asset() {
    let dir = tempfile::tempdir().unwrap();
    let corrupt = dir.path().join("echoes.json");
    std::fs::write(&corrupt, "{ not json").unwrap();
    let recordings = dir.path().join("recordings");
    let mut service = EchoService::new(
        TieredEchoStore::new(OfflineRepository, JsonFileEchoRepository::new(corrupt)),
        LocalAssetStore::new(&recordings),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    let request = RecordEchoRequest {
        user_id: ANONYMOUS_USER_ID.to_string(),
        source_path: capture(dir.path()),
        policy: LockPolicy::OneDay,
        mood_tag: None,
    };
    let err = service
        .record_echo_at(&request, &Utc::now(), &mut StdRng::seed_from_u64(5))
        .unwrap_err();

    assert!(matches!(err, EchoServiceError::Store(_)));
    assert_eq!(std::fs::read_dir(&recordings).unwrap().count(), 0);
    assert!(service.scheduler().list_pending().unwrap().is_empty());
}

#[test]
fn rejected_record_removes_the_stored_asset() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let recordings = dir.path().join("recordings");
    let mut service = EchoService::new(
        TieredEchoStore::new(
            SqliteEchoRepository::try_new(&conn).unwrap(),
            JsonFileEchoRepository::new(dir.path().join("echoes.json")),
        ),
        LocalAssetStore::new(&recordings),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    let request = RecordEchoRequest {
        user_id: "   ".to_string(),
        source_path: capture(dir.path()),
        policy: LockPolicy::OneDay,
        mood_tag: None,
    };
    let err = service
        .record_echo_at(&request, &Utc::now(), &mut StdRng::seed_from_u64(6))
        .unwrap_err();

    assert!(matches!(
        err,
        EchoServiceError::Store(StoreError::Validation(_))
    ));
    assert_eq!(std::fs::read_dir(&recordings).unwrap().count(), 0);
}

#[test]
fn already_unlocked_echo_is_available_immediately_after_save() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = TieredEchoStore::new(
        SqliteEchoRepository::try_new(&conn).unwrap(),
        JsonFileEchoRepository::new(dir.path().join("echoes.json")),
    );
    let now_ms = 1_700_000_000_000;
    store
        .save(EchoDraft::new("u1", "/past.m4a", now_ms - 1_000), now_ms)
        .unwrap();
    let service = EchoService::new(
        store,
        LocalAssetStore::new(dir.path().join("recordings")),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    let vault = service.vault("u1", now_ms);
    assert_eq!(vault.available.len(), 1);
    assert!(vault.locked.is_empty());
}

#[test]
fn vault_sorts_and_labels_locked_entries() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let store = TieredEchoStore::new(
        SqliteEchoRepository::try_new(&conn).unwrap(),
        JsonFileEchoRepository::new(dir.path().join("echoes.json")),
    );
    let hour = 60 * 60 * 1000;
    let now_ms = 1_000 * hour;
    for (audio_ref, created_at, unlock_at) in [
        ("/old-locked.m4a", now_ms - 3 * hour, now_ms + 25 * hour),
        ("/new-locked.m4a", now_ms - hour, now_ms + 90 * 60 * 1000),
        ("/open.m4a", now_ms - 2 * hour, now_ms - hour),
    ] {
        store
            .save(
                EchoDraft {
                    created_at: Some(created_at),
                    ..EchoDraft::new("u1", audio_ref, unlock_at)
                },
                now_ms,
            )
            .unwrap();
    }
    let service = EchoService::new(
        store,
        LocalAssetStore::new(dir.path().join("recordings")),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    let vault = service.vault("u1", now_ms);
    let locked: Vec<(&str, &str)> = vault
        .locked
        .iter()
        .map(|entry| (entry.echo.audio_ref.as_str(), entry.time_until_unlock.as_str()))
        .collect();
    assert_eq!(
        locked,
        vec![("/new-locked.m4a", "2 hours"), ("/old-locked.m4a", "2 days")]
    );
    assert_eq!(vault.available[0].audio_ref, "/open.m4a");

    let insights = service.insights("u1", now_ms);
    assert_eq!(insights.total, 3);
    assert_eq!(insights.locked, 2);
    assert_eq!(insights.next_unlock_at, Some(now_ms + 90 * 60 * 1000));
}

#[test]
fn get_echo_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let repo = SqliteEchoRepository::try_new(&conn).unwrap();
    let known = EchoDraft::new("u1", "/a.m4a", 1).finalize(1);
    repo.create_echo(&known).unwrap();

    let service = EchoService::new(
        TieredEchoStore::new(repo, JsonFileEchoRepository::new(dir.path().join("echoes.json"))),
        LocalAssetStore::new(dir.path().join("recordings")),
        NotificationScheduler::new(InMemoryNotificationBackend::new()),
    );

    assert_eq!(service.get_echo(known.id).unwrap(), known);
    let missing = uuid::Uuid::new_v4();
    assert!(matches!(
        service.get_echo(missing).unwrap_err(),
        EchoServiceError::Store(StoreError::NotFound(id)) if id == missing
    ));
}
