/// Integration tests for the log entry repository against SQLite and the in-process cache
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use logkeep::{
    cache::{Cache, MemoryCache},
    context::OpContext,
    models::LogEntry,
    repository::{LogEntryRepository, RepoError, SearchParams},
    store::{Dialect, RelationalStore, SqlValue, SqliteStore, StoreError},
};

const READ_TTL: Duration = Duration::from_secs(300);

/// Store wrapper that can be switched off to prove a read never reached it
struct SwitchableStore {
    inner: SqliteStore,
    offline: AtomicBool,
}

impl SwitchableStore {
    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl RelationalStore for SwitchableStore {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn query_row(&self, sql: &str, args: &[SqlValue]) -> Result<LogEntry, StoreError> {
        self.check()?;
        self.inner.query_row(sql, args).await
    }

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<LogEntry>, StoreError> {
        self.check()?;
        self.inner.query(sql, args).await
    }

    async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.exec(sql, args).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

struct Fixture {
    repo: LogEntryRepository,
    store: Arc<SwitchableStore>,
    cache: Arc<MemoryCache>,
}

async fn fixture() -> Fixture {
    let store = Arc::new(SwitchableStore {
        inner: SqliteStore::in_memory().await.unwrap(),
        offline: AtomicBool::new(false),
    });
    let cache = Arc::new(MemoryCache::new());
    let repo = LogEntryRepository::new(store.clone()).with_cache(cache.clone(), "app:");
    Fixture { repo, store, cache }
}

async fn uncached() -> LogEntryRepository {
    LogEntryRepository::new(Arc::new(SqliteStore::in_memory().await.unwrap()))
}

fn ctx() -> OpContext {
    OpContext::with_timeout(Duration::from_secs(5))
}

fn by_level(level: &str) -> SearchParams {
    SearchParams {
        level: Some(level.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_save_get_search_scenario() {
    let f = fixture().await;

    let mut entry = LogEntry::new("error", "disk full");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    assert_eq!(entry.id, 1);

    let fetched = f.repo.get_by_id(&ctx(), 1, true, READ_TTL).await.unwrap();
    assert_eq!(fetched, entry);

    let errors = f.repo.search(&ctx(), &by_level("error")).await.unwrap();
    assert_eq!(errors, vec![entry]);

    let warnings = f.repo.search(&ctx(), &by_level("warn")).await.unwrap();
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn test_insert_assigns_increasing_ids() {
    let repo = uncached().await;

    let mut ids = Vec::new();
    for i in 0..3 {
        let mut entry = LogEntry::new("info", format!("message {i}"));
        repo.save(&ctx(), &mut entry).await.unwrap();
        ids.push(entry.id);
    }

    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_resave_updates_in_place() {
    let f = fixture().await;

    let mut entry = LogEntry::new("warn", "slow query");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    let id = entry.id;

    entry.message = "slow query (3s)".to_string();
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    assert_eq!(entry.id, id);

    let all = f.repo.all(&ctx()).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].message, "slow query (3s)");

    // the cache holds the latest write too
    f.store.set_offline(true);
    let cached = f.repo.get_by_id(&ctx(), id, true, READ_TTL).await.unwrap();
    assert_eq!(cached.message, "slow query (3s)");
}

#[tokio::test]
async fn test_save_with_unknown_id_inserts_that_id() {
    let repo = uncached().await;

    let mut entry = LogEntry::new("info", "imported");
    entry.id = 42;
    repo.save(&ctx(), &mut entry).await.unwrap();

    let fetched = repo.get_by_id(&ctx(), 42, false, READ_TTL).await.unwrap();
    assert_eq!(fetched.message, "imported");
}

#[tokio::test]
async fn test_get_missing_id_is_not_found() {
    let f = fixture().await;

    let err = f.repo.get_by_id(&ctx(), 999, true, READ_TTL).await.unwrap_err();
    assert!(matches!(err, RepoError::NotFound { id: 999 }));
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn test_cache_hit_skips_store() {
    let f = fixture().await;

    let mut entry = LogEntry::new("error", "disk full");
    f.repo.save(&ctx(), &mut entry).await.unwrap();

    f.store.set_offline(true);
    let cached = f.repo.get_by_id(&ctx(), entry.id, true, READ_TTL).await.unwrap();
    assert_eq!(cached, entry);

    // bypassing the cache reaches the offline store
    let err = f
        .repo
        .get_by_id(&ctx(), entry.id, false, READ_TTL)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::StoreFailure { op: "get_by_id", .. }));
}

#[tokio::test]
async fn test_cache_miss_reads_store_and_refreshes_cache() {
    let f = fixture().await;

    let mut entry = LogEntry::new("info", "started");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    f.cache.clear();

    let fetched = f.repo.get_by_id(&ctx(), entry.id, true, READ_TTL).await.unwrap();
    assert_eq!(fetched, entry);

    let key = f.repo.cache_key(entry.id).unwrap();
    let raw = f.cache.get(&key).await.unwrap().expect("refreshed");
    let decoded: LogEntry = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, entry);

    f.store.set_offline(true);
    assert_eq!(
        f.repo.get_by_id(&ctx(), entry.id, true, READ_TTL).await.unwrap(),
        entry
    );
}

#[tokio::test]
async fn test_store_failure_on_save_leaves_cache_untouched() {
    let f = fixture().await;
    f.store.set_offline(true);

    // nanosecond precision the stores would truncate
    let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
    let mut entry = LogEntry::new("error", "never stored").with_timestamp(ts);
    let err = f.repo.save(&ctx(), &mut entry).await.unwrap_err();

    assert!(matches!(err, RepoError::StoreFailure { .. }));
    assert_eq!(entry.id, 0);
    assert_eq!(entry.timestamp, ts);
    assert!(f.cache.is_empty());
}

#[tokio::test]
async fn test_successful_save_truncates_to_micros() {
    let repo = uncached().await;
    let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();

    let mut entry = LogEntry::new("info", "precise").with_timestamp(ts);
    repo.save(&ctx(), &mut entry).await.unwrap();
    assert_eq!(entry.timestamp, Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap());
}

#[tokio::test]
async fn test_huge_read_ttl_is_not_fatal() {
    let f = fixture().await;

    let mut entry = LogEntry::new("error", "disk full");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    f.cache.clear();

    let fetched = f
        .repo
        .get_by_id(&ctx(), entry.id, false, Duration::MAX)
        .await
        .unwrap();
    assert_eq!(fetched, entry);

    // the refreshed value never expires
    f.store.set_offline(true);
    let cached = f
        .repo
        .get_by_id(&ctx(), entry.id, true, Duration::MAX)
        .await
        .unwrap();
    assert_eq!(cached, entry);
}

#[tokio::test]
async fn test_expired_read_ttl_goes_back_to_store() {
    let f = fixture().await;

    let mut entry = LogEntry::new("warn", "short lived");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    f.cache.clear();

    f.repo
        .get_by_id(&ctx(), entry.id, true, Duration::from_millis(20))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    // the expired value is gone, so the read reaches the offline store
    f.store.set_offline(true);
    let err = f
        .repo
        .get_by_id(&ctx(), entry.id, true, READ_TTL)
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::StoreFailure { op: "get_by_id", .. }));

    f.store.set_offline(false);
    let fetched = f.repo.get_by_id(&ctx(), entry.id, true, READ_TTL).await.unwrap();
    assert_eq!(fetched, entry);
}

#[tokio::test]
async fn test_cached_and_uncached_repositories_agree() {
    let cached = fixture().await.repo;
    let plain = uncached().await;
    let base = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

    for (i, (level, message)) in [
        ("error", "disk full"),
        ("info", "started"),
        ("error", "disk slow"),
        ("warn", "retrying"),
    ]
    .into_iter()
    .enumerate()
    {
        let ts = base + ChronoDuration::minutes(i as i64);
        let mut a = LogEntry::new(level, message).with_timestamp(ts);
        let mut b = a.clone();
        cached.save(&ctx(), &mut a).await.unwrap();
        plain.save(&ctx(), &mut b).await.unwrap();
        assert_eq!(a, b);
    }

    for id in 1..=5 {
        // read twice so the cached repository answers the second from cache
        for _ in 0..2 {
            let from_cached = cached.get_by_id(&ctx(), id, true, READ_TTL).await;
            let from_plain = plain.get_by_id(&ctx(), id, true, READ_TTL).await;
            match (from_cached, from_plain) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                (Err(a), Err(b)) => assert!(a.is_not_found() && b.is_not_found()),
                (a, b) => panic!("results differ for id {id}: {a:?} vs {b:?}"),
            }
        }
    }

    for params in [
        SearchParams::default(),
        by_level("error"),
        SearchParams {
            message_contains: Some("disk".to_string()),
            limit: 1,
            ..Default::default()
        },
    ] {
        assert_eq!(
            cached.search(&ctx(), &params).await.unwrap(),
            plain.search(&ctx(), &params).await.unwrap()
        );
    }
    assert_eq!(cached.all(&ctx()).await.unwrap(), plain.all(&ctx()).await.unwrap());
}

#[tokio::test]
async fn test_every_filter_combination_matches_rows() {
    let repo = uncached().await;
    let base = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

    let rows = [
        ("error", "Disk full"),
        ("info", "disk mounted"),
        ("error", "network down"),
        ("warn", "disk almost full"),
        ("error", "disk latency"),
        ("info", "started"),
    ];
    let mut saved = Vec::new();
    for (i, (level, message)) in rows.into_iter().enumerate() {
        let mut entry =
            LogEntry::new(level, message).with_timestamp(base + ChronoDuration::hours(i as i64));
        repo.save(&ctx(), &mut entry).await.unwrap();
        saved.push(entry);
    }

    let full = SearchParams {
        level: Some("error".to_string()),
        message_contains: Some("DISK".to_string()),
        since: Some(base + ChronoDuration::hours(1)),
        until: Some(base + ChronoDuration::hours(4)),
        ..Default::default()
    };

    for mask in 0u8..16 {
        let params = SearchParams {
            level: (mask & 1 != 0).then(|| full.level.clone().unwrap()),
            message_contains: (mask & 2 != 0).then(|| full.message_contains.clone().unwrap()),
            since: (mask & 4 != 0).then(|| full.since.unwrap()),
            until: (mask & 8 != 0).then(|| full.until.unwrap()),
            ..Default::default()
        };

        let mut expected: Vec<LogEntry> = saved
            .iter()
            .filter(|e| params.level.as_ref().map_or(true, |l| &e.level == l))
            .filter(|e| {
                params.message_contains.as_ref().map_or(true, |needle| {
                    e.message.to_lowercase().contains(&needle.to_lowercase())
                })
            })
            .filter(|e| params.since.map_or(true, |t| e.timestamp >= t))
            .filter(|e| params.until.map_or(true, |t| e.timestamp <= t))
            .cloned()
            .collect();
        expected.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let actual = repo.search(&ctx(), &params).await.unwrap();
        assert_eq!(actual, expected, "filter mask {mask:04b}");
    }
}

#[tokio::test]
async fn test_search_newest_first_with_time_window() {
    let repo = uncached().await;
    let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    for hour in 0..5 {
        let mut entry = LogEntry::new("info", format!("tick {hour}"))
            .with_timestamp(base + ChronoDuration::hours(hour));
        repo.save(&ctx(), &mut entry).await.unwrap();
    }

    let all = repo.search(&ctx(), &SearchParams::default()).await.unwrap();
    let messages: Vec<_> = all.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["tick 4", "tick 3", "tick 2", "tick 1", "tick 0"]);

    // both bounds are inclusive
    let window = SearchParams {
        since: Some(base + ChronoDuration::hours(1)),
        until: Some(base + ChronoDuration::hours(3)),
        ..Default::default()
    };
    let hits = repo.search(&ctx(), &window).await.unwrap();
    let messages: Vec<_> = hits.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["tick 3", "tick 2", "tick 1"]);
}

#[tokio::test]
async fn test_search_limit_and_offset_clamping() {
    let repo = uncached().await;
    for i in 0..3 {
        let mut entry = LogEntry::new("debug", format!("entry {i}"));
        repo.save(&ctx(), &mut entry).await.unwrap();
    }

    let zero_limit = SearchParams {
        limit: 0,
        ..Default::default()
    };
    assert_eq!(zero_limit.effective_limit(), 100);
    assert_eq!(repo.search(&ctx(), &zero_limit).await.unwrap().len(), 3);

    let huge_limit = SearchParams {
        limit: 5000,
        ..Default::default()
    };
    assert_eq!(huge_limit.effective_limit(), 1000);
    assert_eq!(repo.search(&ctx(), &huge_limit).await.unwrap().len(), 3);

    let negative_offset = SearchParams {
        offset: -5,
        ..Default::default()
    };
    assert_eq!(negative_offset.effective_offset(), 0);
    assert_eq!(repo.search(&ctx(), &negative_offset).await.unwrap().len(), 3);

    let paged = SearchParams {
        limit: 1,
        offset: 2,
        ..Default::default()
    };
    assert_eq!(repo.search(&ctx(), &paged).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_message_filter_is_literal_and_case_insensitive() {
    let repo = uncached().await;
    for message in ["Disk 100% full", "disk 1000 blocks", "network down"] {
        let mut entry = LogEntry::new("error", message);
        repo.save(&ctx(), &mut entry).await.unwrap();
    }

    let disk = SearchParams {
        message_contains: Some("DISK".to_string()),
        ..Default::default()
    };
    assert_eq!(repo.search(&ctx(), &disk).await.unwrap().len(), 2);

    let percent = SearchParams {
        message_contains: Some("0%".to_string()),
        ..Default::default()
    };
    let hits = repo.search(&ctx(), &percent).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].message, "Disk 100% full");
}

#[tokio::test]
async fn test_search_and_all_never_read_cache() {
    let f = fixture().await;

    let mut entry = LogEntry::new("error", "disk full");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    f.store.set_offline(true);

    assert!(f.repo.search(&ctx(), &by_level("error")).await.is_err());
    assert!(f.repo.all(&ctx()).await.is_err());
}

#[tokio::test]
async fn test_timestamp_survives_store_roundtrip() {
    let f = fixture().await;

    let mut entry = LogEntry::new("info", "precise");
    f.repo.save(&ctx(), &mut entry).await.unwrap();
    f.cache.clear();

    let from_store = f.repo.get_by_id(&ctx(), entry.id, false, READ_TTL).await.unwrap();
    assert_eq!(from_store.timestamp, entry.timestamp);
}

#[tokio::test]
async fn test_expired_deadline_interrupts_operation() {
    let repo = uncached().await;
    let ctx = OpContext::with_timeout(Duration::ZERO);

    let err = repo.all(&ctx).await.unwrap_err();
    assert!(err.is_interrupted());
}
