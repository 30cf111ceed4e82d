use chrono::{Duration, Utc};
use playlist_weaver::cache::{CacheEntry, TempoCache, CACHE_TTL_DAYS};
use playlist_weaver::model::TempoResult;

fn tempo(bpm: f64) -> TempoResult {
    TempoResult {
        bpm,
        confidence: 0.7,
        source: "getsongbpm".to_string(),
        key: Some("Am".to_string()),
        time_signature: Some("4/4".to_string()),
    }
}

#[test]
fn test_round_trip_within_ttl() {
    let mut cache = TempoCache::in_memory();
    let result = tempo(124.5);

    cache.set("Daft Punk", "One More Time", &result);
    let read = cache.get("Daft Punk", "One More Time");

    assert_eq!(read, Some(result));
}

#[test]
fn test_keys_normalize_case_and_whitespace() {
    let mut cache = TempoCache::in_memory();
    cache.set("Daft Punk", "One More Time", &tempo(124.5));

    // "daft punk " collides with "Daft Punk"
    assert!(cache.get("daft punk ", " ONE MORE TIME").is_some());
    assert!(cache.get("Daft Punks", "One More Time").is_none());
}

#[test]
fn test_expired_entry_is_absent_and_evicted() {
    let mut cache = TempoCache::in_memory();
    let key = TempoCache::track_key("Artist", "Title");
    let stale = CacheEntry::new(
        &tempo(90.0),
        key.clone(),
        Utc::now() - Duration::days(CACHE_TTL_DAYS + 1),
    );
    cache.insert(key, stale);

    assert_eq!(cache.get("Artist", "Title"), None);
    // Eviction happened on read
    assert_eq!(cache.stats().total, 0);

    // A fresh set after expiry works again
    cache.set("Artist", "Title", &tempo(90.0));
    assert!(cache.get("Artist", "Title").is_some());
}

#[test]
fn test_entry_just_inside_ttl_survives() {
    let mut cache = TempoCache::in_memory();
    let key = TempoCache::track_key("Artist", "Title");
    let entry = CacheEntry::new(
        &tempo(110.0),
        key.clone(),
        Utc::now() - Duration::days(CACHE_TTL_DAYS) + Duration::hours(1),
    );
    cache.insert(key, entry);

    assert!(cache.get("Artist", "Title").is_some());
}

#[test]
fn test_clear_empties_cache() {
    let mut cache = TempoCache::in_memory();
    cache.set("A", "One", &tempo(100.0));
    cache.set("B", "Two", &tempo(120.0));
    assert_eq!(cache.stats().total, 2);

    cache.clear();
    assert_eq!(cache.stats().total, 0);
    assert!(cache.get("A", "One").is_none());
}

#[test]
fn test_stats_report_oldest_and_newest() {
    let mut cache = TempoCache::in_memory();
    let old_ts = Utc::now() - Duration::days(2);
    let new_ts = Utc::now();

    cache.insert(
        TempoCache::track_key("A", "One"),
        CacheEntry::new(&tempo(100.0), TempoCache::track_key("A", "One"), old_ts),
    );
    cache.insert(
        TempoCache::track_key("B", "Two"),
        CacheEntry::new(&tempo(120.0), TempoCache::track_key("B", "Two"), new_ts),
    );

    let stats = cache.stats();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.oldest_entry, Some(old_ts));
    assert_eq!(stats.newest_entry, Some(new_ts));
}

#[test]
fn test_file_backed_cache_persists_and_reloads() {
    let path = std::env::temp_dir().join(format!(
        "playlist-weaver-cache-test-{}.json",
        std::process::id()
    ));
    let path_str = path.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);

    {
        let mut cache = TempoCache::open(&path_str);
        cache.set("Daft Punk", "One More Time", &tempo(124.5));
    }

    let mut reopened = TempoCache::open(&path_str);
    assert_eq!(
        reopened.get("Daft Punk", "One More Time"),
        Some(tempo(124.5))
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_corrupt_cache_file_degrades_to_empty() {
    let path = std::env::temp_dir().join(format!(
        "playlist-weaver-corrupt-test-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, b"{ not json at all").unwrap();
    let path_str = path.to_str().unwrap().to_string();

    let mut cache = TempoCache::open(&path_str);
    assert_eq!(cache.stats().total, 0);
    // Still usable for the session
    cache.set("A", "One", &tempo(100.0));
    assert!(cache.get("A", "One").is_some());

    let _ = std::fs::remove_file(&path);
}
