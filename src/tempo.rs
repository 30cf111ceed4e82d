use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::cache::TempoCache;
use crate::model::{TempoResult, Track};

pub const TEMPO_SOURCE: &str = "getsongbpm";
const DEFAULT_BASE_URL: &str = "https://api.getsongbpm.com";
const CONFIDENCE_SCALE: f64 = 10.0;

/// Lookups issued concurrently per batch
pub const ENRICH_BATCH_SIZE: usize = 5;
/// Delay between batches, to respect the provider's rate limit
pub const ENRICH_PACE: Duration = Duration::from_millis(200);

/// External tempo-data source. Lookups never fail: network, parsing and
/// missing-data conditions all resolve to `None`.
#[async_trait]
pub trait TempoProvider: Send + Sync {
    async fn lookup(&self, artist: &str, title: &str) -> Option<TempoResult>;
}

#[derive(Debug, Deserialize)]
struct SongBpmResponse {
    song: Option<SongBpmMatch>,
}

#[derive(Debug, Deserialize)]
struct SongBpmMatch {
    bpm: Option<f64>,
    #[serde(default)]
    count: Option<f64>,
    #[serde(default)]
    key_of: Option<String>,
    #[serde(default)]
    time_sig: Option<String>,
}

/// Strip punctuation, collapse whitespace, lowercase, trim
#[must_use]
pub fn normalize_search_term(term: &str) -> String {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();

    let punctuation = PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").unwrap());
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").unwrap());

    let lowered = term.to_lowercase();
    let stripped = punctuation.replace_all(&lowered, "");
    whitespace.replace_all(&stripped, " ").trim().to_string()
}

/// Rate-limited BPM lookup client backed by the expiring tempo cache.
///
/// An unconfigured API key is a valid "no data" state, not an error: every
/// lookup silently resolves to `None` without touching the network.
pub struct SongBpmClient {
    api_key: Option<String>,
    base_url: String,
    http: reqwest::Client,
    cache: Mutex<TempoCache>,
}

impl SongBpmClient {
    #[must_use]
    pub fn new(api_key: Option<String>, cache: TempoCache) -> Self {
        Self::with_base_url(api_key, cache, DEFAULT_BASE_URL)
    }

    #[must_use]
    pub fn with_base_url(api_key: Option<String>, cache: TempoCache, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            cache: Mutex::new(cache),
        }
    }

    pub async fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.lock().await.stats()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    async fn fetch(&self, api_key: &str, artist: &str, title: &str) -> Option<TempoResult> {
        let url = format!(
            "{}/search/?api_key={}&type=both&lookup=song:{} artist:{}",
            self.base_url, api_key, title, artist
        );

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Tempo provider request failed for {artist} - {title}: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Tempo provider returned {} for {artist} - {title}",
                response.status()
            );
            return None;
        }

        let body: SongBpmResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Unreadable tempo provider response for {artist} - {title}: {e}");
                return None;
            }
        };

        let song = body.song?;
        let bpm = song.bpm.filter(|b| *b > 0.0)?;
        let confidence = (song.count.unwrap_or(1.0) / CONFIDENCE_SCALE).min(1.0);

        Some(TempoResult {
            bpm,
            confidence,
            source: TEMPO_SOURCE.to_string(),
            key: song.key_of.filter(|k| !k.is_empty()),
            time_signature: song.time_sig.filter(|t| !t.is_empty()),
        })
    }
}

#[async_trait]
impl TempoProvider for SongBpmClient {
    async fn lookup(&self, artist: &str, title: &str) -> Option<TempoResult> {
        let Some(api_key) = self.api_key.clone() else {
            debug!("Tempo provider API key not configured, skipping lookup");
            return None;
        };

        let artist = normalize_search_term(artist);
        let title = normalize_search_term(title);

        if let Some(cached) = self.cache.lock().await.get(&artist, &title) {
            debug!("Tempo cache hit for {artist} - {title}");
            return Some(cached);
        }

        debug!("Tempo lookup for {artist} - {title}");
        let result = self.fetch(&api_key, &artist, &title).await?;

        // Only a fresh successful lookup refreshes the cache
        self.cache.lock().await.set(&artist, &title, &result);
        Some(result)
    }
}

/// Outcome of an enrichment pass. Never an error: total lookup failure
/// degrades to "no tempo data" on every affected track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub resolved: usize,
    pub missing: usize,
}

impl EnrichmentSummary {
    /// True when enrichment produced nothing at all for a non-empty input
    #[must_use]
    pub fn fully_degraded(&self) -> bool {
        self.resolved == 0 && self.missing > 0
    }
}

/// Fans tracks out to the tempo provider in bounded concurrent batches with
/// inter-batch pacing, to stay under the provider's rate limit.
pub struct BatchEnricher<'a, P: TempoProvider> {
    provider: &'a P,
    batch_size: usize,
    pace: Duration,
}

impl<'a, P: TempoProvider> BatchEnricher<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P) -> Self {
        Self::with_pacing(provider, ENRICH_BATCH_SIZE, ENRICH_PACE)
    }

    #[must_use]
    pub fn with_pacing(provider: &'a P, batch_size: usize, pace: Duration) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            pace,
        }
    }

    /// Resolve tempo for every track in place. Batches run strictly
    /// sequentially; within a batch all lookups run concurrently and fully
    /// settle before the next batch starts.
    pub async fn enrich(&self, tracks: &mut [Track]) -> EnrichmentSummary {
        let mut summary = EnrichmentSummary::default();
        let total_batches = tracks.len().div_ceil(self.batch_size);

        for (index, batch) in tracks.chunks_mut(self.batch_size).enumerate() {
            let lookups = batch.iter().map(|track| {
                self.provider
                    .lookup(track.primary_artist(), &track.name)
            });
            let results = join_all(lookups).await;

            for (track, tempo) in batch.iter_mut().zip(results) {
                match tempo {
                    Some(t) => {
                        track.tempo = Some(t);
                        summary.resolved += 1;
                    }
                    None => {
                        track.tempo = None;
                        summary.missing += 1;
                    }
                }
            }

            if index + 1 < total_batches && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
        }

        if summary.fully_degraded() {
            warn!(
                "Tempo enrichment resolved nothing for {} tracks, continuing without BPM data",
                summary.missing
            );
        } else {
            info!(
                "Tempo enrichment resolved {}/{} tracks",
                summary.resolved,
                summary.resolved + summary.missing
            );
        }

        summary
    }
}
