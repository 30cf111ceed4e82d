use std::time::Duration;

use futures::future::join_all;
use log::{info, warn};

use crate::aggregate::{dedup_fresh, merge_incremental};
use crate::catalog::CatalogProvider;
use crate::error::{EngineError, Result};
use crate::model::{SourceSelection, Track};
use crate::selection::SelectionSet;
use crate::tempo::{BatchEnricher, EnrichmentSummary, TempoProvider, ENRICH_BATCH_SIZE, ENRICH_PACE};
use crate::view::{filtered_sorted, Filter, SortKey, SortOrder, ViewSpec};

/// Track URIs per add-to-playlist call, the provider's hard limit
const EXPORT_CHUNK_SIZE: usize = 100;

/// Collection lifecycle: `Empty → Loading → Ready → (Merging → Ready)* →
/// Empty`. A failed load moves to `Error` and leaves the prior collection
/// untouched; a retry re-enters `Loading`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Empty,
    Loading,
    Merging,
    Ready,
    Error(String),
}

/// A token handed out when a load begins. Only the most recent token may
/// commit, so a slow stale load can never overwrite a newer result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadGeneration(u64);

/// What a completed load looked like, for surfacing to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total: usize,
    pub duplicates: usize,
    pub enrichment: EnrichmentSummary,
}

impl LoadReport {
    /// Non-fatal notice: tempo data is missing for everything
    #[must_use]
    pub fn tempo_degraded(&self) -> bool {
        self.enrichment.fully_degraded()
    }
}

/// Settle-all outcome of a bulk playlist operation: successes are applied,
/// skips and failures are collected and reported together.
#[derive(Debug, Clone, Default)]
pub struct BulkReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<(String, String)>,
}

/// The track aggregation and enrichment engine.
///
/// Owns the aggregated collection, the selection set and the view spec
/// exclusively. Callers issue intents (load, merge, toggle) and read derived
/// views; nothing outside the engine mutates its state. All mutations happen
/// synchronously between await points, so no interleaving observes a
/// half-updated collection.
pub struct TrackEngine<C: CatalogProvider, T: TempoProvider> {
    catalog: C,
    tempo: T,
    tracks: Vec<Track>,
    selection: SelectionSet,
    view: ViewSpec,
    phase: LoadPhase,
    generation: u64,
    enrich_batch_size: usize,
    enrich_pace: Duration,
}

impl<C: CatalogProvider, T: TempoProvider> TrackEngine<C, T> {
    pub fn new(catalog: C, tempo: T) -> Self {
        Self {
            catalog,
            tempo,
            tracks: Vec::new(),
            selection: SelectionSet::new(),
            view: ViewSpec::default(),
            phase: LoadPhase::Empty,
            generation: 0,
            enrich_batch_size: ENRICH_BATCH_SIZE,
            enrich_pace: ENRICH_PACE,
        }
    }

    /// Tune enrichment batching, mainly for tests and provider quirks
    #[must_use]
    pub fn with_enrichment_pacing(mut self, batch_size: usize, pace: Duration) -> Self {
        self.enrich_batch_size = batch_size;
        self.enrich_pace = pace;
        self
    }

    #[must_use]
    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Start a load, superseding any in-flight one
    pub fn begin_load(&mut self) -> LoadGeneration {
        self.generation += 1;
        self.phase = LoadPhase::Loading;
        LoadGeneration(self.generation)
    }

    /// Commit a finished load. Returns false (and changes nothing) when a
    /// newer load has started since `generation` was handed out.
    pub fn commit_load(&mut self, generation: LoadGeneration, tracks: Vec<Track>) -> bool {
        if generation.0 != self.generation {
            warn!("Discarding stale load result (generation {})", generation.0);
            return false;
        }
        self.tracks = tracks;
        self.selection.retain_present(&self.tracks);
        self.phase = if self.tracks.is_empty() {
            LoadPhase::Empty
        } else {
            LoadPhase::Ready
        };
        true
    }

    /// Replace the collection with tracks fetched from the given sources.
    ///
    /// Sources are fetched concurrently; the aggregator recomputes dedup over
    /// the full merged set, so completion order never affects the result.
    /// A failed fetch surfaces without mutating prior state. Enrichment
    /// failure is never fatal; it degrades to missing tempo data on the
    /// report.
    pub async fn load(&mut self, sources: &[SourceSelection]) -> Result<LoadReport> {
        if sources.is_empty() {
            self.generation += 1;
            self.tracks.clear();
            self.selection.clear();
            self.phase = LoadPhase::Empty;
            return Ok(LoadReport::default());
        }

        let generation = self.begin_load();
        info!("Loading tracks from {} source(s)", sources.len());

        let fetched = match self.fetch_sources(sources).await {
            Ok(batches) => batches,
            Err(e) => {
                self.phase = LoadPhase::Error(e.to_string());
                return Err(e);
            }
        };

        let mut tracks = dedup_fresh(fetched.into_iter().flatten().collect());
        let enrichment = self.enrich(&mut tracks).await;

        let report = LoadReport {
            total: tracks.len(),
            duplicates: tracks.iter().filter(|t| t.is_duplicate).count(),
            enrichment,
        };

        if !self.commit_load(generation, tracks) {
            return Ok(report);
        }

        info!(
            "Loaded {} tracks ({} duplicates, {} with tempo)",
            report.total, report.duplicates, report.enrichment.resolved
        );
        Ok(report)
    }

    async fn fetch_sources(&self, sources: &[SourceSelection]) -> Result<Vec<Vec<Track>>> {
        let fetches = sources.iter().map(|source| async move {
            match source {
                SourceSelection::Playlist { id, name } => {
                    let mut tracks = self.catalog.playlist_tracks(id).await?;
                    for track in &mut tracks {
                        track.source_id = id.clone();
                        track.source_label = name.clone();
                    }
                    Ok(tracks)
                }
                SourceSelection::SavedAlbums => self.catalog.saved_album_tracks().await,
            }
        });

        join_all(fetches).await.into_iter().collect()
    }

    async fn enrich(&self, tracks: &mut [Track]) -> EnrichmentSummary {
        BatchEnricher::with_pacing(&self.tempo, self.enrich_batch_size, self.enrich_pace)
            .enrich(tracks)
            .await
    }

    /// Merge search-result tracks into the collection, auto-selecting the
    /// newly added copies while leaving prior selections untouched
    pub async fn merge_search_results(&mut self, mut tracks: Vec<Track>) -> Result<LoadReport> {
        for track in &mut tracks {
            if track.source_id.is_empty() {
                track.source_id = "search".to_string();
                track.source_label = "Search results".to_string();
            }
        }
        self.merge_tracks(tracks).await
    }

    /// Fetch the given albums' tracks and merge them in
    pub async fn merge_album_tracks(&mut self, album_ids: &[String]) -> Result<LoadReport> {
        self.phase = LoadPhase::Merging;
        let tracks = match self.catalog.album_tracks(album_ids).await {
            Ok(tracks) => tracks,
            Err(e) => {
                self.phase = LoadPhase::Error(e.to_string());
                return Err(e);
            }
        };
        self.merge_tracks(tracks).await
    }

    async fn merge_tracks(&mut self, incoming: Vec<Track>) -> Result<LoadReport> {
        self.phase = LoadPhase::Merging;
        let before = self.tracks.len();
        let appended = merge_incremental(&mut self.tracks, incoming);

        let enrichment = {
            let new_tracks = &mut self.tracks[before..];
            BatchEnricher::with_pacing(&self.tempo, self.enrich_batch_size, self.enrich_pace)
                .enrich(new_tracks)
                .await
        };

        self.selection.extend(&appended, &self.tracks);
        self.phase = LoadPhase::Ready;

        Ok(LoadReport {
            total: self.tracks.len(),
            duplicates: self.tracks.iter().filter(|t| t.is_duplicate).count(),
            enrichment,
        })
    }

    /// Clear the collection and selection entirely
    pub fn clear(&mut self) {
        self.generation += 1;
        self.tracks.clear();
        self.selection.clear();
        self.phase = LoadPhase::Empty;
    }

    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.view.filters = filters;
    }

    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) {
        self.view.sort_by = key;
        self.view.order = order;
    }

    #[must_use]
    pub fn view_spec(&self) -> &ViewSpec {
        &self.view
    }

    /// The current filtered, sorted projection. Pure and recomputed on
    /// every call.
    #[must_use]
    pub fn filtered_tracks(&self) -> Vec<&Track> {
        filtered_sorted(&self.tracks, &self.view)
    }

    pub fn toggle_track_selection(&mut self, id: &str) {
        self.selection.toggle(id, &self.tracks);
    }

    /// Select everything visible through the current filters
    pub fn select_all_filtered(&mut self) {
        let view = filtered_sorted(&self.tracks, &self.view);
        self.selection.select_view(&view);
    }

    pub fn clear_track_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_album_tracks(&mut self, album_id: &str) {
        self.selection.select_album(album_id, &self.tracks);
    }

    pub fn deselect_album_tracks(&mut self, album_id: &str) {
        self.selection.deselect_album(album_id, &self.tracks);
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    /// Selected tracks in collection order
    #[must_use]
    pub fn selected_tracks(&self) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|t| self.selection.contains(&t.id))
            .collect()
    }

    /// Export the selection as a new playlist, adding track references in
    /// provider-sized chunks. Returns the new playlist's id.
    pub async fn export_selection_as_new_playlist(
        &self,
        name: &str,
        description: Option<&str>,
        public: bool,
    ) -> Result<String> {
        let uris: Vec<String> = self
            .selected_tracks()
            .iter()
            .map(|t| t.uri.clone())
            .collect();
        if uris.is_empty() {
            return Err(EngineError::NothingSelected);
        }

        let playlist_id = self.catalog.create_playlist(name, description, public).await?;
        for chunk in uris.chunks(EXPORT_CHUNK_SIZE) {
            self.catalog.add_tracks(&playlist_id, chunk).await?;
        }

        info!(
            "Exported {} tracks to new playlist '{name}' ({playlist_id})",
            uris.len()
        );
        Ok(playlist_id)
    }

    /// Update privacy across many playlists: non-owned playlists are
    /// skipped, the rest settle individually and are reported together.
    pub async fn set_playlists_privacy(
        &self,
        playlist_ids: &[String],
        public: bool,
    ) -> Result<BulkReport> {
        let user_id = self.catalog.current_user_id().await?;

        let ownership = join_all(
            playlist_ids
                .iter()
                .map(|id| async move { (id, self.catalog.playlist_owner(id).await) }),
        )
        .await;

        let mut report = BulkReport::default();
        let mut owned = Vec::new();
        for (id, owner) in ownership {
            match owner {
                Ok(owner_id) if owner_id == user_id => owned.push(id.clone()),
                Ok(_) => report.skipped += 1,
                Err(e) => report.failed.push((id.clone(), e.to_string())),
            }
        }

        let results = join_all(owned.iter().map(|id| async move {
            (id, self.catalog.set_playlist_privacy(id, public).await)
        }))
        .await;

        for (id, outcome) in results {
            match outcome {
                Ok(()) => report.succeeded += 1,
                // The provider enforces ownership too; treat its refusal as
                // the same skip as our pre-check
                Err(EngineError::Provider { status: 403, .. }) => report.skipped += 1,
                Err(e) => report.failed.push((id.clone(), e.to_string())),
            }
        }

        if report.skipped > 0 {
            warn!(
                "Skipped {} playlist(s) not owned by the current user",
                report.skipped
            );
        }
        Ok(report)
    }

    /// Delete (unfollow) many playlists with the same settle-all pattern
    pub async fn delete_playlists(&self, playlist_ids: &[String]) -> Result<BulkReport> {
        let results = join_all(playlist_ids.iter().map(|id| async move {
            (id, self.catalog.unfollow_playlist(id).await)
        }))
        .await;

        let mut report = BulkReport::default();
        for (id, outcome) in results {
            match outcome {
                Ok(()) => report.succeeded += 1,
                Err(e) => report.failed.push((id.clone(), e.to_string())),
            }
        }
        Ok(report)
    }
}
