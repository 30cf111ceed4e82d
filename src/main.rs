use std::time::Duration;

use clap::{Parser, Subcommand};
use config::ConfigError;
use log::info;

use playlist_weaver::cache::TempoCache;
use playlist_weaver::catalog::{CatalogProvider, SpotifyCatalog};
use playlist_weaver::config::WeaverConfig;
use playlist_weaver::engine::TrackEngine;
use playlist_weaver::error::{EngineError, Result, RetryPolicy};
use playlist_weaver::model::{SourceSelection, Track};
use playlist_weaver::tempo::SongBpmClient;
use playlist_weaver::view::{Filter, SortKey, SortOrder};

#[derive(Parser, Debug)]
#[command(name = "playlist-weaver")]
#[command(about = "Aggregate, enrich and re-weave playlists from many track sources")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Catalog provider access token
    #[arg(long)]
    access_token: Option<String>,

    /// BPM provider API key
    #[arg(long)]
    bpm_api_key: Option<String>,

    /// Path to the tempo cache file
    #[arg(long)]
    cache_file: Option<String>,

    /// Tempo lookups issued concurrently per batch
    #[arg(long)]
    enrich_batch_size: Option<usize>,

    /// Milliseconds to pause between enrichment batches
    #[arg(long)]
    enrich_pace_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Filter and sort options shared by the track-producing commands
#[derive(clap::Args, Debug)]
struct ViewArgs {
    /// Free-text filter over title, artists and album
    #[arg(long)]
    query: Option<String>,

    /// Lower bound of the BPM range filter
    #[arg(long)]
    min_bpm: Option<f64>,

    /// Upper bound of the BPM range filter
    #[arg(long)]
    max_bpm: Option<f64>,

    /// Also match tracks whose halved or doubled tempo falls in the range
    #[arg(long)]
    octave: bool,

    /// Hide duplicate copies of the same track
    #[arg(long)]
    hide_duplicates: bool,

    /// Sort key: title, artist, album, tempo or duration
    #[arg(long, default_value = "title")]
    sort_by: String,

    /// Sort descending instead of ascending
    #[arg(long)]
    descending: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the user's playlists
    Playlists,
    /// Load tracks from playlists and/or saved albums and print the
    /// filtered view
    Load {
        /// Playlist ids to load from
        #[arg(short, long)]
        playlist: Vec<String>,

        /// Also load the user's saved albums
        #[arg(long)]
        saved_albums: bool,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Load, filter and export the result as a new playlist
    Export {
        /// Playlist ids to load from
        #[arg(short, long)]
        playlist: Vec<String>,

        /// Also load the user's saved albums
        #[arg(long)]
        saved_albums: bool,

        /// Name for the new playlist
        #[arg(short, long)]
        name: String,

        /// Description for the new playlist
        #[arg(long)]
        description: Option<String>,

        /// Make the new playlist public
        #[arg(long)]
        public: bool,

        #[command(flatten)]
        view: ViewArgs,
    },
    /// Search the catalog for tracks and albums
    Search {
        /// Free-text query
        query: String,
    },
    /// Update privacy on many playlists at once
    SetPrivacy {
        /// Playlist ids to update
        ids: Vec<String>,

        /// Make them public instead of private
        #[arg(long)]
        public: bool,
    },
    /// Unfollow (delete) many playlists at once
    DeletePlaylists {
        /// Playlist ids to remove
        ids: Vec<String>,
    },
    /// Show tempo cache statistics
    CacheStats,
    /// Clear the tempo cache
    CacheClear,
}

fn config_error(e: ConfigError) -> EngineError {
    EngineError::Data(format!("failed to load configuration: {e}"))
}

fn view_filters(view: &ViewArgs) -> Vec<Filter> {
    let mut filters = Vec::new();
    if let Some(query) = &view.query {
        filters.push(Filter::Text {
            query: query.clone(),
        });
    }
    if view.min_bpm.is_some() || view.max_bpm.is_some() {
        filters.push(Filter::TempoRange {
            min: view.min_bpm.unwrap_or(0.0),
            max: view.max_bpm.unwrap_or(f64::MAX),
            octave_equivalent: view.octave,
        });
    }
    if view.hide_duplicates {
        filters.push(Filter::HideDuplicates);
    }
    filters
}

fn sort_key(name: &str) -> SortKey {
    match name {
        "artist" => SortKey::Artist,
        "album" => SortKey::Album,
        "tempo" | "bpm" => SortKey::Tempo,
        "duration" => SortKey::Duration,
        _ => SortKey::Title,
    }
}

async fn resolve_sources(
    catalog: &SpotifyCatalog,
    playlist_ids: &[String],
    saved_albums: bool,
) -> Result<Vec<SourceSelection>> {
    let mut sources = Vec::new();

    if !playlist_ids.is_empty() {
        let playlists = catalog.user_playlists().await?;
        for id in playlist_ids {
            let name = playlists
                .iter()
                .find(|p| &p.id == id)
                .map_or_else(|| id.clone(), |p| p.name.clone());
            sources.push(SourceSelection::Playlist {
                id: id.clone(),
                name,
            });
        }
    }
    if saved_albums {
        sources.push(SourceSelection::SavedAlbums);
    }

    Ok(sources)
}

fn print_tracks(tracks: &[&Track]) {
    println!(
        "{:<40} {:<25} {:<25} {:>7} {:>9}  ",
        "Title", "Artist", "Album", "BPM", "Duration"
    );
    for track in tracks {
        let bpm = track
            .tempo
            .as_ref()
            .map_or_else(|| "-".to_string(), |t| format!("{:.0}", t.bpm));
        let secs = track.duration_ms / 1000;
        let marker = if track.is_duplicate { " (dup)" } else { "" };
        println!(
            "{:<40} {:<25} {:<25} {:>7} {:>6}:{:02}{marker}",
            truncate(&track.name, 40),
            truncate(track.primary_artist(), 25),
            truncate(&track.album.name, 25),
            bpm,
            secs / 60,
            secs % 60,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    let args = Args::parse();

    let lib_args = playlist_weaver::Args {
        config: args.config.clone(),
        access_token: args.access_token.clone(),
        bpm_api_key: args.bpm_api_key.clone(),
        cache_file: args.cache_file.clone(),
        enrich_batch_size: args.enrich_batch_size,
        enrich_pace_ms: args.enrich_pace_ms,
    };
    let config = WeaverConfig::load_from_args(&lib_args).map_err(config_error)?;

    let retry = RetryPolicy::new(
        config.engine.retry_attempts,
        Duration::from_millis(config.engine.retry_backoff_ms),
    );
    let catalog = SpotifyCatalog::with_base_url(
        config.catalog.access_token.clone(),
        config.catalog_base_url(),
    )
    .with_retry_policy(retry);

    let cache = TempoCache::open(&config.storage.cache_file);
    let tempo = SongBpmClient::with_base_url(
        config.tempo.api_key.clone(),
        cache,
        config.tempo_base_url(),
    );

    match &args.command {
        Commands::Playlists => {
            let playlists = catalog.user_playlists().await?;
            for playlist in playlists {
                let privacy = match playlist.public {
                    Some(true) => "public",
                    Some(false) => "private",
                    None => "unknown",
                };
                println!(
                    "{:<24} {:<40} {:>5} tracks  [{privacy}]",
                    playlist.id, playlist.name, playlist.total_tracks
                );
            }
        }
        Commands::Load {
            playlist,
            saved_albums,
            view,
        } => {
            let sources = resolve_sources(&catalog, playlist, *saved_albums).await?;
            let mut engine = TrackEngine::new(catalog, tempo).with_enrichment_pacing(
                config.engine.enrich_batch_size,
                Duration::from_millis(config.engine.enrich_pace_ms),
            );

            let report = engine.load(&sources).await?;
            if report.tempo_degraded() {
                info!("No tempo data available; showing tracks without BPM");
            }

            engine.set_filters(view_filters(view));
            engine.set_sort(
                sort_key(&view.sort_by),
                if view.descending {
                    SortOrder::Descending
                } else {
                    SortOrder::Ascending
                },
            );

            let filtered = engine.filtered_tracks();
            print_tracks(&filtered);
            println!(
                "\n{} of {} tracks shown ({} duplicates in collection)",
                filtered.len(),
                report.total,
                report.duplicates
            );
        }
        Commands::Export {
            playlist,
            saved_albums,
            name,
            description,
            public,
            view,
        } => {
            let sources = resolve_sources(&catalog, playlist, *saved_albums).await?;
            let mut engine = TrackEngine::new(catalog, tempo).with_enrichment_pacing(
                config.engine.enrich_batch_size,
                Duration::from_millis(config.engine.enrich_pace_ms),
            );

            engine.load(&sources).await?;
            engine.set_filters(view_filters(view));
            engine.select_all_filtered();

            let playlist_id = engine
                .export_selection_as_new_playlist(name, description.as_deref(), *public)
                .await?;
            println!(
                "Created playlist '{name}' ({playlist_id}) with {} tracks",
                engine.selected_tracks().len()
            );
        }
        Commands::Search { query } => {
            let results = catalog.search(query).await?;
            let tracks: Vec<&Track> = results.tracks.iter().collect();
            print_tracks(&tracks);
            if !results.albums.is_empty() {
                println!("\nAlbums:");
                for album in &results.albums {
                    let artist = album
                        .artists
                        .first()
                        .map_or("", |a| a.name.as_str());
                    println!(
                        "{:<24} {:<40} {:<25} {:>3} tracks",
                        album.id,
                        truncate(&album.name, 40),
                        truncate(artist, 25),
                        album.total_tracks
                    );
                }
            }
        }
        Commands::SetPrivacy { ids, public } => {
            let engine = TrackEngine::new(catalog, tempo);
            let report = engine.set_playlists_privacy(ids, *public).await?;
            println!(
                "Updated {}, skipped {} (not owned), failed {}",
                report.succeeded,
                report.skipped,
                report.failed.len()
            );
            for (id, message) in &report.failed {
                println!("  {id}: {message}");
            }
        }
        Commands::DeletePlaylists { ids } => {
            let engine = TrackEngine::new(catalog, tempo);
            let report = engine.delete_playlists(ids).await?;
            println!("Deleted {}, failed {}", report.succeeded, report.failed.len());
            for (id, message) in &report.failed {
                println!("  {id}: {message}");
            }
        }
        Commands::CacheStats => {
            let stats = tempo.cache_stats().await;
            println!("Cached tempo lookups: {}", stats.total);
            if let Some(oldest) = stats.oldest_entry {
                println!("Oldest entry: {oldest}");
            }
            if let Some(newest) = stats.newest_entry {
                println!("Newest entry: {newest}");
            }
        }
        Commands::CacheClear => {
            tempo.clear_cache().await;
            println!("Tempo cache cleared");
        }
    }

    Ok(())
}
