pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod selection;
pub mod tempo;
pub mod view;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "playlist-weaver")]
#[command(about = "Aggregate, enrich and re-weave playlists from many track sources")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Catalog provider access token
    #[arg(long)]
    pub access_token: Option<String>,

    /// BPM provider API key
    #[arg(long)]
    pub bpm_api_key: Option<String>,

    /// Path to the tempo cache file
    #[arg(long)]
    pub cache_file: Option<String>,

    /// Tempo lookups issued concurrently per batch
    #[arg(long)]
    pub enrich_batch_size: Option<usize>,

    /// Milliseconds to pause between enrichment batches
    #[arg(long)]
    pub enrich_pace_ms: Option<u64>,
}
