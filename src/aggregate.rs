use std::collections::HashSet;

use crate::model::Track;

/// Dedup a freshly-loaded set of tracks over the whole input, in fetch
/// order. The first occurrence of each provider id is the canonical entry;
/// every later occurrence is flagged as a duplicate but retained so counts
/// and positions stay visible. Locally-stored tracks carry no comparable
/// identity and are excluded before dedup runs.
#[must_use]
pub fn dedup_fresh(tracks: Vec<Track>) -> Vec<Track> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(tracks.len());

    for mut track in tracks {
        if track.is_local {
            continue;
        }
        track.is_duplicate = !seen.insert(track.id.clone());
        out.push(track);
    }

    out
}

/// Merge an incoming batch (search results, album tracks) into an existing
/// collection. Incoming tracks whose id already exists are flagged as
/// duplicates and appended rather than replacing the original, preserving
/// the provenance of each copy. Returns the ids of the appended tracks.
pub fn merge_incremental(existing: &mut Vec<Track>, incoming: Vec<Track>) -> Vec<String> {
    let mut present: HashSet<String> = existing.iter().map(|t| t.id.clone()).collect();
    let mut appended = Vec::new();

    for mut track in incoming {
        if track.is_local {
            continue;
        }
        track.is_duplicate = !present.insert(track.id.clone());
        appended.push(track.id.clone());
        existing.push(track);
    }

    appended
}
