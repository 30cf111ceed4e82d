use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::model::Track;

/// An independently-toggleable filter condition.
///
/// Filters are plain data composed by the view engine, never arbitrary
/// callbacks, so a view spec can be inspected, serialized and replayed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Filter {
    /// Case-insensitive substring match across title, every artist name
    /// and the album name; a track matches if ANY field matches
    Text { query: String },
    /// Tempo inside [min, max]. With `octave_equivalent` a track whose
    /// tempo halved or doubled lands in the range also matches: half or
    /// double tempo reads as the same underlying rhythm. Tracks without
    /// tempo data are not excluded by this filter.
    TempoRange {
        min: f64,
        max: f64,
        octave_equivalent: bool,
    },
    /// Hide tracks flagged as duplicates
    HideDuplicates,
}

impl Filter {
    fn matches(&self, track: &Track) -> bool {
        match self {
            Self::Text { query } => {
                let query = query.to_lowercase();
                if query.is_empty() {
                    return true;
                }
                track.name.to_lowercase().contains(&query)
                    || track
                        .artists
                        .iter()
                        .any(|a| a.name.to_lowercase().contains(&query))
                    || track.album.name.to_lowercase().contains(&query)
            }
            Self::TempoRange {
                min,
                max,
                octave_equivalent,
            } => {
                let Some(tempo) = &track.tempo else {
                    return true;
                };
                let bpm = tempo.bpm;
                let in_range = |b: f64| b >= *min && b <= *max;
                in_range(bpm) || (*octave_equivalent && (in_range(bpm / 2.0) || in_range(bpm * 2.0)))
            }
            Self::HideDuplicates => !track.is_duplicate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Title,
    Artist,
    Album,
    Tempo,
    Duration,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Filter and sort parameters for one derived view of the collection
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ViewSpec {
    pub filters: Vec<Filter>,
    pub sort_by: SortKey,
    pub order: SortOrder,
}

impl ViewSpec {
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, key: SortKey, order: SortOrder) -> Self {
        self.sort_by = key;
        self.order = order;
        self
    }
}

fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare(a: &Track, b: &Track, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => text_cmp(&a.name, &b.name),
        SortKey::Artist => text_cmp(a.primary_artist(), b.primary_artist()),
        SortKey::Album => text_cmp(&a.album.name, &b.album.name),
        SortKey::Tempo => {
            // Missing tempo sorts as 0
            let bpm = |t: &Track| t.tempo.as_ref().map_or(0.0, |f| f.bpm);
            bpm(a).total_cmp(&bpm(b))
        }
        SortKey::Duration => a.duration_ms.cmp(&b.duration_ms),
    }
}

/// Derive a filtered, sorted, read-only projection of the collection.
///
/// Pure: recomputed from current state on every call and never mutates the
/// underlying collection. Ties keep the stable order of the input.
#[must_use]
pub fn filtered_sorted<'a>(tracks: &'a [Track], spec: &ViewSpec) -> Vec<&'a Track> {
    let mut view: Vec<&Track> = tracks
        .iter()
        .filter(|track| spec.filters.iter().all(|f| f.matches(track)))
        .collect();

    view.sort_by(|a, b| {
        let ordering = compare(a, b, spec.sort_by);
        match spec.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    view
}
