use std::collections::HashSet;

use crate::model::Track;

/// The set of track ids marked for export.
///
/// Invariant: every id in the set refers to a track currently present in
/// the aggregated collection. Insertions validate membership and collection
/// replacements prune the set in the same logical step.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: HashSet<String>,
}

impl SelectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Toggle one id. A no-op for ids absent from the collection.
    pub fn toggle(&mut self, id: &str, collection: &[Track]) {
        if self.ids.remove(id) {
            return;
        }
        if collection.iter().any(|t| t.id == id) {
            self.ids.insert(id.to_string());
        }
    }

    /// Select every track in a derived view (respects the view's filters,
    /// not the whole collection)
    pub fn select_view(&mut self, view: &[&Track]) {
        self.ids.extend(view.iter().map(|t| t.id.clone()));
    }

    /// Bulk-add ids, e.g. to auto-select freshly merged tracks. Prior
    /// selections stay untouched; ids absent from the collection are
    /// ignored.
    pub fn extend(&mut self, ids: &[String], collection: &[Track]) {
        let present: HashSet<&str> = collection.iter().map(|t| t.id.as_str()).collect();
        self.ids
            .extend(ids.iter().filter(|id| present.contains(id.as_str())).cloned());
    }

    pub fn select_album(&mut self, album_id: &str, collection: &[Track]) {
        self.ids.extend(
            collection
                .iter()
                .filter(|t| t.album.id == album_id)
                .map(|t| t.id.clone()),
        );
    }

    pub fn deselect_album(&mut self, album_id: &str, collection: &[Track]) {
        let album_ids: HashSet<&str> = collection
            .iter()
            .filter(|t| t.album.id == album_id)
            .map(|t| t.id.as_str())
            .collect();
        self.ids.retain(|id| !album_ids.contains(id.as_str()));
    }

    /// Drop ids no longer present. Called whenever the collection changes.
    pub fn retain_present(&mut self, collection: &[Track]) {
        let present: HashSet<&str> = collection.iter().map(|t| t.id.as_str()).collect();
        self.ids.retain(|id| present.contains(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}
