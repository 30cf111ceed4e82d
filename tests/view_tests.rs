use playlist_weaver::model::{Album, Artist, TempoResult, Track};
use playlist_weaver::view::{filtered_sorted, Filter, SortKey, SortOrder, ViewSpec};

fn track(id: &str, name: &str, artist: &str, album: &str, bpm: Option<f64>) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![Artist {
            id: format!("artist-{id}"),
            name: artist.to_string(),
        }],
        album: Album {
            id: format!("album-{album}"),
            name: album.to_string(),
            artists: vec![],
            images: vec![],
            total_tracks: 0,
        },
        duration_ms: 180_000,
        explicit: false,
        uri: format!("spotify:track:{id}"),
        is_local: false,
        source_id: "playlist-a".to_string(),
        source_label: "Playlist A".to_string(),
        is_duplicate: false,
        tempo: bpm.map(|bpm| TempoResult {
            bpm,
            confidence: 0.8,
            source: "getsongbpm".to_string(),
            key: None,
            time_signature: None,
        }),
    }
}

#[test]
fn test_text_filter_matches_any_field() {
    let tracks = vec![
        track("t1", "Harvest Moon", "Neil Young", "Harvest Moon", None),
        track("t2", "Heart of Gold", "Neil Young", "Harvest", None),
        track("t3", "Blue Monday", "New Order", "Power Corruption", None),
    ];

    let spec = ViewSpec::default().with_filter(Filter::Text {
        query: "harvest".to_string(),
    });
    let view = filtered_sorted(&tracks, &spec);
    assert_eq!(view.len(), 2);

    // Artist names count too
    let spec = ViewSpec::default().with_filter(Filter::Text {
        query: "NEIL".to_string(),
    });
    assert_eq!(filtered_sorted(&tracks, &spec).len(), 2);

    let spec = ViewSpec::default().with_filter(Filter::Text {
        query: "nothing here".to_string(),
    });
    assert!(filtered_sorted(&tracks, &spec).is_empty());
}

#[test]
fn test_octave_equivalent_tempo_range() {
    let tracks = vec![track("t1", "Fast One", "Artist", "Album", Some(140.0))];

    // 140 is outside [60, 80], but 140/2 = 70 is inside
    let relaxed = ViewSpec::default().with_filter(Filter::TempoRange {
        min: 60.0,
        max: 80.0,
        octave_equivalent: true,
    });
    assert_eq!(filtered_sorted(&tracks, &relaxed).len(), 1);

    let strict = ViewSpec::default().with_filter(Filter::TempoRange {
        min: 60.0,
        max: 80.0,
        octave_equivalent: false,
    });
    assert!(filtered_sorted(&tracks, &strict).is_empty());
}

#[test]
fn test_octave_equivalence_doubles_too() {
    let tracks = vec![track("t1", "Slow One", "Artist", "Album", Some(65.0))];

    let spec = ViewSpec::default().with_filter(Filter::TempoRange {
        min: 120.0,
        max: 140.0,
        octave_equivalent: true,
    });
    // 65 * 2 = 130 falls in range
    assert_eq!(filtered_sorted(&tracks, &spec).len(), 1);
}

#[test]
fn test_tempo_filter_keeps_tracks_without_tempo() {
    let tracks = vec![
        track("t1", "Known", "Artist", "Album", Some(175.0)),
        track("t2", "Unknown", "Artist", "Album", None),
    ];

    let spec = ViewSpec::default().with_filter(Filter::TempoRange {
        min: 100.0,
        max: 120.0,
        octave_equivalent: false,
    });
    let view = filtered_sorted(&tracks, &spec);
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].id, "t2");
}

#[test]
fn test_hide_duplicates_filter() {
    let mut dup = track("t1", "Song", "Artist", "Album", None);
    dup.is_duplicate = true;
    let tracks = vec![track("t1", "Song", "Artist", "Album", None), dup];

    let spec = ViewSpec::default().with_filter(Filter::HideDuplicates);
    assert_eq!(filtered_sorted(&tracks, &spec).len(), 1);

    // Without the filter both copies stay visible
    assert_eq!(filtered_sorted(&tracks, &ViewSpec::default()).len(), 2);
}

#[test]
fn test_sort_by_tempo_missing_sorts_as_zero() {
    let tracks = vec![
        track("t1", "B", "Artist", "Album", Some(120.0)),
        track("t2", "A", "Artist", "Album", None),
        track("t3", "C", "Artist", "Album", Some(90.0)),
    ];

    let spec = ViewSpec::default().sorted_by(SortKey::Tempo, SortOrder::Ascending);
    let view = filtered_sorted(&tracks, &spec);
    let ids: Vec<&str> = view.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t2", "t3", "t1"]);

    let spec = ViewSpec::default().sorted_by(SortKey::Tempo, SortOrder::Descending);
    let view = filtered_sorted(&tracks, &spec);
    let ids: Vec<&str> = view.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t3", "t2"]);
}

#[test]
fn test_sort_text_keys_case_insensitive() {
    let tracks = vec![
        track("t1", "zebra", "Artist", "Album", None),
        track("t2", "Apple", "Artist", "Album", None),
        track("t3", "mango", "Artist", "Album", None),
    ];

    let spec = ViewSpec::default().sorted_by(SortKey::Title, SortOrder::Ascending);
    let ids: Vec<&str> = filtered_sorted(&tracks, &spec)
        .iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(ids, vec!["t2", "t3", "t1"]);
}

#[test]
fn test_view_is_pure_and_idempotent() {
    let tracks = vec![
        track("t1", "Song One", "Artist", "Album", Some(128.0)),
        track("t2", "Song Two", "Artist", "Album", None),
        track("t3", "Another", "Other", "Elsewhere", Some(70.0)),
    ];
    let snapshot = tracks.clone();

    let spec = ViewSpec::default()
        .with_filter(Filter::Text {
            query: "song".to_string(),
        })
        .sorted_by(SortKey::Tempo, SortOrder::Descending);

    let first: Vec<String> = filtered_sorted(&tracks, &spec)
        .iter()
        .map(|t| t.id.clone())
        .collect();
    let second: Vec<String> = filtered_sorted(&tracks, &spec)
        .iter()
        .map(|t| t.id.clone())
        .collect();

    assert_eq!(first, second);
    // The underlying collection is untouched
    assert_eq!(tracks, snapshot);
}

#[test]
fn test_filters_compose() {
    let mut dup = track("t2", "Song Two", "Artist", "Album", Some(70.0));
    dup.is_duplicate = true;
    let tracks = vec![
        track("t1", "Song One", "Artist", "Album", Some(70.0)),
        dup,
        track("t3", "Other", "Artist", "Album", Some(70.0)),
        track("t4", "Song Four", "Artist", "Album", Some(150.0)),
    ];

    let spec = ViewSpec::default()
        .with_filter(Filter::Text {
            query: "song".to_string(),
        })
        .with_filter(Filter::TempoRange {
            min: 60.0,
            max: 80.0,
            octave_equivalent: false,
        })
        .with_filter(Filter::HideDuplicates);

    let view = filtered_sorted(&tracks, &spec);
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].id, "t1");
}
