use playlist_weaver::aggregate::{dedup_fresh, merge_incremental};
use playlist_weaver::model::{Album, Artist, Track};

fn track(id: &str, name: &str, source_id: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![Artist {
            id: format!("artist-{id}"),
            name: "Some Artist".to_string(),
        }],
        album: Album {
            id: "al1".to_string(),
            name: "Some Album".to_string(),
            artists: vec![],
            images: vec![],
            total_tracks: 10,
        },
        duration_ms: 200_000,
        explicit: false,
        uri: format!("spotify:track:{id}"),
        is_local: false,
        source_id: source_id.to_string(),
        source_label: source_id.to_string(),
        is_duplicate: false,
        tempo: None,
    }
}

#[test]
fn test_fresh_load_flags_duplicates_without_dropping() {
    let input = vec![
        track("t1", "Song One", "playlist-a"),
        track("t2", "Song Two", "playlist-a"),
        track("t1", "Song One", "playlist-b"),
        track("t3", "Song Three", "playlist-b"),
        track("t1", "Song One", "playlist-c"),
    ];
    let input_len = input.len();

    let merged = dedup_fresh(input);

    // Nothing silently dropped
    assert_eq!(merged.len(), input_len);

    let t1_copies: Vec<_> = merged.iter().filter(|t| t.id == "t1").collect();
    assert_eq!(t1_copies.len(), 3);
    assert_eq!(t1_copies.iter().filter(|t| !t.is_duplicate).count(), 1);
    // First occurrence in fetch order is the canonical one
    assert!(!t1_copies[0].is_duplicate);
    assert_eq!(t1_copies[0].source_id, "playlist-a");
    assert!(t1_copies[1].is_duplicate);
    assert!(t1_copies[2].is_duplicate);
}

#[test]
fn test_fresh_load_excludes_local_tracks() {
    let mut local = track("", "Home Recording", "playlist-a");
    local.is_local = true;

    let merged = dedup_fresh(vec![local, track("t1", "Song One", "playlist-a")]);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].id, "t1");
}

#[test]
fn test_fresh_load_unique_input_has_no_duplicates() {
    let merged = dedup_fresh(vec![
        track("t1", "Song One", "playlist-a"),
        track("t2", "Song Two", "playlist-a"),
    ]);
    assert!(merged.iter().all(|t| !t.is_duplicate));
}

#[test]
fn test_incremental_merge_flags_against_existing() {
    let mut existing = dedup_fresh(vec![
        track("t1", "Song One", "playlist-a"),
        track("t2", "Song Two", "playlist-a"),
    ]);

    let appended = merge_incremental(
        &mut existing,
        vec![
            track("t2", "Song Two", "search"),
            track("t4", "Song Four", "search"),
        ],
    );

    assert_eq!(existing.len(), 4);
    assert_eq!(appended, vec!["t2".to_string(), "t4".to_string()]);

    // The original copy stays canonical; the incoming one is the duplicate
    let t2_copies: Vec<_> = existing.iter().filter(|t| t.id == "t2").collect();
    assert!(!t2_copies[0].is_duplicate);
    assert_eq!(t2_copies[0].source_id, "playlist-a");
    assert!(t2_copies[1].is_duplicate);
    assert_eq!(t2_copies[1].source_id, "search");

    assert!(!existing.iter().find(|t| t.id == "t4").unwrap().is_duplicate);
}

#[test]
fn test_incremental_merge_flags_repeats_within_incoming() {
    let mut existing = vec![track("t1", "Song One", "playlist-a")];

    merge_incremental(
        &mut existing,
        vec![
            track("t5", "Song Five", "search"),
            track("t5", "Song Five", "search"),
        ],
    );

    let t5_copies: Vec<_> = existing.iter().filter(|t| t.id == "t5").collect();
    assert!(!t5_copies[0].is_duplicate);
    assert!(t5_copies[1].is_duplicate);
}
