use std::fs;

use tempfile::tempdir;

use trailfinder::district::{annotate, DistrictIndex, DistrictPostcode};
use trailfinder::hike::{Difficulty, Provenance, Start, Theme};
use trailfinder::preprocess::run_from_reader;
use trailfinder::{Error, Hike, HikeStore};

const TABLE: &str = "\
Postcode,Latitude,Longitude,In Use?
S66 7RR,53.481,-1.135,No
S66 8ZZ,53.490,-1.140,Yes
S1 1AA,53.380,-1.470,Yes
";

fn hike(slug: &str, lat: f64, lon: f64) -> Hike {
    Hike {
        slug: slug.to_string(),
        name: slug.replace('-', " "),
        region: "South Yorkshire".to_string(),
        country: Some("England".to_string()),
        distance_km: 7.5,
        ascent_m: Some(140.0),
        difficulty: Difficulty::Easy,
        themes: vec![Theme::Woodland, Theme::History],
        start: Start {
            lat,
            lon,
            nearest_postcode: None,
        },
        source: Provenance {
            system: "osm".to_string(),
            id: format!("way/{slug}"),
        },
        ai: None,
    }
}

fn indexed_postcodes(root: &std::path::Path) -> Vec<DistrictPostcode> {
    let by_district = root.join("by-district");
    run_from_reader(TABLE.as_bytes(), &root.join("by-code"), &by_district).unwrap();
    DistrictIndex::load_all(&by_district)
        .unwrap()
        .postcodes()
        .cloned()
        .collect()
}

#[test]
fn annotates_starts_with_the_nearest_live_postcode() {
    let dir = tempdir().unwrap();
    let postcodes = indexed_postcodes(dir.path());
    assert!(postcodes.iter().any(|p| p.code == "S66 7RR" && !p.in_use));

    let store = HikeStore::open(dir.path().join("hikes"));
    // starts exactly on the retired S66 7RR
    store.save(&hike("maltby-crags", 53.481, -1.135)).unwrap();
    store.save(&hike("cairngorm-plateau", 57.1, -3.6)).unwrap();

    let summary = annotate(&store, &postcodes, 5.0).unwrap();
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.annotated, 1);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.failed, 0);

    let saved = store.load("maltby-crags").unwrap();
    assert_eq!(saved.start.nearest_postcode.as_deref(), Some("S66 8ZZ"));
    assert!(store
        .load("cairngorm-plateau")
        .unwrap()
        .start
        .nearest_postcode
        .is_none());

    let raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(store.dir().join("maltby-crags.json")).unwrap())
            .unwrap();
    assert_eq!(raw["start"]["nearestPostcode"], "S66 8ZZ");
}

#[test]
fn unusable_files_are_counted_and_the_run_carries_on() {
    let dir = tempdir().unwrap();
    let postcodes = indexed_postcodes(dir.path());
    let store = HikeStore::open(dir.path().join("hikes"));
    store.save(&hike("roche-abbey", 53.49, -1.14)).unwrap();

    let mut spaced = hike("x", 53.49, -1.14);
    spaced.slug = "Mam Tor".to_string();
    fs::write(
        store.dir().join("mam-tor.json"),
        serde_json::to_string(&spaced).unwrap(),
    )
    .unwrap();
    fs::write(
        store.dir().join("old-name.json"),
        serde_json::to_string(&hike("laughton-woods", 53.38, -1.47)).unwrap(),
    )
    .unwrap();

    let summary = annotate(&store, &postcodes, 5.0).unwrap();
    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.malformed, 2);
    assert_eq!(summary.annotated, 1);

    let files: Vec<_> = fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files.len(), 3, "{files:?}");
    assert!(!store.dir().join("laughton-woods.json").exists());
}

#[test]
fn empty_index_is_no_data() {
    let dir = tempdir().unwrap();
    let store = HikeStore::open(dir.path().join("hikes"));
    store.save(&hike("roche-abbey", 53.49, -1.14)).unwrap();

    let err = annotate(&store, &[], 5.0).unwrap_err();
    assert!(matches!(err, Error::NoData(_)));
}
