//! Per-district aggregate index (`<DISTRICT>.json`) and nearest-postcode
//! lookup over it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geo::GeoPoint;
use crate::hike::HikeStore;
use crate::search::{search, Candidate, SearchParams};

fn default_in_use() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictPostcode {
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_in_use")]
    pub in_use: bool,
}

impl Candidate for DistrictPostcode {
    fn id(&self) -> &str {
        &self.code
    }

    /// Retired postcodes never rank.
    fn point(&self) -> Option<GeoPoint> {
        if !self.in_use {
            return None;
        }
        GeoPoint::new(self.latitude, self.longitude).validated()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictIndexEntry {
    pub district: String,
    pub postcodes: Vec<DistrictPostcode>,
}

/// Loaded aggregates and the count of files skipped.
#[derive(Debug, Default)]
pub struct DistrictIndex {
    pub entries: Vec<DistrictIndexEntry>,
    pub malformed: usize,
}

pub fn path_for(dir: &Path, district: &str) -> PathBuf {
    dir.join(format!("{district}.json"))
}

impl DistrictIndex {
    /// One district's aggregate. `district` must already be canonical ("S66").
    pub fn load(dir: &Path, district: &str) -> Result<DistrictIndexEntry> {
        if district.is_empty() || !district.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::NotFound(format!("district '{district}'")));
        }
        let content = fs::read_to_string(path_for(dir, district))
            .map_err(|_| Error::NotFound(format!("district '{district}'")))?;
        serde_json::from_str(&content).map_err(|e| Error::MalformedRecord {
            id: district.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load_all(dir: &Path) -> Result<Self> {
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::NoData(format!("district index {}: {e}", dir.display()))
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut index = DistrictIndex::default();
        for path in paths {
            let parsed = fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|c| serde_json::from_str::<DistrictIndexEntry>(&c).map_err(Error::from));
            match parsed {
                Ok(entry) => index.entries.push(entry),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping district file");
                    index.malformed += 1;
                }
            }
        }
        info!(
            districts = index.entries.len(),
            malformed = index.malformed,
            "district index loaded"
        );
        Ok(index)
    }

    pub fn postcodes(&self) -> impl Iterator<Item = &DistrictPostcode> {
        self.entries.iter().flat_map(|e| e.postcodes.iter())
    }
}

/// Closest indexed postcode to `point` within `max_km`, with its distance.
pub fn nearest_postcode(
    point: GeoPoint,
    postcodes: &[DistrictPostcode],
    max_km: f64,
) -> Result<Option<(DistrictPostcode, f64)>> {
    let params = SearchParams::new(max_km, 1)?;
    let hits = search(point, postcodes, &params, None)?;
    Ok(hits
        .into_iter()
        .next()
        .map(|r| (r.candidate.clone(), r.distance_km)))
}

/// Counts from one annotation pass over the hike corpus.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateSummary {
    pub loaded: usize,
    pub malformed: usize,
    pub annotated: usize,
    pub unmatched: usize,
    pub failed: usize,
}

/// Record the nearest in-use postcode on every hike start in `store`.
///
/// Per-hike problems (no usable start, nothing in range, write failure) are
/// counted; only an unreadable corpus or an empty postcode list aborts.
pub fn annotate(
    store: &HikeStore,
    postcodes: &[DistrictPostcode],
    max_km: f64,
) -> Result<AnnotateSummary> {
    if postcodes.is_empty() {
        return Err(Error::NoData("district index has no postcodes".to_string()));
    }
    let params = SearchParams::new(max_km, 1)?;
    let corpus = store.load_all()?;

    let mut summary = AnnotateSummary {
        loaded: corpus.hikes.len(),
        malformed: corpus.malformed,
        ..AnnotateSummary::default()
    };

    for hike in &corpus.hikes {
        let Some(point) = hike.search_point() else {
            summary.unmatched += 1;
            continue;
        };
        let nearest = search(point, postcodes, &params, None)?.into_iter().next();
        let Some(hit) = nearest else {
            summary.unmatched += 1;
            continue;
        };
        match store.save(&hike.with_nearest_postcode(hit.candidate.code.as_str())) {
            Ok(_) => {
                debug!(slug = %hike.slug, postcode = %hit.candidate.code, km = hit.distance_km, "annotated");
                summary.annotated += 1;
            }
            Err(e) => {
                warn!(slug = %hike.slug, error = %e, "could not save annotated hike");
                summary.failed += 1;
            }
        }
    }

    info!(
        annotated = summary.annotated,
        unmatched = summary.unmatched,
        failed = summary.failed,
        malformed = summary.malformed,
        "annotation complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(code: &str, latitude: f64, longitude: f64) -> DistrictPostcode {
        DistrictPostcode {
            code: code.to_string(),
            latitude,
            longitude,
            in_use: true,
        }
    }

    #[test]
    fn picks_closest_within_radius() {
        let all = vec![
            pc("S66 7RR", 53.481, -1.135),
            pc("S66 8AA", 53.40, -1.10),
            pc("S1 1AA", 53.38, -1.47),
        ];
        let (hit, km) = nearest_postcode(GeoPoint::new(53.482, -1.136), &all, 5.0)
            .unwrap()
            .unwrap();
        assert_eq!(hit.code, "S66 7RR");
        assert!(km < 0.5);

        let none = nearest_postcode(GeoPoint::new(57.0, -4.0), &all, 5.0).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn retired_postcode_is_passed_over() {
        let mut retired = pc("S66 7RR", 53.481, -1.135);
        retired.in_use = false;
        let all = vec![retired, pc("S66 8ZZ", 53.49, -1.14)];
        let (hit, _) = nearest_postcode(GeoPoint::new(53.481, -1.135), &all, 5.0)
            .unwrap()
            .unwrap();
        assert_eq!(hit.code, "S66 8ZZ");
    }

    #[test]
    fn older_index_files_default_to_in_use() {
        let entry: DistrictIndexEntry = serde_json::from_str(
            r#"{"district":"S66","postcodes":[{"code":"S66 7RR","latitude":53.481,"longitude":-1.135}]}"#,
        )
        .unwrap();
        assert!(entry.postcodes[0].in_use);
    }

    #[test]
    fn rejects_odd_district_names() {
        let dir = std::env::temp_dir();
        assert!(DistrictIndex::load(&dir, "../S66").unwrap_err().is_not_found());
        assert!(DistrictIndex::load(&dir, "").unwrap_err().is_not_found());
    }
}
