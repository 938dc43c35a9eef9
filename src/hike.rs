//! Trail records and the per-slug file store.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::geo::{valid_coords, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Coastal,
    Waterfalls,
    Lakes,
    Ridges,
    Woodland,
    Moorland,
    Mountains,
    Riverside,
    History,
    Wildlife,
}

/// Start point; the only coordinate used for proximity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Start {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_postcode: Option<String>,
}

/// Where the route geometry came from, e.g. `{"system": "osm", "id": "relation/123"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub system: String,
    pub id: String,
}

/// Generated copy attached after normalization. Every field is optional so
/// older payloads keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiEnrichment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub safety_notes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gear: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hike {
    pub slug: String,
    pub name: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub distance_km: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ascent_m: Option<f64>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub themes: Vec<Theme>,
    pub start: Start,
    pub source: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiEnrichment>,
}

impl Hike {
    /// Start point, if this record is fit for proximity search.
    pub fn search_point(&self) -> Option<GeoPoint> {
        let distance_ok = self.distance_km.is_finite() && self.distance_km >= 0.0;
        (distance_ok && valid_coords(self.start.lat, self.start.lon))
            .then(|| GeoPoint::new(self.start.lat, self.start.lon))
    }

    pub fn with_ai(&self, ai: AiEnrichment) -> Hike {
        Hike {
            ai: Some(ai),
            ..self.clone()
        }
    }

    pub fn with_nearest_postcode(&self, code: impl Into<String>) -> Hike {
        Hike {
            start: Start {
                nearest_postcode: Some(code.into()),
                ..self.start.clone()
            },
            ..self.clone()
        }
    }
}

/// URL-safe slug: lowercase ASCII letters, digits and hyphens.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Loaded corpus plus the number of files that could not be used.
#[derive(Debug, Default)]
pub struct Corpus {
    pub hikes: Vec<Hike>,
    pub malformed: usize,
}

pub struct HikeStore {
    dir: PathBuf,
}

impl HikeStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, slug: &str) -> Result<PathBuf> {
        if !is_valid_slug(slug) {
            return Err(Error::InvalidInput(format!("slug '{slug}'")));
        }
        Ok(self.dir.join(format!("{slug}.json")))
    }

    pub fn load(&self, slug: &str) -> Result<Hike> {
        let path = self.path_for(slug)?;
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(format!("hike '{slug}'")),
            _ => Error::Io(e),
        })?;
        serde_json::from_str(&content).map_err(|e| Error::MalformedRecord {
            id: slug.to_string(),
            reason: e.to_string(),
        })
    }

    /// Every `*.json` file, in file-name order so corpus order is stable.
    ///
    /// A file only counts when its stem equals a valid slug, so `save` always
    /// writes back to the file the hike came from.
    pub fn load_all(&self) -> Result<Corpus> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            Error::NoData(format!("hikes directory {}: {e}", self.dir.display()))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut corpus = Corpus::default();
        for path in paths {
            match read_hike(&path) {
                Ok(hike) => corpus.hikes.push(hike),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping hike file");
                    corpus.malformed += 1;
                }
            }
        }

        info!(
            dir = %self.dir.display(),
            loaded = corpus.hikes.len(),
            malformed = corpus.malformed,
            "hike corpus loaded"
        );
        Ok(corpus)
    }

    pub fn save(&self, hike: &Hike) -> Result<PathBuf> {
        let path = self.path_for(&hike.slug)?;
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(hike)?;
        fs::write(&path, json)?;
        debug!(slug = %hike.slug, "hike saved");
        Ok(path)
    }
}

fn read_hike(path: &Path) -> Result<Hike> {
    let content = fs::read_to_string(path)?;
    let hike: Hike = serde_json::from_str(&content)?;
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if !is_valid_slug(&hike.slug) {
        return Err(Error::MalformedRecord {
            id: stem.to_string(),
            reason: format!("invalid slug '{}'", hike.slug),
        });
    }
    if stem != hike.slug {
        return Err(Error::MalformedRecord {
            id: stem.to_string(),
            reason: format!("slug '{}' does not match file name", hike.slug),
        });
    }
    Ok(hike)
}
