//! Configuration and path resolution.
//!
//! INI parser for the [data] and [search] sections. Every component takes
//! its paths and defaults from a `Config` value, never from the environment.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::search::SearchParams;
use crate::{DEFAULT_LIMIT, DEFAULT_RADIUS_KM, NEAREST_POSTCODE_RADIUS_KM};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub postcodes_by_code: PathBuf,
    pub postcodes_by_district: PathBuf,
    pub hikes_dir: PathBuf,
    pub default_radius_km: f64,
    pub default_limit: usize,
    pub nearest_postcode_radius_km: f64,
}

impl Config {
    /// Conventional layout under a single data root.
    pub fn from_data_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            postcodes_by_code: root.join("postcodes").join("by-code"),
            postcodes_by_district: root.join("postcodes").join("by-district"),
            hikes_dir: root.join("hikes"),
            default_radius_km: DEFAULT_RADIUS_KM,
            default_limit: DEFAULT_LIMIT,
            nearest_postcode_radius_km: NEAREST_POSTCODE_RADIUS_KM,
        }
    }

    /// Load from an INI file. Relative paths resolve against the file's
    /// directory; `root` sets the layout before individual overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let base = path.parent().unwrap_or(Path::new("."));
        Ok(Self::parse(&content, base))
    }

    pub fn parse(content: &str, base: &Path) -> Self {
        let mut root: Option<PathBuf> = None;
        let mut by_code: Option<PathBuf> = None;
        let mut by_district: Option<PathBuf> = None;
        let mut hikes: Option<PathBuf> = None;
        let mut radius: Option<f64> = None;
        let mut limit: Option<usize> = None;
        let mut nearest: Option<f64> = None;
        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if trimmed.starts_with('[') {
                section = trimmed.trim_matches(|c| c == '[' || c == ']').to_string();
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let resolve = |v: &str| base.join(v);

            match (section.as_str(), key) {
                ("data", "root") => root = Some(resolve(value)),
                ("data", "postcodes_by_code") => by_code = Some(resolve(value)),
                ("data", "postcodes_by_district") => by_district = Some(resolve(value)),
                ("data", "hikes") => hikes = Some(resolve(value)),
                ("search", "radius_km") => radius = parse_number(key, value),
                ("search", "limit") => limit = parse_number(key, value),
                ("search", "nearest_postcode_radius_km") => nearest = parse_number(key, value),
                _ => {}
            }
        }

        let mut config = Self::from_data_dir(root.unwrap_or_else(|| base.to_path_buf()));
        if let Some(p) = by_code {
            config.postcodes_by_code = p;
        }
        if let Some(p) = by_district {
            config.postcodes_by_district = p;
        }
        if let Some(p) = hikes {
            config.hikes_dir = p;
        }
        if let Some(r) = radius {
            config.default_radius_km = r;
        }
        if let Some(l) = limit {
            config.default_limit = l;
        }
        if let Some(n) = nearest {
            config.nearest_postcode_radius_km = n;
        }
        config
    }

    /// Default search parameters, validated.
    pub fn search_defaults(&self) -> Result<SearchParams> {
        SearchParams::new(self.default_radius_km, self.default_limit)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        warn!(key, value, "ignoring unparsable config value");
    }
    parsed
}
