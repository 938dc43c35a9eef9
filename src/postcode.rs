//! Postcode normalization and the per-code record.
//!
//! Canonical form: uppercase, whitespace stripped, one space before the
//! last three characters (the inward code).

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

const INWARD_LEN: usize = 3;

/// Canonicalize free-text input. Never fails; garbage in, garbage out.
pub fn normalize(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect();

    let len = compact.chars().count();
    if len <= INWARD_LEN {
        return compact;
    }

    let split = compact
        .char_indices()
        .nth(len - INWARD_LEN)
        .map(|(i, _)| i)
        .unwrap_or(compact.len());
    format!("{} {}", &compact[..split], &compact[split..])
}

/// On-disk key for a canonical code ("S66 7RR" -> "S66-7RR").
pub fn storage_key(canonical: &str) -> String {
    canonical.replace(' ', "-")
}

/// Only plain alphanumeric codes map onto a file name.
pub fn is_plausible(canonical: &str) -> bool {
    !canonical.is_empty()
        && canonical
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ')
}

/// Area, district and sector derived from a canonical code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeParts {
    pub area: String,
    pub district: String,
    pub sector: String,
}

pub fn code_parts(canonical: &str) -> CodeParts {
    match canonical.split_once(' ') {
        Some((outward, inward)) => {
            let area: String = outward
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect();
            let sector = match inward.chars().next() {
                Some(first) => format!("{outward} {first}"),
                None => outward.to_string(),
            };
            CodeParts {
                area,
                district: outward.to_string(),
                sector,
            }
        }
        None => CodeParts {
            area: canonical
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect(),
            district: canonical.to_string(),
            sector: canonical.to_string(),
        },
    }
}

fn default_in_use() -> bool {
    true
}

/// One geocoded postcode, stored as `<key>.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostcodeRecord {
    pub code: String,
    pub area: String,
    pub district: String,
    pub sector: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easting: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub northing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsoa_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msoa_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itl2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itl3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default = "default_in_use")]
    pub in_use: bool,
}

impl PostcodeRecord {
    /// Minimal in-use record with derived parts; admin fields left empty.
    pub fn new(code: &str, latitude: f64, longitude: f64) -> Self {
        let code = normalize(code);
        let parts = code_parts(&code);
        Self {
            code,
            area: parts.area,
            district: parts.district,
            sector: parts.sector,
            latitude,
            longitude,
            easting: None,
            northing: None,
            grid_ref: None,
            district_code: None,
            ward_code: None,
            lsoa_code: None,
            msoa_code: None,
            itl2: None,
            itl3: None,
            country: None,
            in_use: true,
        }
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn key(&self) -> String {
        storage_key(&self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_and_spacing_do_not_matter() {
        for raw in ["s66  7rr", "S667RR", "S66 7RR", "  s 6 6 7 r r\t"] {
            assert_eq!(normalize(raw), "S66 7RR", "input {raw:?}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("ec1a1bb");
        assert_eq!(once, "EC1A 1BB");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn short_and_empty_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t"), "");
        assert_eq!(normalize("ab"), "AB");
        assert_eq!(normalize("s66"), "S66");
        assert_eq!(normalize("s667"), "S 667");
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        let out = normalize("é1aßz");
        assert!(out.contains(' '));
        assert!(!is_plausible(&out));
    }

    #[test]
    fn derives_parts() {
        let parts = code_parts("S66 7RR");
        assert_eq!(parts.area, "S");
        assert_eq!(parts.district, "S66");
        assert_eq!(parts.sector, "S66 7");

        let parts = code_parts("EC1A 1BB");
        assert_eq!(parts.area, "EC");
        assert_eq!(parts.district, "EC1A");
        assert_eq!(parts.sector, "EC1A 1");
    }

    #[test]
    fn storage_key_uses_hyphen() {
        assert_eq!(storage_key("S66 7RR"), "S66-7RR");
        assert!(is_plausible("S66 7RR"));
        assert!(!is_plausible("../ETC"));
        assert!(!is_plausible(""));
    }

    #[test]
    fn missing_in_use_defaults_true() {
        let json = r#"{"code":"S66 7RR","area":"S","district":"S66","sector":"S66 7",
            "latitude":53.481,"longitude":-1.135}"#;
        let rec: PostcodeRecord = serde_json::from_str(json).unwrap();
        assert!(rec.in_use);
        assert_eq!(rec.key(), "S66-7RR");
        assert!(rec.country.is_none());
    }
}
