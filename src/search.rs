//! Proximity search: radius filter, distance sort, top-N.
//!
//! Candidates without a valid point are skipped, never fatal. Ties keep
//! corpus order (the sort is stable), so output depends only on distance and
//! input position.

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{haversine_km, round2, GeoPoint};
use crate::hike::Hike;
use crate::postcode::PostcodeRecord;
use crate::postcodedb::PostcodeLookup;

/// Anything that can be ranked by distance.
pub trait Candidate {
    /// Stable identity, used to exclude the reference record.
    fn id(&self) -> &str;
    /// `None` when the record has no usable coordinates.
    fn point(&self) -> Option<GeoPoint>;
}

impl Candidate for Hike {
    fn id(&self) -> &str {
        &self.slug
    }

    fn point(&self) -> Option<GeoPoint> {
        self.search_point()
    }
}

/// Validated radius and result cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    max_distance_km: f64,
    limit: usize,
}

impl SearchParams {
    pub fn new(max_distance_km: f64, limit: usize) -> Result<Self> {
        if !max_distance_km.is_finite() || max_distance_km <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "maxDistanceKm must be a positive number, got {max_distance_km}"
            )));
        }
        if limit == 0 {
            return Err(Error::InvalidInput("limit must be positive".to_string()));
        }
        Ok(Self {
            max_distance_km,
            limit,
        })
    }

    /// Parse raw query-string values; absent values take `defaults`.
    pub fn from_query(
        radius: Option<&str>,
        limit: Option<&str>,
        defaults: &SearchParams,
    ) -> Result<Self> {
        let max_distance_km = match radius.map(str::trim) {
            Some(raw) => raw
                .parse::<f64>()
                .map_err(|_| Error::InvalidInput(format!("maxDistanceKm '{raw}' is not a number")))?,
            None => defaults.max_distance_km,
        };
        let limit = match limit.map(str::trim) {
            Some(raw) => {
                let n = raw
                    .parse::<i64>()
                    .map_err(|_| Error::InvalidInput(format!("limit '{raw}' is not a number")))?;
                usize::try_from(n)
                    .map_err(|_| Error::InvalidInput(format!("limit must be positive, got {n}")))?
            }
            None => defaults.limit,
        };
        Self::new(max_distance_km, limit)
    }

    pub fn max_distance_km(&self) -> f64 {
        self.max_distance_km
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

/// A candidate with its distance from the reference, rounded to 0.01 km.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranked<'a, C> {
    pub distance_km: f64,
    pub candidate: &'a C,
}

pub fn search<'a, C: Candidate>(
    reference: GeoPoint,
    candidates: &'a [C],
    params: &SearchParams,
    exclude_id: Option<&str>,
) -> Result<Vec<Ranked<'a, C>>> {
    if candidates.is_empty() {
        return Err(Error::NoData("candidate corpus is empty".to_string()));
    }
    if !reference.is_valid() {
        return Err(Error::NotFound(format!(
            "reference point {},{}",
            reference.lat, reference.lon
        )));
    }

    let mut skipped = 0usize;
    let mut hits: Vec<(f64, &'a C)> = Vec::new();
    for candidate in candidates {
        if exclude_id.is_some_and(|id| candidate.id() == id) {
            continue;
        }
        let Some(point) = candidate.point() else {
            skipped += 1;
            continue;
        };
        let d = haversine_km(reference, point);
        if d <= params.max_distance_km {
            hits.push((d, candidate));
        }
    }

    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits.truncate(params.limit);

    if skipped > 0 {
        debug!(skipped, "candidates without valid coordinates excluded");
    }
    debug!(
        matched = hits.len(),
        radius_km = params.max_distance_km,
        "proximity search done"
    );

    Ok(hits
        .into_iter()
        .map(|(d, candidate)| Ranked {
            distance_km: round2(d),
            candidate,
        })
        .collect())
}

/// Hikes near a geocoded postcode.
#[derive(Debug, Serialize)]
pub struct NearPostcode<'a> {
    pub postcode: PostcodeRecord,
    pub results: Vec<Ranked<'a, Hike>>,
}

pub fn hikes_near_postcode<'a>(
    db: &impl PostcodeLookup,
    raw_code: &str,
    hikes: &'a [Hike],
    params: &SearchParams,
) -> Result<NearPostcode<'a>> {
    if hikes.is_empty() {
        return Err(Error::NoData("no hikes loaded".to_string()));
    }
    let postcode = db.resolve(raw_code)?;
    let results = search(postcode.point(), hikes, params, None)?;
    Ok(NearPostcode { postcode, results })
}

/// Hikes near another hike's start, never including that hike.
pub fn nearby_hikes<'a>(
    slug: &str,
    hikes: &'a [Hike],
    params: &SearchParams,
) -> Result<Vec<Ranked<'a, Hike>>> {
    if hikes.is_empty() {
        return Err(Error::NoData("no hikes loaded".to_string()));
    }
    let reference = hikes
        .iter()
        .find(|h| h.slug == slug)
        .ok_or_else(|| Error::NotFound(format!("hike '{slug}'")))?;
    let point = reference
        .search_point()
        .ok_or_else(|| Error::NotFound(format!("hike '{slug}' has no usable start point")))?;
    search(point, hikes, params, Some(slug))
}
