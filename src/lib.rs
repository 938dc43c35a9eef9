//! trailfinder - postcode geocoding and proximity search over hiking trails.
//!
//! Postcodes are stored one JSON file per code; trails one JSON file per
//! slug. A search geocodes a postcode (or takes a trail's start point),
//! measures great-circle distance to every trail start, and returns the
//! nearest ones within a radius.

pub mod config;
pub mod district;
pub mod error;
pub mod geo;
pub mod hike;
pub mod postcode;
pub mod postcodedb;
pub mod preprocess;
pub mod search;

pub use config::Config;
pub use error::{Error, Result};
pub use geo::{haversine_km, GeoPoint};
pub use hike::{Hike, HikeStore};
pub use postcode::{normalize, PostcodeRecord};
pub use postcodedb::{MemoryPostcodeDb, PostcodeDb, PostcodeLookup};
pub use search::{hikes_near_postcode, nearby_hikes, search, Candidate, Ranked, SearchParams};

/// Mean Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Search defaults
pub const DEFAULT_RADIUS_KM: f64 = 50.0;
pub const DEFAULT_LIMIT: usize = 10;

/// How far a trail start may be from a postcode centroid to be annotated with it
pub const NEAREST_POSTCODE_RADIUS_KM: f64 = 5.0;
