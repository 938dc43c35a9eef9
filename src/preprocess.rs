//! National postcode table -> per-code and per-district JSON files.
//!
//! The source CSV is streamed row by row. Column order does not matter:
//! the header is mapped case-insensitively, with a few common aliases.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, info};

use crate::district::{self, DistrictIndexEntry, DistrictPostcode};
use crate::error::{Error, Result};
use crate::geo::valid_coords;
use crate::postcode::{code_parts, is_plausible, normalize, PostcodeRecord};

const POSTCODE: &[&str] = &["postcode", "pcds", "pcd"];
const LATITUDE: &[&str] = &["latitude", "lat"];
const LONGITUDE: &[&str] = &["longitude", "long", "lng", "lon"];
const IN_USE: &[&str] = &["in use?", "in use", "in_use", "inuse"];
const EASTING: &[&str] = &["easting"];
const NORTHING: &[&str] = &["northing"];
const GRID_REF: &[&str] = &["grid ref", "grid_ref", "gridref"];
const DISTRICT_CODE: &[&str] = &["district code", "district_code"];
const WARD_CODE: &[&str] = &["ward code", "ward_code"];
const LSOA_CODE: &[&str] = &["lsoa code", "lsoa_code", "lsoa"];
const MSOA_CODE: &[&str] = &["msoa code", "msoa_code", "msoa"];
const ITL2: &[&str] = &["itl level 2", "itl2"];
const ITL3: &[&str] = &["itl level 3", "itl3"];
const COUNTRY: &[&str] = &["country"];

/// Counts reported at the end of a run.
/// `total_rows == written + skipped_no_postcode + skipped_no_coords`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreprocessSummary {
    pub total_rows: u64,
    pub written: u64,
    pub skipped_no_postcode: u64,
    pub skipped_no_coords: u64,
    pub districts: u64,
}

impl PreprocessSummary {
    pub fn is_balanced(&self) -> bool {
        self.total_rows == self.written + self.skipped_no_postcode + self.skipped_no_coords
    }
}

/// Case-insensitive header name -> column index.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, name) in header.iter().enumerate() {
            // first occurrence wins on duplicate names
            index.entry(name.trim().to_lowercase()).or_insert(i);
        }
        Self { index }
    }

    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.index.get(*a).copied())
    }

    fn require(&self, aliases: &[&str]) -> Result<usize> {
        self.find(aliases).ok_or_else(|| {
            Error::InvalidInput(format!("source table has no '{}' column", aliases[0]))
        })
    }
}

struct Layout {
    postcode: usize,
    latitude: usize,
    longitude: usize,
    in_use: Option<usize>,
    easting: Option<usize>,
    northing: Option<usize>,
    grid_ref: Option<usize>,
    district_code: Option<usize>,
    ward_code: Option<usize>,
    lsoa_code: Option<usize>,
    msoa_code: Option<usize>,
    itl2: Option<usize>,
    itl3: Option<usize>,
    country: Option<usize>,
}

impl Layout {
    fn resolve(columns: &Columns) -> Result<Self> {
        Ok(Self {
            postcode: columns.require(POSTCODE)?,
            latitude: columns.require(LATITUDE)?,
            longitude: columns.require(LONGITUDE)?,
            in_use: columns.find(IN_USE),
            easting: columns.find(EASTING),
            northing: columns.find(NORTHING),
            grid_ref: columns.find(GRID_REF),
            district_code: columns.find(DISTRICT_CODE),
            ward_code: columns.find(WARD_CODE),
            lsoa_code: columns.find(LSOA_CODE),
            msoa_code: columns.find(MSOA_CODE),
            itl2: columns.find(ITL2),
            itl3: columns.find(ITL3),
            country: columns.find(COUNTRY),
        })
    }
}

fn cell<'r>(row: &'r StringRecord, idx: Option<usize>) -> Option<&'r str> {
    idx.and_then(|i| row.get(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn opt_f64(row: &StringRecord, idx: Option<usize>) -> Option<f64> {
    cell(row, idx)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn opt_string(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    cell(row, idx).map(str::to_string)
}

/// Explicit yes/no values are honoured; anything else means in use.
pub fn parse_in_use(raw: Option<&str>) -> bool {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("no" | "false" | "0" | "n" | "f") => false,
        _ => true,
    }
}

enum RowOutcome {
    Record(PostcodeRecord),
    NoPostcode,
    NoCoords,
}

fn parse_row(row: &StringRecord, layout: &Layout) -> RowOutcome {
    let code = normalize(cell(row, Some(layout.postcode)).unwrap_or(""));
    if !is_plausible(&code) {
        return RowOutcome::NoPostcode;
    }

    let lat = opt_f64(row, Some(layout.latitude));
    let lon = opt_f64(row, Some(layout.longitude));
    let (latitude, longitude) = match (lat, lon) {
        (Some(lat), Some(lon)) if valid_coords(lat, lon) => (lat, lon),
        _ => return RowOutcome::NoCoords,
    };

    let parts = code_parts(&code);
    RowOutcome::Record(PostcodeRecord {
        code,
        area: parts.area,
        district: parts.district,
        sector: parts.sector,
        latitude,
        longitude,
        easting: opt_f64(row, layout.easting),
        northing: opt_f64(row, layout.northing),
        grid_ref: opt_string(row, layout.grid_ref),
        district_code: opt_string(row, layout.district_code),
        ward_code: opt_string(row, layout.ward_code),
        lsoa_code: opt_string(row, layout.lsoa_code),
        msoa_code: opt_string(row, layout.msoa_code),
        itl2: opt_string(row, layout.itl2),
        itl3: opt_string(row, layout.itl3),
        country: opt_string(row, layout.country),
        in_use: parse_in_use(cell(row, layout.in_use)),
    })
}

/// Run the pipeline over a CSV file on disk.
pub fn run(input: &Path, by_code_dir: &Path, by_district_dir: &Path) -> Result<PreprocessSummary> {
    info!(input = %input.display(), "preprocessing postcode table");
    let file = File::open(input)?;
    run_from_reader(BufReader::new(file), by_code_dir, by_district_dir)
}

pub fn run_from_reader<R: Read>(
    source: R,
    by_code_dir: &Path,
    by_district_dir: &Path,
) -> Result<PreprocessSummary> {
    fs::create_dir_all(by_code_dir)?;
    fs::create_dir_all(by_district_dir)?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(source);
    let layout = Layout::resolve(&Columns::from_header(reader.headers()?))?;

    let mut summary = PreprocessSummary::default();
    let mut districts: BTreeMap<String, Vec<DistrictPostcode>> = BTreeMap::new();
    let mut row = StringRecord::new();

    loop {
        match reader.read_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                summary.total_rows += 1;
                summary.skipped_no_postcode += 1;
                debug!(error = %e, "undecodable row");
                continue;
            }
        }
        summary.total_rows += 1;

        let record = match parse_row(&row, &layout) {
            RowOutcome::Record(r) => r,
            RowOutcome::NoPostcode => {
                summary.skipped_no_postcode += 1;
                continue;
            }
            RowOutcome::NoCoords => {
                summary.skipped_no_coords += 1;
                debug!(postcode = row.get(layout.postcode).unwrap_or(""), "no coordinates");
                continue;
            }
        };

        let path = by_code_dir.join(format!("{}.json", record.key()));
        fs::write(&path, serde_json::to_vec(&record)?)?;
        summary.written += 1;

        districts
            .entry(record.district.clone())
            .or_default()
            .push(DistrictPostcode {
                code: record.code,
                latitude: record.latitude,
                longitude: record.longitude,
                in_use: record.in_use,
            });

        if summary.total_rows % 100_000 == 0 {
            info!(rows = summary.total_rows, written = summary.written, "progress");
        }
    }

    for (district, mut postcodes) in districts {
        postcodes.sort_by(|a, b| a.code.cmp(&b.code));
        let entry = DistrictIndexEntry { district, postcodes };
        let path = district::path_for(by_district_dir, &entry.district);
        fs::write(&path, serde_json::to_vec(&entry)?)?;
        summary.districts += 1;
    }

    info!(
        total_rows = summary.total_rows,
        written = summary.written,
        skipped_no_postcode = summary.skipped_no_postcode,
        skipped_no_coords = summary.skipped_no_coords,
        districts = summary.districts,
        "preprocessing complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_use_policy() {
        for yes in ["Yes", "TRUE", "1", "y", "t"] {
            assert!(parse_in_use(Some(yes)), "{yes}");
        }
        for no in ["No", "false", "0", "N", " f "] {
            assert!(!parse_in_use(Some(no)), "{no}");
        }
        assert!(parse_in_use(None));
        assert!(parse_in_use(Some("")));
    }

    #[test]
    fn header_lookup_ignores_case_and_order() {
        let header = StringRecord::from(vec!["Longitude", " LATITUDE ", "In Use?", "Postcode"]);
        let layout = Layout::resolve(&Columns::from_header(&header)).unwrap();
        assert_eq!(layout.postcode, 3);
        assert_eq!(layout.latitude, 1);
        assert_eq!(layout.longitude, 0);
        assert_eq!(layout.in_use, Some(2));
        assert_eq!(layout.easting, None);
    }

    #[test]
    fn missing_required_column_is_invalid_input() {
        let header = StringRecord::from(vec!["postcode", "latitude"]);
        let err = Layout::resolve(&Columns::from_header(&header)).err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn row_parsing() {
        let header = StringRecord::from(vec!["postcode", "latitude", "longitude", "easting"]);
        let layout = Layout::resolve(&Columns::from_header(&header)).unwrap();

        let row = StringRecord::from(vec!["s66 7rr", "53.481", "-1.135", "abc"]);
        match parse_row(&row, &layout) {
            RowOutcome::Record(r) => {
                assert_eq!(r.code, "S66 7RR");
                assert_eq!(r.sector, "S66 7");
                assert!(r.easting.is_none());
                assert!(r.in_use);
            }
            _ => panic!("expected record"),
        }

        let row = StringRecord::from(vec!["", "53.4", "-1.1", ""]);
        assert!(matches!(parse_row(&row, &layout), RowOutcome::NoPostcode));

        let row = StringRecord::from(vec!["S1 1AA", "99.999999", "0", ""]);
        assert!(matches!(parse_row(&row, &layout), RowOutcome::NoCoords));

        let row = StringRecord::from(vec!["S1 1AA", "n/a", "-1.4", ""]);
        assert!(matches!(parse_row(&row, &layout), RowOutcome::NoCoords));
    }
}
