//! Postcode database lookup.
//!
//! One JSON file per postcode under the by-code directory, named after the
//! canonical code with its space replaced by a hyphen (`S66-7RR.json`).
//! Absent, unreadable, unparsable and not-in-use records all resolve to
//! the same `NotFound`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::postcode::{is_plausible, normalize, storage_key, PostcodeRecord};

/// Keyed access to postcode records. `resolve` layers normalization and the
/// in-use policy on top of `fetch`.
pub trait PostcodeLookup {
    /// Raw record for a storage key, if one can be read.
    fn fetch(&self, key: &str) -> Option<PostcodeRecord>;

    fn resolve(&self, raw: &str) -> Result<PostcodeRecord> {
        let code = normalize(raw);
        if !is_plausible(&code) {
            return Err(Error::NotFound(raw.trim().to_string()));
        }
        match self.fetch(&storage_key(&code)) {
            Some(record) if record.in_use => Ok(record),
            Some(_) => {
                debug!(%code, "postcode not in use");
                Err(Error::NotFound(code))
            }
            None => Err(Error::NotFound(code)),
        }
    }
}

/// Directory of per-code JSON files.
pub struct PostcodeDb {
    dir: PathBuf,
}

impl PostcodeDb {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl PostcodeLookup for PostcodeDb {
    fn fetch(&self, key: &str) -> Option<PostcodeRecord> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "postcode file unreadable");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "postcode file unparsable");
                None
            }
        }
    }
}

/// In-memory table, keyed the same way as the on-disk layout.
#[derive(Default)]
pub struct MemoryPostcodeDb {
    records: HashMap<String, PostcodeRecord>,
}

impl MemoryPostcodeDb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PostcodeRecord) {
        self.records.insert(record.key(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<PostcodeRecord> for MemoryPostcodeDb {
    fn from_iter<I: IntoIterator<Item = PostcodeRecord>>(iter: I) -> Self {
        let mut db = Self::new();
        for record in iter {
            db.insert(record);
        }
        db
    }
}

impl PostcodeLookup for MemoryPostcodeDb {
    fn fetch(&self, key: &str) -> Option<PostcodeRecord> {
        self.records.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> MemoryPostcodeDb {
        let mut retired = PostcodeRecord::new("S1 1AA", 53.38, -1.47);
        retired.in_use = false;
        [PostcodeRecord::new("S66 7RR", 53.481, -1.135), retired]
            .into_iter()
            .collect()
    }

    #[test]
    fn resolves_messy_input() {
        let rec = db().resolve("  s667rr ").unwrap();
        assert_eq!(rec.code, "S66 7RR");
        assert_eq!(rec.district, "S66");
    }

    #[test]
    fn retired_and_absent_look_the_same() {
        let db = db();
        let retired = db.resolve("S1 1AA").unwrap_err();
        let absent = db.resolve("ZZ9 9ZZ").unwrap_err();
        assert!(retired.is_not_found());
        assert!(absent.is_not_found());
        assert_eq!(retired.status(), absent.status());
    }

    #[test]
    fn empty_and_hostile_input_is_not_found() {
        let db = db();
        assert!(db.resolve("").unwrap_err().is_not_found());
        assert!(db.resolve("../../etc/passwd").unwrap_err().is_not_found());
    }
}
