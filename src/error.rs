//! Error taxonomy shared by the geocoder, the search engine and the pipeline.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Unknown postcode, postcode not in use, or unknown trail slug.
    #[error("not found: {0}")]
    NotFound(String),
    /// A caller-supplied parameter was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The candidate corpus is empty or could not be read at all.
    #[error("no data available: {0}")]
    NoData(String),
    /// A single record failed to parse or lacks valid coordinates.
    #[error("malformed record '{id}': {reason}")]
    MalformedRecord { id: String, reason: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// HTTP-equivalent status for a request layer.
    pub fn status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::InvalidInput(_) => 400,
            Error::NoData(_)
            | Error::MalformedRecord { .. }
            | Error::Io(_)
            | Error::Csv(_)
            | Error::Json(_) => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_distinct_statuses() {
        assert_eq!(Error::NotFound("S66 7RR".into()).status(), 404);
        assert_eq!(Error::InvalidInput("limit".into()).status(), 400);
        assert_eq!(Error::NoData("hikes".into()).status(), 500);
        let io = Error::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(io.status(), 500);
        assert!(!io.is_not_found());
    }

    #[test]
    fn malformed_record_is_an_internal_failure() {
        let err = Error::MalformedRecord {
            id: "mam-tor".into(),
            reason: "expected value".into(),
        };
        assert_eq!(err.status(), 500);
    }
}
