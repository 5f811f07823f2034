use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("column '{column}' not found in header of {}", path.display())]
    MissingColumn { column: String, path: PathBuf },

    #[error("malformed row at line {line} of {}: {fields} fields, header has {expected}", path.display())]
    MalformedRow {
        line: u64,
        fields: usize,
        expected: usize,
        path: PathBuf,
    },

    /// Raised only under strict pairing; the default zips to the shorter list.
    #[error("record {record}: {authors} authors but {affiliations} affiliations")]
    MismatchedAffiliations {
        record: usize,
        authors: usize,
        affiliations: usize,
    },

    #[error("no input files matched {0:?}")]
    NoInputFiles(Vec<String>),

    #[error("invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
