//! Named errors for the two terminal conditions of a session: the source
//! file could not be loaded, or the dataset spec does not fit its headers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header row")]
    NoHeaders { path: PathBuf },

    #[error("{path} has duplicate column {column:?} after header normalization")]
    DuplicateColumn { path: PathBuf, column: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
    #[error("no column found for {role} (tried {tried:?})")]
    MissingColumn { role: String, tried: Vec<String> },

    #[error("column for {role} is ambiguous, candidates matched {matches:?}")]
    AmbiguousColumn { role: String, matches: Vec<String> },

    #[error("column reference for {role} names neither a column nor candidates")]
    EmptyRef { role: String },

    #[error("filter references unknown column {0:?}")]
    UnknownFilterColumn(String),

    #[error("compare needs exactly two categories, got {0}")]
    BadCompare(usize),

    #[error("coordinate output column {column:?} collides with the {with}")]
    CoordinateColumnClash { column: String, with: String },

    #[error("delimiter must be a single ascii character, got {0:?}")]
    BadDelimiter(String),
}
