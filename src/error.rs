use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The entity classifier could not be built. Fatal at startup.
    #[error("classifier initialization failed: {0}")]
    ClassifierInit(String),

    #[error("dataset not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("dataset error: {0}")]
    Dataset(String),

    /// A record lacks a required text cell. `row` is 1-based.
    #[error("record #{row} is missing required field `{column}`")]
    MissingField { row: usize, column: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn classifier_init(msg: impl Into<String>) -> Self {
        Error::ClassifierInit(msg.into())
    }

    pub fn dataset(msg: impl Into<String>) -> Self {
        Error::Dataset(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// What the user can do about it, for errors that stop the run.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            Error::ClassifierInit(_) => Some(
                "Pass a valid gazetteer with --gazetteer: a JSON object mapping labels \
                 (PERSON, GPE, LOC, ORG, ...) to lists of names.",
            ),
            Error::SourceNotFound(_) => {
                Some("Check the dataset path. Supported inputs are .csv and .json files.")
            }
            Error::MissingField { .. } => Some(
                "Fill in the missing text, or rerun with --skip-missing to drop such records.",
            ),
            Error::Dataset(_) => Some(
                "Check the column names (--columns, --date-column, --event-column, \
                 --description-column).",
            ),
            _ => None,
        }
    }
}
