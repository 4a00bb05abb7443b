use crate::types::Gender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("No {gender} data sheet for parameter: {parameter}")]
    MissingSheet { parameter: String, gender: Gender },

    #[error("Not a spreadsheet share URL: {0}")]
    SheetUrl(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
