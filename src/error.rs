use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("Image {path} is {actual:?}, configured dimensions are {expected:?}")]
    DimensionMismatch {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Split '{0}' not found in dataset settings")]
    UnknownSplit(String),
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("Failed to decode VOC document: {0}")]
    XmlDecode(#[from] quick_xml::DeError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
