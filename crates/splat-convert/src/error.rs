use std::fmt;

use thiserror::Error;

/// Broad category of a [`ConversionError`], for callers that only need to tell
/// a bad input file apart from bad parameters or an empty scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadFile,
    BadParameters,
    EmptyScene,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BadFile => "bad input file",
            Self::BadParameters => "bad parameters",
            Self::EmptyScene => "no splats to convert",
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Malformed ply header: {0}")]
    MalformedHeader(String),

    #[error("Unsupported ply format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing required vertex property `{0}`")]
    MissingProperty(String),

    #[error("Truncated payload: expected {expected} `{element}` records, found {found}")]
    TruncatedPayload {
        element: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value for `{property}` in record {record}")]
    InvalidNumericValue { property: String, record: usize },

    #[error("Scene contains no splats")]
    EmptyScene,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedHeader(_)
            | Self::UnsupportedFormat(_)
            | Self::MissingProperty(_)
            | Self::TruncatedPayload { .. }
            | Self::InvalidNumericValue { .. } => ErrorKind::BadFile,
            Self::EmptyScene => ErrorKind::EmptyScene,
            Self::InvalidParameter(_) => ErrorKind::BadParameters,
        }
    }
}
