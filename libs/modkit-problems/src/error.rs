//! Internal error taxonomy for the wire codecs and configuration loading.
//!
//! Codec errors never leave the crate as-is: every public operation converts
//! them with [`Problem::from_error`](crate::Problem::from_error) so callers
//! only ever see a `Problem`. The original error stays reachable through
//! `std::error::Error::source`.

/// Failures raised while encoding or decoding a problem document.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("malformed JSON problem document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed XML problem document: {0}")]
    Xml(#[from] quick_xml::Error),


    #[error("failed to write problem document: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML element name is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("XML problem document has no root element")]
    MissingRoot,

    #[error("'{0}' cannot be used as an XML element name")]
    InvalidElementName(String),

    #[error("XML element '{0}' is not closed")]
    UnclosedElement(String),

    #[error("problem document must be an object")]
    NotAnObject,

    #[error("status '{0}' is not a valid integer status code")]
    InvalidStatus(String),

    #[error("{0} is an invalid type")]
    UnsupportedFormat(String),
}

/// Failures raised while loading [`ProblemsConfig`](crate::config::ProblemsConfig).
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid problems configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Invalid(Box::new(err))
    }
}
