//! Wire formats and the marshal / unmarshal entry points.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::CodecError;
use crate::problem::{APPLICATION_PROBLEM_JSON, APPLICATION_PROBLEM_XML, Problem};
use crate::xml;

/// Supported encodings of a problem document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Json => APPLICATION_PROBLEM_JSON,
            Self::Xml => APPLICATION_PROBLEM_XML,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Xml => "xml",
        })
    }
}

impl FromStr for Format {
    type Err = Problem;

    /// Accepts `json` / `xml` or the matching problem media types.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("json") || name.eq_ignore_ascii_case(APPLICATION_PROBLEM_JSON)
        {
            Ok(Self::Json)
        } else if name.eq_ignore_ascii_case("xml")
            || name.eq_ignore_ascii_case(APPLICATION_PROBLEM_XML)
        {
            Ok(Self::Xml)
        } else {
            Err(Problem::from_error(CodecError::UnsupportedFormat(
                name.to_owned(),
            )))
        }
    }
}

impl Problem {
    /// Encode the problem as a flat document.
    ///
    /// An empty type becomes `about:blank` and an empty title becomes the
    /// status reason phrase; both are written back to `self`.
    ///
    /// # Errors
    /// Returns a status 500 `Problem` if encoding fails.
    pub fn marshal(&mut self, format: Format) -> Result<Vec<u8>, Problem> {
        self.resolve_defaults();
        let flat = self.flatten();
        let encoded = match format {
            Format::Json => serde_json::to_vec(&flat).map_err(CodecError::from),
            Format::Xml => xml::encode(&flat),
        };
        encoded.map_err(Problem::from_error)
    }

    /// [`Problem::marshal`] with a format name or media type.
    ///
    /// # Errors
    /// Returns a status 500 `Problem` for an unknown format or if encoding fails.
    pub fn marshal_as(&mut self, format: &str) -> Result<Vec<u8>, Problem> {
        let format = format.parse::<Format>()?;
        self.marshal(format)
    }

    /// # Errors
    /// Returns a status 500 `Problem` if an extension value cannot be encoded.
    pub fn to_json(&mut self) -> Result<Vec<u8>, Problem> {
        self.marshal(Format::Json)
    }

    /// # Errors
    /// Returns a status 500 `Problem` if the document cannot be written.
    pub fn to_xml(&mut self) -> Result<Vec<u8>, Problem> {
        self.marshal(Format::Xml)
    }

    /// Load members from an encoded document.
    ///
    /// Extension attributes are replaced wholesale and are not subject to the
    /// type guard. Fixed members missing from the document keep their value.
    ///
    /// # Errors
    /// Returns a status 500 `Problem` wrapping the decode failure when the
    /// document is malformed, is not an object, or carries a non-numeric status.
    pub fn unmarshal(&mut self, format: Format, data: &[u8]) -> Result<(), Problem> {
        let fields = decode(format, data).map_err(Problem::from_error)?;
        self.absorb(fields).map_err(Problem::from_error)
    }

    /// Decode a new problem from an encoded document.
    ///
    /// # Errors
    /// Same as [`Problem::unmarshal`].
    pub fn parse(format: Format, data: &[u8]) -> Result<Self, Problem> {
        let mut problem = Self::default();
        problem.unmarshal(format, data)?;
        Ok(problem)
    }

    /// # Errors
    /// Same as [`Problem::unmarshal`].
    pub fn from_json(data: &[u8]) -> Result<Self, Problem> {
        Self::parse(Format::Json, data)
    }

    /// # Errors
    /// Same as [`Problem::unmarshal`].
    pub fn from_xml(data: &[u8]) -> Result<Self, Problem> {
        Self::parse(Format::Xml, data)
    }
}

fn decode(format: Format, data: &[u8]) -> Result<Map<String, Value>, CodecError> {
    match format {
        Format::Json => match serde_json::from_slice::<Value>(data)? {
            Value::Object(fields) => Ok(fields),
            _ => Err(CodecError::NotAnObject),
        },
        Format::Xml => xml::decode(data),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::problem::ABOUT_BLANK;
    use serde_json::json;

    #[test]
    fn format_parses_names_and_media_types() {
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("XML".parse::<Format>().unwrap(), Format::Xml);
        assert_eq!(
            APPLICATION_PROBLEM_JSON.parse::<Format>().unwrap(),
            Format::Json
        );
        assert_eq!(Format::Xml.media_type(), APPLICATION_PROBLEM_XML);
        assert_eq!(Format::Json.to_string(), "json");
    }

    #[test]
    fn unknown_format_is_a_problem() {
        let err = "yaml".parse::<Format>().unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(err.detail, "yaml is an invalid type");

        let mut p = Problem::new(400, "bad");
        assert!(p.marshal_as("toml").is_err());
    }

    #[test]
    fn marshal_writes_defaults_back() {
        let mut p = Problem::new(404, "gone");
        p.to_json().unwrap();
        assert_eq!(p.type_url, ABOUT_BLANK);
        assert_eq!(p.title, "Not Found");
    }

    #[test]
    fn malformed_json_is_a_problem() {
        let err = Problem::from_json(b"{not json").unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.detail.starts_with("malformed JSON problem document"));
        assert!(err.cause().is_some());
    }

    #[test]
    fn json_array_is_rejected() {
        let err = Problem::from_json(b"[1,2]").unwrap_err();
        assert_eq!(err.detail, "problem document must be an object");
    }

    #[test]
    fn non_numeric_status_is_rejected() {
        let err = Problem::from_json(br#"{"status":"teapot"}"#).unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.detail.contains("teapot"));
    }

    #[test]
    fn unmarshal_resets_extensions_only() {
        let mut p = Problem::new(409, "original").with_type("urn:t");
        p.set("stale", 1).unwrap();
        p.unmarshal(Format::Json, br#"{"fresh":[1,2]}"#).unwrap();
        assert_eq!(p.detail, "original");
        assert_eq!(p.status(), 409);
        assert!(p.attribute("stale").is_none());
        assert_eq!(p.attribute("fresh"), Some(&json!([1, 2])));
    }

    #[test]
    fn unmarshal_skips_guard() {
        let p = Problem::from_json(br#"{"status":400,"traceid":"abc"}"#).unwrap();
        assert!(p.type_url.is_empty());
        assert_eq!(p.attribute("traceid"), Some(&json!("abc")));
    }
}
