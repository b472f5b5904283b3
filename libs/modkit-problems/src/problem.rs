//! RFC 7807 Problem Details for HTTP APIs (pure data model, no HTTP framework dependencies)

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config;
use crate::error::CodecError;

/// Content type for Problem Details rendered as JSON.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Content type for Problem Details rendered as XML.
pub const APPLICATION_PROBLEM_XML: &str = "application/problem+xml";

/// Problem type used when no specific type has been chosen.
pub const ABOUT_BLANK: &str = "about:blank";

/// Shared, type-erased error kept as the cause of a problem.
pub type Cause = Arc<dyn StdError + Send + Sync + 'static>;

/// The five members defined by RFC 7807. Every other key is an extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Type,
    Title,
    Status,
    Detail,
    Instance,
}

impl Field {
    /// Case-insensitive lookup of a reserved member name.
    pub(crate) fn parse(key: &str) -> Option<Self> {
        [
            Self::Type,
            Self::Title,
            Self::Status,
            Self::Detail,
            Self::Instance,
        ]
        .into_iter()
        .find(|field| key.eq_ignore_ascii_case(field.wire_name()))
    }

    /// Key used on the wire.
    pub(crate) const fn wire_name(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Title => "title",
            Self::Status => "status",
            Self::Detail => "detail",
            Self::Instance => "instance",
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// The five RFC members are plain fields. Anything else lives in an open set of
/// extension attributes that is merged into the same flat object on the wire.
/// Extensions can only be added through [`Problem::set`] once the problem has
/// a type other than `about:blank`.
#[derive(Clone, Default)]
#[must_use]
pub struct Problem {
    /// A URI reference that identifies the problem type.
    /// Empty means `about:blank`.
    pub type_url: String,
    /// A short, human-readable summary of the problem type.
    /// Empty means the reason phrase of `status`.
    pub title: String,
    /// A human-readable explanation specific to this occurrence of the problem.
    pub detail: String,
    /// A URI reference that identifies the specific occurrence of the problem.
    pub instance: String,
    status: u16,
    attributes: Map<String, Value>,
    cause: Option<Cause>,
}

impl Problem {
    /// Create a new Problem with the given status and detail.
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            ..Self::default()
        }
    }

    /// Create a status 500 problem from an arbitrary error, keeping it as the cause.
    pub fn from_error<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::from_error_with_status(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), err)
    }

    /// Like [`Problem::from_error`] but with an explicit status.
    pub fn from_error_with_status<E>(status: u16, err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let cause: Cause = Arc::from(err.into());
        let mut problem = Self::new(status, cause.to_string());
        problem.cause = Some(cause);
        problem
    }

    /// Turn any error into a problem. A `Problem` is returned unchanged.
    pub fn wrap<E>(err: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        match err.into().downcast::<Self>() {
            Ok(problem) => *problem,
            Err(other) => Self::from_error(other),
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }

    pub fn with_instance(mut self, uri: impl Into<String>) -> Self {
        self.instance = uri.into();
        self
    }

    /// HTTP status code of this occurrence.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// The title, or the standard reason phrase of the status when unset.
    /// Unknown status codes resolve to an empty string.
    #[must_use]
    pub fn title(&self) -> &str {
        if self.title.is_empty() {
            reason_phrase(self.status)
        } else {
            &self.title
        }
    }

    /// The problem type, with the `about:blank` default applied.
    #[must_use]
    pub fn type_url(&self) -> &str {
        if self.type_url.is_empty() {
            ABOUT_BLANK
        } else {
            &self.type_url
        }
    }

    /// True when no specific problem type has been chosen.
    #[must_use]
    pub fn has_default_type(&self) -> bool {
        self.type_url() == ABOUT_BLANK
    }

    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The wrapped underlying error, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// Set a member by name.
    ///
    /// Reserved names (`type`, `title`, `detail`, `instance`, matched
    /// case-insensitively) overwrite the fixed field with the string form of
    /// `value`. Any other name is stored as an extension attribute with the
    /// key kept as given.
    ///
    /// # Errors
    /// Returns a status 500 `Problem` when `key` is `status`, or when `key` is
    /// an extension and the problem type is still `about:blank`. The latter is
    /// also dumped to the debug log.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), Self> {
        let value = value.into();
        match Field::parse(key) {
            Some(Field::Status) => Err(Self::new(
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                "Cannot set status with Set",
            )),
            Some(Field::Type) => {
                self.type_url = value_to_text(&value);
                Ok(())
            }
            Some(Field::Title) => {
                self.title = value_to_text(&value);
                Ok(())
            }
            Some(Field::Detail) => {
                self.detail = value_to_text(&value);
                Ok(())
            }
            Some(Field::Instance) => {
                self.instance = value_to_text(&value);
                Ok(())
            }
            None => {
                if self.has_default_type() {
                    let failure = Self::from_error(self.clone())
                        .with_detail("Cannot set extended attributes unless Type is set");
                    failure.dump();
                    return Err(failure);
                }
                self.attributes.insert(key.to_owned(), value);
                Ok(())
            }
        }
    }

    /// [`Problem::set`] for any serializable value.
    ///
    /// # Errors
    /// Returns a `Problem` if `value` cannot be represented as JSON, or for the
    /// same reasons as [`Problem::set`].
    pub fn set_serialized<T>(&mut self, key: &str, value: &T) -> Result<(), Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(Self::from_error)?;
        self.set(key, value)
    }

    /// Emit the problem on the debug log as JSON.
    pub fn dump(&self) {
        if !config::current().dump_guard_violations {
            return;
        }
        match serde_json::to_string(self) {
            Ok(json) => tracing::debug!(status = self.status, problem = %json, "problem dump"),
            Err(err) => tracing::debug!(error = %err, "problem dump failed"),
        }
    }

    /// Indented JSON form, keys sorted.
    ///
    /// # Errors
    /// Returns a `Problem` if an extension value cannot be encoded.
    pub fn pretty(&self) -> Result<String, Self> {
        serde_json::to_string_pretty(self).map_err(|err| Self::from_error(CodecError::Json(err)))
    }

    /// Build the flat wire mapping without touching `self`.
    ///
    /// Fixed members first, then `error` for typed problems with a cause, then
    /// extensions with lower-cased keys. Extensions win on collision.
    pub(crate) fn flatten(&self) -> Map<String, Value> {
        let type_url = self.type_url();
        let mut out = Map::new();
        out.insert(Field::Type.wire_name().to_owned(), type_url.into());
        out.insert(Field::Title.wire_name().to_owned(), self.title().into());
        out.insert(Field::Status.wire_name().to_owned(), self.status.into());
        out.insert(
            Field::Detail.wire_name().to_owned(),
            self.detail.as_str().into(),
        );
        if !self.instance.is_empty() {
            out.insert(
                Field::Instance.wire_name().to_owned(),
                self.instance.as_str().into(),
            );
        }
        // A Problem cause is emitted through its Display as well, not nested.
        if type_url != ABOUT_BLANK
            && let Some(cause) = &self.cause
        {
            out.insert("error".to_owned(), cause.to_string().into());
        }
        out.extend(wire_attributes(&self.attributes));
        out
    }

    /// Load members from a decoded flat mapping. Extensions bypass the guard.
    ///
    /// Keys absent from `fields` leave the corresponding fixed member untouched;
    /// extension attributes are always replaced.
    pub(crate) fn absorb(&mut self, fields: Map<String, Value>) -> Result<(), CodecError> {
        self.attributes = Map::new();
        for (key, value) in fields {
            match Field::parse(&key) {
                Some(Field::Type) => self.type_url = value_to_text(&value),
                Some(Field::Title) => self.title = value_to_text(&value),
                Some(Field::Status) => self.status = parse_status(&value)?,
                Some(Field::Detail) => self.detail = value_to_text(&value),
                Some(Field::Instance) => self.instance = value_to_text(&value),
                None => {
                    self.attributes.insert(key, value);
                }
            }
        }
        Ok(())
    }

    /// Apply the `about:blank` and title defaults in place.
    pub(crate) fn resolve_defaults(&mut self) {
        if self.type_url.is_empty() {
            ABOUT_BLANK.clone_into(&mut self.type_url);
        }
        if self.title.is_empty() {
            reason_phrase(self.status).clone_into(&mut self.title);
        }
    }
}

/// Standard reason phrase for a status code, empty when unknown.
#[must_use]
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extension attributes keyed the way they appear on the wire.
fn wire_attributes(attributes: &Map<String, Value>) -> Map<String, Value> {
    attributes
        .iter()
        .map(|(key, value)| (key.to_lowercase(), value.clone()))
        .collect()
}

fn parse_status(value: &Value) -> Result<u16, CodecError> {
    let parsed = match value {
        // Whole floats such as `500.0` print without a fraction.
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .or_else(|| n.as_f64().and_then(|f| f.to_string().parse().ok())),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CodecError::InvalidStatus(value_to_text(value)))
}

impl PartialEq for Problem {
    /// Value equality over the RFC members and extensions. Extension keys
    /// compare the way they are written on the wire, so case is ignored. The
    /// cause is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.type_url == other.type_url
            && self.title == other.title
            && self.status == other.status
            && self.detail == other.detail
            && self.instance == other.instance
            && wire_attributes(&self.attributes) == wire_attributes(&other.attributes)
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("type_url", &self.type_url)
            .field("title", &self.title)
            .field("status", &self.status)
            .field("detail", &self.detail)
            .field("instance", &self.instance)
            .field("attributes", &self.attributes)
            .field("cause", &self.cause.as_ref().map(ToString::to_string))
            .finish()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.detail)
    }
}

impl StdError for Problem {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl Serialize for Problem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.flatten().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Problem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let mut problem = Self::default();
        problem.absorb(fields).map_err(D::Error::custom)?;
        Ok(problem)
    }
}
