//! Input validation problems and the adapter for `validator` errors.
//!
//! Each invalid field becomes one [`Issue`] in the `issues` extension of a
//! `400 badRequest` problem. Turning a `validator` error into readable text is
//! delegated to a [`FieldTranslator`]; [`EnglishTranslator`] is the default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::catalog::{BAD_REQUEST, TYPE_SCHEMA_VIOLATION, TYPE_UNKNOWN_PARAMETER, with_extension};
use crate::config;
use crate::problem::{Problem, value_to_text};

/// One invalid input reported by a caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationParam {
    /// Where the field was found, e.g. `path` or `body`
    pub location: String,
    /// The field name in error
    pub name: String,
    /// The value that was provided
    pub value: Value,
    /// The problem with the field
    pub issue: String,
    /// The parameter is not defined by the API at all
    pub is_unknown: bool,
}

/// Per-field entry of the `issues` extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub type_url: String,
    #[serde(rename = "in", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    pub name: String,
    #[serde(default)]
    pub value: Value,
    pub detail: String,
}

impl Issue {
    /// JSON object form, as embedded in a problem.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut out = Map::new();
        out.insert("type".to_owned(), Value::String(self.type_url));
        if !self.location.is_empty() {
            out.insert("in".to_owned(), Value::String(self.location));
        }
        out.insert("name".to_owned(), Value::String(self.name));
        out.insert("value".to_owned(), self.value);
        out.insert("detail".to_owned(), Value::String(self.detail));
        Value::Object(out)
    }
}

impl From<&ValidationParam> for Issue {
    fn from(param: &ValidationParam) -> Self {
        let type_url = if param.is_unknown {
            TYPE_UNKNOWN_PARAMETER
        } else {
            TYPE_SCHEMA_VIOLATION
        };
        Self {
            type_url: type_url.to_owned(),
            location: param.location.clone(),
            name: param.name.clone(),
            value: param.value.clone(),
            detail: param.issue.clone(),
        }
    }
}

/// 400 `badRequest` with one issue per invalid input.
///
/// With exactly one input its issue text becomes the problem detail.
pub fn input_validation(validations: &[ValidationParam]) -> Problem {
    let mut problem =
        BAD_REQUEST.as_problem("The input message is incorrect; see issues for more information");
    if let [single] = validations {
        problem.detail.clone_from(&single.issue);
    }
    let issues: Vec<Value> = validations
        .iter()
        .map(|param| Issue::from(param).into_value())
        .collect();
    with_extension(problem, "issues", issues)
}

/// Produces the human-readable message for one failed field.
pub trait FieldTranslator {
    fn translate(&self, field: &str, error: &ValidationError) -> String;
}

/// English messages keyed on the `validator` error code.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishTranslator;

impl FieldTranslator for EnglishTranslator {
    fn translate(&self, field: &str, error: &ValidationError) -> String {
        if let Some(message) = &error.message {
            return message.to_string();
        }
        let min = param_text(error, "min");
        let max = param_text(error, "max");
        match &*error.code {
            "required" => format!("{field} is a required field"),
            "email" => format!("{field} must be a valid email address"),
            "url" => format!("{field} must be a valid URL"),
            "length" => {
                if let Some(equal) = param_text(error, "equal") {
                    return format!("{field} must be {equal} characters in length");
                }
                match (min, max) {
                    (Some(min), Some(max)) => {
                        format!("{field} must be between {min} and {max} characters in length")
                    }
                    (Some(min), None) => {
                        format!("{field} must be at least {min} characters in length")
                    }
                    (None, Some(max)) => {
                        format!("{field} must be a maximum of {max} characters in length")
                    }
                    (None, None) => format!("{field} has an invalid length"),
                }
            }
            "range" => match (min, max) {
                (Some(min), Some(max)) => format!("{field} must be between {min} and {max}"),
                (Some(min), None) => format!("{field} must be {min} or greater"),
                (None, Some(max)) => format!("{field} must be {max} or less"),
                (None, None) => format!("{field} is out of range"),
            },
            "must_match" => match param_text(error, "other") {
                Some(other) => format!("{field} must be equal to {other}"),
                None => format!("{field} does not match"),
            },
            "contains" => match param_text(error, "needle") {
                Some(needle) => format!("{field} must contain the text '{needle}'"),
                None => format!("{field} is missing required text"),
            },
            "does_not_contain" => match param_text(error, "needle") {
                Some(needle) => format!("{field} cannot contain the text '{needle}'"),
                None => format!("{field} contains forbidden text"),
            },
            "regex" => format!("{field} has an invalid format"),
            code => format!("{field} failed on the '{code}' validation"),
        }
    }
}

fn param_text(error: &ValidationError, name: &str) -> Option<String> {
    error.params.get(name).map(value_to_text)
}

/// Collect leaf field errors with dotted paths, e.g. `address.city` or `items[1].name`.
fn collect_field_errors<'a>(
    prefix: &str,
    errors: &'a ValidationErrors,
    out: &mut Vec<(String, &'a ValidationError)>,
) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            (*field).to_owned()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|error| (path.clone(), error)));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}

/// Build a `badRequest` problem from `validator` errors.
///
/// Returns `None` when there are no failures.
#[must_use]
pub fn validator_response_with(
    errors: &ValidationErrors,
    translator: &dyn FieldTranslator,
) -> Option<Problem> {
    let mut failures = Vec::new();
    collect_field_errors("", errors, &mut failures);
    if failures.is_empty() {
        return None;
    }
    failures.sort_by(|a, b| a.0.cmp(&b.0));

    let location = config::current().validation_location.clone();
    let params: Vec<ValidationParam> = failures
        .into_iter()
        .map(|(name, error)| ValidationParam {
            location: location.clone(),
            value: error.params.get("value").cloned().unwrap_or(Value::Null),
            issue: translator.translate(&name, error),
            name,
            is_unknown: false,
        })
        .collect();

    tracing::debug!(
        failures = params.len(),
        "mapping validation errors to problem"
    );
    Some(input_validation(&params))
}

/// [`validator_response_with`] using [`EnglishTranslator`].
#[must_use]
pub fn validator_response(errors: &ValidationErrors) -> Option<Problem> {
    validator_response_with(errors, &EnglishTranslator)
}
