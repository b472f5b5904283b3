//! Catalog of canned API problems (authentication, authorization, lookup, internal).

use std::error::Error as StdError;

use serde_json::Value;

use crate::problem::{Problem, value_to_text};
use crate::validation::Issue;

pub const TYPE_NO_ACCESS_TOKEN: &str = "urn:problem-type:noAccessToken";
pub const TYPE_INVALID_TOKEN: &str = "urn:problem-type:invalidAccessToken";
pub const TYPE_TOKEN_EXPIRED: &str = "urn:problem-type:expiredAccessToken";
pub const TYPE_MISSING_SCOPE: &str = "urn:problem-type:missingScope";
pub const TYPE_MISSING_PERMISSION: &str = "urn:problem-type:missingPermission";
pub const TYPE_NOT_FOUND: &str = "urn:problem-type:resourceNotFound";
pub const TYPE_BAD_REQUEST: &str = "urn:problem-type:badRequest";
pub const TYPE_SCHEMA_VIOLATION: &str = "urn:problem-type:input-validation:schemaViolation";
pub const TYPE_UNKNOWN_PARAMETER: &str = "urn:problem-type:input-validation:unknownParameter";
pub const TYPE_INTERNAL_SERVER_ERROR: &str = "urn:problem-type:internalServerError";
pub const TYPE_CONFLICT: &str = "urn:problem-type:conflict";

/// Static problem definition from the catalog
#[derive(Debug, Clone, Copy)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub type_url: &'static str,
}

impl ErrDef {
    /// Convert this definition into a Problem with the given detail
    #[inline]
    pub fn as_problem(&self, detail: impl Into<String>) -> Problem {
        Problem::new(self.status, detail)
            .with_type(self.type_url)
            .with_title(self.title)
    }
}

pub const NO_ACCESS_TOKEN: ErrDef = ErrDef {
    status: 401,
    title: "No Access Token",
    type_url: TYPE_NO_ACCESS_TOKEN,
};

pub const INVALID_TOKEN: ErrDef = ErrDef {
    status: 401,
    title: "Invalid Access Token",
    type_url: TYPE_INVALID_TOKEN,
};

pub const EXPIRED_TOKEN: ErrDef = ErrDef {
    status: 401,
    title: "Expired Access Token",
    type_url: TYPE_TOKEN_EXPIRED,
};

pub const MISSING_SCOPE: ErrDef = ErrDef {
    status: 403,
    title: "Missing Scope",
    type_url: TYPE_MISSING_SCOPE,
};

pub const MISSING_PERMISSION: ErrDef = ErrDef {
    status: 403,
    title: "Missing Permission",
    type_url: TYPE_MISSING_PERMISSION,
};

pub const NOT_FOUND: ErrDef = ErrDef {
    status: 404,
    title: "Resource not found",
    type_url: TYPE_NOT_FOUND,
};

pub const CONFLICT: ErrDef = ErrDef {
    status: 409,
    title: "Conflict",
    type_url: TYPE_CONFLICT,
};

pub const BAD_REQUEST: ErrDef = ErrDef {
    status: 400,
    title: "Bad Request",
    type_url: TYPE_BAD_REQUEST,
};

pub const INTERNAL_SERVER_ERROR: ErrDef = ErrDef {
    status: 500,
    title: "Internal Server Error",
    type_url: TYPE_INTERNAL_SERVER_ERROR,
};

/// Attach an extension, handing back the failure problem if that is refused.
pub(crate) fn with_extension(mut problem: Problem, key: &str, value: impl Into<Value>) -> Problem {
    match problem.set(key, value) {
        Ok(()) => problem,
        Err(failure) => failure,
    }
}

pub fn no_access_token() -> Problem {
    NO_ACCESS_TOKEN.as_problem("No Bearer access token found in Authorization HTTP header")
}

pub fn invalid_token() -> Problem {
    INVALID_TOKEN
        .as_problem("The Bearer access token found in the Authorization HTTP header is invalid")
}

pub fn expired_token() -> Problem {
    EXPIRED_TOKEN
        .as_problem("The Bearer access token found in the Authorization HTTP header has expired")
}

/// 403 listing the scopes the caller would need under `requiredScopes`.
pub fn missing_scope<I, S>(scopes: I) -> Problem
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let scopes: Vec<Value> = scopes
        .into_iter()
        .map(|s| Value::String(s.into()))
        .collect();
    with_extension(
        MISSING_SCOPE.as_problem("Forbidden to consult the resource"),
        "requiredScopes",
        scopes,
    )
}

pub fn missing_permission() -> Problem {
    MISSING_PERMISSION.as_problem("Not permitted to update the details of this resource")
}

pub fn conflict(detail: impl Into<String>) -> Problem {
    CONFLICT.as_problem(detail)
}

pub fn internal_error(detail: impl Into<String>) -> Problem {
    INTERNAL_SERVER_ERROR.as_problem(detail)
}

/// 500 built from an error, which is kept as the cause and emitted under `error`.
pub fn internal_error_from<E>(err: E) -> Problem
where
    E: Into<Box<dyn StdError + Send + Sync>>,
{
    Problem::from_error(err).with_type(TYPE_INTERNAL_SERVER_ERROR)
}

/// Describes the resource a [`missing_resource`] problem reports.
#[derive(Debug, Clone, Default)]
pub struct MissingResource {
    /// Kind of resource that is missing, e.g. `User`
    pub resource_type: String,
    /// The identifier that was requested
    pub resource_value: Value,
    /// Where the identifier came from (`path`, `body`, ...); empty to omit
    pub location: String,
    /// The API path that was called, e.g. `/users/123`; empty to omit
    pub url: String,
}

/// 404 with a single `issues` entry naming the missing resource.
pub fn missing_resource(resource: &MissingResource) -> Problem {
    let shown = value_to_text(&resource.resource_value);
    let detail = format!("No resource {}:{shown} found", resource.resource_type);
    let problem = NOT_FOUND
        .as_problem(detail)
        .with_instance(resource.url.as_str());

    let issue = Issue {
        type_url: TYPE_NOT_FOUND.to_owned(),
        location: resource.location.clone(),
        name: resource.resource_type.clone(),
        value: resource.resource_value.clone(),
        detail: format!("the {} {shown} is not assigned", resource.resource_type),
    };
    with_extension(problem, "issues", vec![issue.into_value()])
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;

    #[test]
    fn err_def_to_problem_works() {
        let def = ErrDef {
            status: StatusCode::NOT_FOUND.as_u16(),
            title: "Not Found",
            type_url: "urn:problem-type:test",
        };

        let problem = def.as_problem("Resource missing");
        assert_eq!(problem.status(), 404);
        assert_eq!(problem.title, "Not Found");
        assert_eq!(problem.detail, "Resource missing");
        assert_eq!(problem.type_url, "urn:problem-type:test");
    }

    #[test]
    fn token_problems() {
        let cases = [
            (no_access_token(), TYPE_NO_ACCESS_TOKEN, "No Access Token"),
            (invalid_token(), TYPE_INVALID_TOKEN, "Invalid Access Token"),
            (expired_token(), TYPE_TOKEN_EXPIRED, "Expired Access Token"),
        ];
        for (problem, type_url, title) in cases {
            assert_eq!(problem.status(), 401);
            assert_eq!(problem.type_url, type_url);
            assert_eq!(problem.title, title);
            assert!(problem.detail.contains("Bearer access token"));
        }
    }

    #[test]
    fn missing_scope_lists_scopes() {
        let problem = missing_scope(["users:read", "users:write"]);
        assert_eq!(problem.status(), 403);
        assert_eq!(problem.type_url, TYPE_MISSING_SCOPE);
        assert_eq!(
            problem.attribute("requiredScopes"),
            Some(&json!(["users:read", "users:write"]))
        );
    }

    #[test]
    fn missing_permission_problem() {
        let problem = missing_permission();
        assert_eq!(problem.status(), 403);
        assert_eq!(problem.title, "Missing Permission");
    }

    #[test]
    fn conflict_and_internal() {
        let c = conflict("Email already exists");
        assert_eq!(c.status(), 409);
        assert_eq!(c.type_url, TYPE_CONFLICT);

        let i = internal_error("Database connection failed");
        assert_eq!(i.status(), 500);
        assert_eq!(i.title, "Internal Server Error");
        assert_eq!(i.detail, "Database connection failed");
    }

    #[test]
    fn internal_error_from_keeps_cause() {
        let problem = internal_error_from(std::io::Error::other("pool exhausted"));
        assert_eq!(problem.status(), 500);
        assert_eq!(problem.type_url, TYPE_INTERNAL_SERVER_ERROR);
        assert_eq!(problem.title(), "Internal Server Error");
        assert_eq!(
            problem.flatten().get("error"),
            Some(&json!("pool exhausted"))
        );
    }

    #[test]
    fn missing_resource_describes_the_resource() {
        let problem = missing_resource(&MissingResource {
            resource_type: "User".to_owned(),
            resource_value: json!(123),
            location: "path".to_owned(),
            url: "/users/123".to_owned(),
        });
        assert_eq!(problem.status(), 404);
        assert_eq!(problem.type_url, TYPE_NOT_FOUND);
        assert_eq!(problem.title, "Resource not found");
        assert_eq!(problem.detail, "No resource User:123 found");
        assert_eq!(problem.instance, "/users/123");
        assert_eq!(
            problem.attribute("issues"),
            Some(&json!([{
                "type": TYPE_NOT_FOUND,
                "in": "path",
                "name": "User",
                "value": 123,
                "detail": "the User 123 is not assigned",
            }]))
        );
    }

    #[test]
    fn missing_resource_without_location_omits_in() {
        let problem = missing_resource(&MissingResource {
            resource_type: "Order".to_owned(),
            resource_value: json!("A-1"),
            ..MissingResource::default()
        });
        let issues = problem.attribute("issues").unwrap();
        assert!(issues[0].get("in").is_none());
        assert_eq!(issues[0]["value"], "A-1");
        assert_eq!(problem.detail, "No resource Order:A-1 found");
    }
}
