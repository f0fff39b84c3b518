use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::role::Role;

/// Stable machine-readable identifier for a rejection.
///
/// These identifiers are part of the client contract: clients branch on
/// them (redirect to login on `AUTH_REQUIRED`, show the field list on
/// `FIELD_AUTHORIZATION_ERROR`, show a countdown on
/// `RATE_LIMIT_EXCEEDED`). They never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No authenticated principal on the request.
    AuthRequired,
    /// Principal present but role below the required threshold.
    InsufficientPermissions,
    /// Mutating request missing the anti-CSRF marker header.
    CsrfValidationFailed,
    /// Payload contains field names outside the known schema.
    InvalidFields,
    /// Payload contains fields the principal's role may not set.
    FieldAuthorizationError,
    /// Per-key request quota exhausted for the current window.
    RateLimitExceeded,
}

impl ErrorCode {
    /// Returns the stable wire identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            ErrorCode::InvalidFields => "INVALID_FIELDS",
            ErrorCode::FieldAuthorizationError => "FIELD_AUTHORIZATION_ERROR",
            ErrorCode::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A gate's terminal verdict: the chain stops here.
///
/// Serializes to the stable client-facing body
/// `{ error, message, code, ...context }` where `context` carries the
/// per-gate extras (`requiredRole`/`currentRole`, `invalidFields`,
/// `retryAfter`, ...). The HTTP status travels alongside the body, not
/// inside it.
///
/// # Examples
///
/// ```
/// use menu_guard::{ErrorCode, Rejection, Role};
///
/// let rejection = Rejection::insufficient_role(Role::Admin, Role::Staff);
/// assert_eq!(rejection.status, 403);
/// assert_eq!(rejection.code, ErrorCode::InsufficientPermissions);
///
/// let body = rejection.body();
/// assert_eq!(body["requiredRole"], "admin");
/// assert_eq!(body["currentRole"], "staff");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// HTTP status code to respond with.
    #[serde(skip)]
    pub status: u16,
    /// Short human-readable status text (e.g. "Forbidden").
    pub error: String,
    /// Human-readable explanation of the rejection.
    pub message: String,
    /// Stable machine-readable code clients branch on.
    pub code: ErrorCode,
    /// Gate-specific context merged into the body at the top level.
    #[serde(flatten)]
    pub context: Map<String, Value>,
}

impl Rejection {
    fn new(status: u16, code: ErrorCode, message: impl Into<String>) -> Self {
        let error = match status {
            400 => "Bad Request",
            401 => "Unauthorized",
            403 => "Forbidden",
            429 => "Too Many Requests",
            _ => "Error",
        };
        Self {
            status,
            error: error.to_string(),
            message: message.into(),
            code,
            context: Map::new(),
        }
    }

    /// 401: no authenticated principal on the request.
    pub fn auth_required() -> Self {
        Self::new(401, ErrorCode::AuthRequired, "Authentication required")
    }

    /// 403: principal's role is below the required threshold.
    ///
    /// Carries `requiredRole` and `currentRole` so the client can explain
    /// the denial; this leaks nothing beyond what the client already
    /// asserted about itself.
    pub fn insufficient_role(required: Role, current: Role) -> Self {
        let mut rejection = Self::new(
            403,
            ErrorCode::InsufficientPermissions,
            format!("This action requires the {required} role"),
        );
        rejection
            .context
            .insert("requiredRole".into(), json!(required.as_str()));
        rejection
            .context
            .insert("currentRole".into(), json!(current.as_str()));
        rejection
    }

    /// 403: generic permission denial without role context.
    ///
    /// Used by the defensive branch of field authorization, where the
    /// role gate should already have stopped the request.
    pub fn insufficient_permissions(message: impl Into<String>) -> Self {
        Self::new(403, ErrorCode::InsufficientPermissions, message)
    }

    /// 403: mutating request missing the anti-CSRF marker header.
    pub fn csrf_validation_failed() -> Self {
        Self::new(
            403,
            ErrorCode::CsrfValidationFailed,
            "Request is missing the required request marker",
        )
    }

    /// 400: payload contains field names outside the known schema.
    ///
    /// Deliberately a *data* error, never conflated with a permission
    /// error; carries the offending names and the full valid schema.
    pub fn invalid_fields(invalid: Vec<String>, valid: Vec<&'static str>) -> Self {
        let mut rejection = Self::new(
            400,
            ErrorCode::InvalidFields,
            "Payload contains unrecognized fields",
        );
        rejection.context.insert("invalidFields".into(), json!(invalid));
        rejection.context.insert("validFields".into(), json!(valid));
        rejection
    }

    /// 403: payload contains fields the principal's role may not set.
    pub fn unauthorized_fields(
        unauthorized: Vec<String>,
        allowed: Vec<&'static str>,
        hint: impl Into<String>,
    ) -> Self {
        let mut rejection = Self::new(
            403,
            ErrorCode::FieldAuthorizationError,
            "Your role may not set one or more of the submitted fields",
        );
        rejection
            .context
            .insert("unauthorizedFields".into(), json!(unauthorized));
        rejection.context.insert("allowedFields".into(), json!(allowed));
        rejection.context.insert("hint".into(), json!(hint.into()));
        rejection
    }

    /// 429: per-key request quota exhausted for the current window.
    ///
    /// `retry_after` is whole seconds until the window resets.
    pub fn rate_limit_exceeded(retry_after: u64) -> Self {
        let mut rejection = Self::new(
            429,
            ErrorCode::RateLimitExceeded,
            "Too many requests, please slow down",
        );
        rejection.context.insert("retryAfter".into(), json!(retry_after));
        rejection
    }

    /// Returns the client-facing JSON body.
    pub fn body(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for Rejection {}

/// Terminal outcome of a full pipeline run that did not succeed.
///
/// Either a gate rejected the request before the protected operation
/// ran, or every gate passed and the operation itself failed. The two
/// are distinct: a rejection carries an HTTP status and wire body; an
/// operation failure is the caller's own error type.
#[derive(Debug)]
pub enum PipelineError<E> {
    /// A gate halted the chain; the protected operation never ran.
    Rejected(Rejection),
    /// All gates passed but the protected operation failed.
    Operation(E),
}

impl<E> PipelineError<E> {
    /// Returns the rejection, if the chain was halted by a gate.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            PipelineError::Rejected(rejection) => Some(rejection),
            PipelineError::Operation(_) => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for PipelineError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Rejected(rejection) => write!(f, "request rejected: {rejection}"),
            PipelineError::Operation(err) => write!(f, "protected operation failed: {err}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for PipelineError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Rejected(rejection) => Some(rejection),
            PipelineError::Operation(err) => Some(err),
        }
    }
}
