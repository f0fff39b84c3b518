//! Field schema and field authorization validators.
//!
//! Two independent checks with deliberately distinct failure modes:
//! unknown field names are a *data* error (400), fields outside the
//! principal's allowlist are a *permission* error (403). Keeping them
//! separate lets callers tell a malformed request from a forbidden one.

use crate::error::Rejection;
use crate::fields::{allowed_fields, FieldName, STAFF_FIELDS};
use crate::gate::Gate;
use crate::request::RequestContext;
use crate::role::Role;

/// Rejects payloads containing field names outside the known schema.
///
/// Runs before field authorization so malformed input never surfaces as
/// a permission error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSchemaValidator;

impl Gate for FieldSchemaValidator {
    fn check(&self, ctx: &RequestContext) -> Result<(), Rejection> {
        let unknown: Vec<String> = ctx
            .payload_fields()
            .iter()
            .filter(|name| FieldName::parse(name).is_none())
            .cloned()
            .collect();

        if unknown.is_empty() {
            return Ok(());
        }

        tracing::debug!(path = %ctx.path(), ?unknown, "rejecting payload with unknown fields");
        let valid = crate::fields::all_fields().map(FieldName::as_str).collect();
        Err(Rejection::invalid_fields(unknown, valid))
    }
}

/// What field authorization does with fields the role may not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldValidationMode {
    /// Halt the chain with `FIELD_AUTHORIZATION_ERROR` (strict).
    #[default]
    Reject,
    /// Silently drop the unauthorized fields and proceed (permissive).
    Sanitize,
}

/// Checks that the principal's role may set every *present* payload
/// field.
///
/// One validator parameterized by [`FieldValidationMode`], not two
/// near-duplicate code paths. Strict vs. permissive is a per-route
/// deployment choice; neither is "more correct".
///
/// Admin passes unconditionally (its allowed set is the full schema).
/// A role below Staff is stopped with a generic 403 even though the
/// role gate should already have caught it: this validates a different
/// invariant and does not trust earlier stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldAuthorizationValidator {
    mode: FieldValidationMode,
}

impl FieldAuthorizationValidator {
    /// Creates a validator with the given enforcement mode.
    pub fn new(mode: FieldValidationMode) -> Self {
        Self { mode }
    }

    /// Validates the payload against the principal's allowlist, dropping
    /// fields from the context in sanitize mode.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the principal is missing, below
    /// Staff, or (in reject mode) submitted fields outside its
    /// allowlist.
    pub fn apply(&self, ctx: &mut RequestContext) -> Result<(), Rejection> {
        let principal = match ctx.principal() {
            Some(principal) => principal,
            None => return Err(Rejection::auth_required()),
        };

        let (net_id, role) = (principal.net_id.clone(), principal.role);
        match role {
            Role::Admin => Ok(()),
            Role::Staff => self.apply_staff(ctx),
            Role::Customer => {
                tracing::warn!(%net_id, "field authorization reached by a role below staff");
                Err(Rejection::insufficient_permissions(
                    "Your role may not modify menu items",
                ))
            }
        }
    }

    fn apply_staff(&self, ctx: &mut RequestContext) -> Result<(), Rejection> {
        let in_staff_set =
            |name: &str| STAFF_FIELDS.iter().any(|field| field.as_str() == name);

        let unauthorized: Vec<String> = ctx
            .payload_fields()
            .iter()
            .filter(|name| !in_staff_set(name))
            .cloned()
            .collect();

        if unauthorized.is_empty() {
            return Ok(());
        }

        match self.mode {
            FieldValidationMode::Reject => {
                tracing::debug!(?unauthorized, "rejecting staff payload with admin-only fields");
                let allowed = allowed_fields(Role::Staff)
                    .into_iter()
                    .map(FieldName::as_str)
                    .collect();
                Err(Rejection::unauthorized_fields(
                    unauthorized,
                    allowed,
                    "Staff may only update item availability flags",
                ))
            }
            FieldValidationMode::Sanitize => {
                tracing::debug!(dropped = ?unauthorized, "sanitizing staff payload");
                ctx.retain_payload_fields(in_staff_set);
                Ok(())
            }
        }
    }
}
