//! Authentication, role, and CSRF gates.
//!
//! Each gate inspects the request context and either lets the chain
//! continue (`Ok(())`) or terminates it with a [`Rejection`]. Gates are
//! independent: none assumes another ran, and every ambiguity resolves
//! to a rejection (fail-secure).

use crate::error::Rejection;
use crate::request::RequestContext;
use crate::role::Role;

/// A policy-enforcement stage in the request chain.
///
/// The first gate to return `Err` terminates the chain; no later gate
/// runs.
pub trait Gate {
    /// Checks the request, returning the rejection that halts the chain
    /// on failure.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] carrying the HTTP status and stable error
    /// code for the failure.
    fn check(&self, ctx: &RequestContext) -> Result<(), Rejection>;
}

/// Rejects requests with no resolved principal.
///
/// Intentionally the cheapest check and always first in the chain:
/// every later gate assumes a valid principal exists. No side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationGate;

impl Gate for AuthenticationGate {
    fn check(&self, ctx: &RequestContext) -> Result<(), Rejection> {
        if ctx.principal().is_none() {
            tracing::debug!(path = %ctx.path(), "rejecting unauthenticated request");
            return Err(Rejection::auth_required());
        }
        Ok(())
    }
}

/// How a role gate decides whether a principal qualifies.
#[derive(Debug, Clone)]
enum RoleRequirement {
    /// Principal's role must sit at or above the threshold.
    AtLeast(Role),
    /// Principal's role must be one of an explicit list
    /// (for the rare non-hierarchical combination).
    OneOf(Vec<Role>),
}

/// Rejects principals whose role does not satisfy the requirement.
///
/// The hierarchical form is a thin call into [`Role::meets`]; the
/// ordering lives in exactly one place. Rejections carry the computed
/// `requiredRole` and the principal's `currentRole`.
///
/// # Examples
///
/// ```
/// use menu_guard::{Gate, HttpMethod, Principal, RequestContext, Role, RoleGate};
///
/// let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/1", "10.0.0.1");
/// ctx.set_principal(Some(Principal::new("abc123", Role::Staff)));
///
/// assert!(RoleGate::at_least(Role::Staff).check(&ctx).is_ok());
/// assert!(RoleGate::at_least(Role::Admin).check(&ctx).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct RoleGate {
    requirement: RoleRequirement,
}

impl RoleGate {
    /// Gate on the hierarchy: the principal's role must meet `min`.
    pub fn at_least(min: Role) -> Self {
        Self {
            requirement: RoleRequirement::AtLeast(min),
        }
    }

    /// Gate on an explicit allow-list of roles.
    ///
    /// An empty list rejects everyone.
    pub fn one_of(roles: &[Role]) -> Self {
        Self {
            requirement: RoleRequirement::OneOf(roles.to_vec()),
        }
    }

    /// The least privileged role that would satisfy this gate,
    /// reported as `requiredRole` in rejections.
    fn required_role(&self) -> Role {
        match &self.requirement {
            RoleRequirement::AtLeast(min) => *min,
            RoleRequirement::OneOf(roles) => roles.iter().copied().min().unwrap_or(Role::Admin),
        }
    }

    fn satisfied_by(&self, role: Role) -> bool {
        match &self.requirement {
            RoleRequirement::AtLeast(min) => role.meets(*min),
            RoleRequirement::OneOf(roles) => roles.contains(&role),
        }
    }
}

impl Gate for RoleGate {
    fn check(&self, ctx: &RequestContext) -> Result<(), Rejection> {
        // A role gate without a principal is a fail-secure 401, not a
        // panic: authentication normally runs first, but this gate does
        // not depend on it.
        let principal = match ctx.principal() {
            Some(principal) => principal,
            None => return Err(Rejection::auth_required()),
        };

        if !self.satisfied_by(principal.role) {
            tracing::debug!(
                net_id = %principal.net_id,
                current = %principal.role,
                required = %self.required_role(),
                "rejecting request below role threshold"
            );
            return Err(Rejection::insufficient_role(
                self.required_role(),
                principal.role,
            ));
        }
        Ok(())
    }
}

/// Rejects state-changing requests lacking the custom marker header.
///
/// Browsers refuse to let cross-origin requests set arbitrary
/// non-simple headers, so requiring *any* custom header with a fixed
/// value is sufficient defense against naive CSRF. This is a deliberate
/// simplification versus token-based CSRF: the marker is a constant,
/// not a secret, and must not be silently "improved" into a token
/// scheme without changing this contract.
///
/// Read-only methods bypass the gate entirely.
#[derive(Debug, Clone)]
pub struct CsrfGate {
    header_name: String,
    expected_value: String,
}

impl CsrfGate {
    /// Creates a gate requiring `header_name: expected_value` on every
    /// mutating request.
    pub fn new(header_name: impl Into<String>, expected_value: impl Into<String>) -> Self {
        Self {
            header_name: header_name.into().to_ascii_lowercase(),
            expected_value: expected_value.into(),
        }
    }
}

impl Default for CsrfGate {
    /// The conventional marker: `x-requested-with: XMLHttpRequest`.
    fn default() -> Self {
        Self::new("x-requested-with", "XMLHttpRequest")
    }
}

impl Gate for CsrfGate {
    fn check(&self, ctx: &RequestContext) -> Result<(), Rejection> {
        if !ctx.method().is_mutating() {
            return Ok(());
        }
        match ctx.header(&self.header_name) {
            Some(value) if value == self.expected_value => Ok(()),
            _ => {
                tracing::debug!(
                    method = %ctx.method(),
                    path = %ctx.path(),
                    "rejecting mutating request without request marker"
                );
                Err(Rejection::csrf_validation_failed())
            }
        }
    }
}
