//! The composed enforcement chain.
//!
//! `Pipeline::execute` runs every stage in a fixed order and invokes
//! the protected operation only after all of them pass:
//!
//! ```text
//! authentication -> role -> CSRF -> field schema -> field authorization
//!     -> rate limit -> [protected operation] -> audit
//! ```
//!
//! Control flow is strictly sequential and fail-fast: the first gate to
//! reject terminates the chain with its status and error code; no later
//! gate runs. The audit recorder is invoked only after the terminal
//! outcome, so no entry is ever left with an unknown result.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::audit::{AuditRecorder, AuditStore};
use crate::error::{PipelineError, Rejection};
use crate::gate::{AuthenticationGate, CsrfGate, Gate, RoleGate};
use crate::rate_limit::{Clock, RateLimitConfig, RateLimitStore, RateLimiter, SystemClock};
use crate::request::RequestContext;
use crate::role::{Principal, Role};
use crate::validate::{FieldAuthorizationValidator, FieldSchemaValidator, FieldValidationMode};

/// Per-route policy configuration.
///
/// # Examples
///
/// ```
/// use menu_guard::{FieldValidationMode, RateLimitConfig, Role, RouteConfig};
///
/// let config = RouteConfig::new(Role::Staff, "update", "menu_item")
///     .with_rate_limit(RateLimitConfig::new(60_000, 30))
///     .with_field_validation_mode(FieldValidationMode::Sanitize);
/// assert_eq!(config.required_role, Role::Staff);
/// ```
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Minimum role on the hierarchy for this route.
    pub required_role: Role,
    /// Rate-limit settings for this route.
    pub rate_limit: RateLimitConfig,
    /// Action recorded in audit entries, e.g. `"update"`.
    pub audit_action: String,
    /// Resource kind recorded in audit entries, e.g. `"menu_item"`.
    pub audit_resource: String,
    /// Strict or permissive field authorization.
    pub field_validation_mode: FieldValidationMode,
}

impl RouteConfig {
    /// Creates a config with the default rate limit and strict field
    /// validation.
    pub fn new(
        required_role: Role,
        audit_action: impl Into<String>,
        audit_resource: impl Into<String>,
    ) -> Self {
        Self {
            required_role,
            rate_limit: RateLimitConfig::default(),
            audit_action: audit_action.into(),
            audit_resource: audit_resource.into(),
            field_validation_mode: FieldValidationMode::default(),
        }
    }

    /// Overrides the rate-limit settings.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Overrides the field authorization mode.
    pub fn with_field_validation_mode(mut self, mode: FieldValidationMode) -> Self {
        self.field_validation_mode = mode;
        self
    }
}

/// The RBAC request pipeline.
///
/// Holds the two shared mutable resources (rate-limit counters, audit
/// store) behind injected interfaces plus the cross-request fixtures
/// (clock, CSRF marker). Everything else is stateless per request.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use menu_guard::audit::InMemoryAuditStore;
/// use menu_guard::{
///     HttpMethod, InMemoryRateLimitStore, Pipeline, Principal, RequestContext, Role,
///     RouteConfig,
/// };
///
/// let pipeline = Pipeline::new(
///     Arc::new(InMemoryRateLimitStore::new()),
///     Arc::new(InMemoryAuditStore::new()),
/// );
/// let config = RouteConfig::new(Role::Staff, "update", "menu_item");
///
/// let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/42", "10.0.0.7");
/// ctx.set_principal(Some(Principal::new("abc123", Role::Staff)));
/// ctx.add_header("x-requested-with", "XMLHttpRequest");
/// ctx.add_payload_field("isAvailable");
///
/// let result: Result<&str, _> =
///     pipeline.execute(&config, ctx, |_, _| Ok::<_, std::io::Error>("updated"));
/// assert_eq!(result.unwrap(), "updated");
/// ```
pub struct Pipeline {
    clock: Arc<dyn Clock>,
    limiter: RateLimiter,
    recorder: AuditRecorder,
    csrf: CsrfGate,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("limiter", &self.limiter)
            .field("recorder", &self.recorder)
            .field("csrf", &self.csrf)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline over the given stores with the wall clock and
    /// the default CSRF marker.
    pub fn new(rate_store: Arc<dyn RateLimitStore>, audit_store: Arc<dyn AuditStore>) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            limiter: RateLimiter::new(rate_store),
            recorder: AuditRecorder::new(audit_store),
            csrf: CsrfGate::default(),
        }
    }

    /// Replaces the clock (tests use a manual clock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the CSRF gate configuration.
    pub fn with_csrf_gate(mut self, csrf: CsrfGate) -> Self {
        self.csrf = csrf;
        self
    }

    /// Enables audit entries for gate rejections as well.
    pub fn with_failure_logging(mut self, enabled: bool) -> Self {
        self.recorder = self.recorder.log_failures(enabled);
        self
    }

    /// Runs the full chain and, if every gate passes, the protected
    /// operation.
    ///
    /// The operation receives the principal and the (possibly
    /// sanitized) payload field set. Its terminal outcome - success or
    /// its own failure - is audited exactly once, with the applied
    /// field names recorded as `changes` on success.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Rejected`] when a gate halts the chain;
    /// [`PipelineError::Operation`] when the operation itself fails.
    pub fn execute<T, E, F>(
        &self,
        config: &RouteConfig,
        mut ctx: RequestContext,
        op: F,
    ) -> Result<T, PipelineError<E>>
    where
        F: FnOnce(&Principal, &BTreeSet<String>) -> Result<T, E>,
    {
        if let Err(rejection) = self.run_gates(config, &mut ctx) {
            self.recorder.record_rejection(
                &ctx,
                &config.audit_action,
                &config.audit_resource,
                &rejection,
            );
            return Err(PipelineError::Rejected(rejection));
        }

        // The authentication gate passed, but re-resolve rather than
        // unwrap: an absent principal here is a fail-secure 401.
        let principal = match ctx.principal().cloned() {
            Some(principal) => principal,
            None => return Err(PipelineError::Rejected(Rejection::auth_required())),
        };

        let changes: Vec<String> = ctx.payload_fields().iter().cloned().collect();
        let result = op(&principal, ctx.payload_fields());

        self.recorder.record_outcome(
            &ctx,
            &config.audit_action,
            &config.audit_resource,
            changes,
            result.is_ok(),
            result.is_ok().then_some(200),
        );

        result.map_err(PipelineError::Operation)
    }

    fn run_gates(
        &self,
        config: &RouteConfig,
        ctx: &mut RequestContext,
    ) -> Result<(), Rejection> {
        AuthenticationGate.check(ctx)?;
        RoleGate::at_least(config.required_role).check(ctx)?;
        self.csrf.check(ctx)?;
        FieldSchemaValidator.check(ctx)?;
        FieldAuthorizationValidator::new(config.field_validation_mode).apply(ctx)?;
        self.limiter
            .check(&config.rate_limit, ctx, self.clock.now_ms())
    }
}
