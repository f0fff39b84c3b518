//! Best-effort audit recording.

use std::sync::Arc;

use crate::error::Rejection;
use crate::request::RequestContext;
use crate::role::Role;

use super::{AuditEntry, AuditStore};

/// Records pipeline outcomes against a swappable store.
///
/// Recording is best-effort and decoupled from the response path: an
/// append failure is reported through `tracing::error!` and swallowed.
/// Auditing is explicitly not allowed to become an availability
/// dependency for the protected operation.
///
/// By default only requests that cleared every gate are recorded; with
/// [`log_failures`](Self::log_failures) enabled, gate rejections are
/// recorded too (success = false, the rejection's status code).
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
    log_failures: bool,
}

impl AuditRecorder {
    /// Creates a recorder over the given store; failure logging off.
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self {
            store,
            log_failures: false,
        }
    }

    /// Enables or disables recording of gate rejections.
    pub fn log_failures(mut self, enabled: bool) -> Self {
        self.log_failures = enabled;
        self
    }

    /// Appends one entry, swallowing backend failures.
    pub fn record(&self, entry: AuditEntry) {
        if let Err(err) = self.store.append(entry) {
            tracing::error!(%err, "failed to append audit entry");
        }
    }

    /// Records the terminal outcome of a request that reached the
    /// protected operation.
    pub fn record_outcome(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource: &str,
        changes: Vec<String>,
        success: bool,
        status_code: Option<u16>,
    ) {
        let (net_id, role) = identify(ctx);
        let mut builder = AuditEntry::new(net_id, role, action, resource).with_request(
            ctx.method().to_string(),
            ctx.path(),
            ctx.client_address(),
        );
        if let Some(user_agent) = ctx.user_agent() {
            builder = builder.with_user_agent(user_agent);
        }
        if success {
            builder = builder.with_changes(changes);
        }
        self.record(builder.finish(success, status_code));
    }

    /// Records a gate rejection, if failure logging is enabled.
    pub fn record_rejection(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource: &str,
        rejection: &Rejection,
    ) {
        if !self.log_failures {
            return;
        }
        let (net_id, role) = identify(ctx);
        let mut builder = AuditEntry::new(net_id, role, action, resource).with_request(
            ctx.method().to_string(),
            ctx.path(),
            ctx.client_address(),
        );
        if let Some(user_agent) = ctx.user_agent() {
            builder = builder.with_user_agent(user_agent);
        }
        self.record(builder.finish(false, Some(rejection.status)));
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("log_failures", &self.log_failures)
            .finish_non_exhaustive()
    }
}

// Rejected unauthenticated requests still get an entry when failure
// logging is on; they are attributed to "anonymous" at customer level.
fn identify(ctx: &RequestContext) -> (String, Role) {
    match ctx.principal() {
        Some(principal) => (principal.net_id.clone(), principal.role),
        None => ("anonymous".to_string(), Role::Customer),
    }
}
