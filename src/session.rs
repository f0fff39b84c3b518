//! Session integrity check.
//!
//! Not part of the per-route chain; applied globally by the web layer.
//! Compares the request's originating address and client-identifying
//! header against values captured when the session was created. A
//! mismatch means the session should be destroyed outright (forcing
//! re-authentication), not merely this request rejected - the one
//! stateful side effect in the subsystem.
//!
//! Operator warning: clients behind rotating proxies or NAT change
//! addresses legitimately, and some user agents mutate their UA string
//! across updates. Expect false positives in those environments; a
//! softer policy (require re-auth on the next mutating request) can be
//! layered on top of [`SessionVerdict`] by the caller.

use crate::request::RequestContext;

/// Client identity captured at session creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFingerprint {
    /// Address the session was established from.
    pub ip: String,
    /// User-Agent presented at session creation, if any.
    pub user_agent: Option<String>,
}

impl SessionFingerprint {
    /// Captures a fingerprint from the request establishing the
    /// session.
    pub fn capture(ctx: &RequestContext) -> Self {
        Self {
            ip: ctx.client_address().to_string(),
            user_agent: ctx.user_agent().map(str::to_string),
        }
    }
}

/// Outcome of a session integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionVerdict {
    /// Request matches the session's fingerprint.
    Intact,
    /// Mismatch: the caller must destroy the session, not merely
    /// reject this request.
    Compromised,
}

/// Compares each request against the session's captured fingerprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionIntegrityCheck;

impl SessionIntegrityCheck {
    /// Verifies the request against the fingerprint.
    ///
    /// Both the address and the User-Agent must match exactly; absence
    /// on both sides counts as a match.
    pub fn verify(
        &self,
        fingerprint: &SessionFingerprint,
        ctx: &RequestContext,
    ) -> SessionVerdict {
        let ip_matches = fingerprint.ip == ctx.client_address();
        let agent_matches = fingerprint.user_agent.as_deref() == ctx.user_agent();

        if ip_matches && agent_matches {
            SessionVerdict::Intact
        } else {
            tracing::warn!(
                expected_ip = %fingerprint.ip,
                seen_ip = %ctx.client_address(),
                "session fingerprint mismatch, session must be destroyed"
            );
            SessionVerdict::Compromised
        }
    }
}
