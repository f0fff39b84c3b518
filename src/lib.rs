//! Role-based access control request pipeline for menu management.
//!
//! Every mutating request to the menu surface passes through an ordered
//! chain of independent enforcement stages before reaching business
//! logic:
//!
//! 1. **Authentication gate** - rejects requests with no principal
//! 2. **Role gate** - rejects principals below a role threshold
//! 3. **CSRF gate** - rejects mutations lacking the marker header
//! 4. **Field schema validator** - rejects unknown payload fields
//! 5. **Field authorization validator** - rejects (or strips) fields
//!    the role may not set
//! 6. **Rate limiter** - fixed-window per-key quotas
//! 7. **Audit recorder** - one append-only entry per terminal outcome
//!
//! The chain is fail-fast and fail-secure: the first stage to reject
//! terminates it with a stable error code, and any ambiguity resolves
//! to a rejection.
//!
//! # Core Types
//!
//! - [`Role`]: ordered hierarchy `Customer < Staff < Admin`
//! - [`Principal`]: authenticated identity (NetID + role)
//! - [`RequestContext`]: framework-agnostic view of one request
//! - [`Rejection`]: a gate's terminal verdict with its wire body
//! - [`Pipeline`]: the composed chain
//! - [`RouteConfig`]: per-route policy settings
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use menu_guard::audit::InMemoryAuditStore;
//! use menu_guard::{
//!     HttpMethod, InMemoryRateLimitStore, Pipeline, Principal, RequestContext, Role,
//!     RouteConfig,
//! };
//!
//! let pipeline = Pipeline::new(
//!     Arc::new(InMemoryRateLimitStore::new()),
//!     Arc::new(InMemoryAuditStore::new()),
//! );
//! let config = RouteConfig::new(Role::Staff, "update", "menu_item");
//!
//! let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/42", "10.0.0.7");
//! ctx.set_principal(Some(Principal::new("abc123", Role::Staff)));
//! ctx.add_header("x-requested-with", "XMLHttpRequest");
//! ctx.add_payload_field("isAvailable");
//!
//! let outcome = pipeline.execute(&config, ctx, |principal, fields| {
//!     // the protected operation: apply the validated mutation
//!     Ok::<_, std::io::Error>(format!("{} set {} fields", principal.net_id, fields.len()))
//! });
//! assert!(outcome.is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
mod error;
mod fields;
mod gate;
mod pipeline;
mod rate_limit;
mod request;
mod role;
mod session;
mod validate;

pub use error::{ErrorCode, PipelineError, Rejection};
pub use fields::{allowed_fields, all_fields, FieldName, ADMIN_ONLY_FIELDS, STAFF_FIELDS};
pub use gate::{AuthenticationGate, CsrfGate, Gate, RoleGate};
pub use pipeline::{Pipeline, RouteConfig};
pub use rate_limit::{
    Clock, InMemoryRateLimitStore, KeyStrategy, RateLimitConfig, RateLimitEntry, RateLimitStore,
    RateLimiter, SystemClock,
};
pub use request::{HttpMethod, RequestContext};
pub use role::{Principal, Role};
pub use session::{SessionFingerprint, SessionIntegrityCheck, SessionVerdict};
pub use validate::{FieldAuthorizationValidator, FieldSchemaValidator, FieldValidationMode};
