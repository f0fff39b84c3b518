//! End-to-end tests for the full enforcement chain.
//!
//! These exercise the pipeline exactly as a web layer would: build a
//! `RequestContext`, run `Pipeline::execute`, and assert on the
//! rejection body or the audit trail.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use menu_guard::audit::{AuditQuery, InMemoryAuditStore};
use menu_guard::{
    Clock, ErrorCode, FieldValidationMode, HttpMethod, InMemoryRateLimitStore, Pipeline,
    PipelineError, Principal, RateLimitConfig, RequestContext, Role, RouteConfig,
};

struct ManualClock(AtomicU64);

impl ManualClock {
    fn at(ms: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(ms)))
    }

    fn advance(&self, ms: u64) {
        self.0.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

struct Harness {
    pipeline: Pipeline,
    audit: Arc<InMemoryAuditStore>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let audit = Arc::new(InMemoryAuditStore::new());
    let clock = ManualClock::at(0);
    let pipeline = Pipeline::new(Arc::new(InMemoryRateLimitStore::new()), audit.clone())
        .with_clock(clock.clone());
    Harness {
        pipeline,
        audit,
        clock,
    }
}

fn staff_update(fields: &[&str]) -> RequestContext {
    let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/42", "10.1.1.1");
    ctx.set_principal(Some(Principal::new("jdoe42", Role::Staff)));
    ctx.add_header("x-requested-with", "XMLHttpRequest");
    ctx.add_header("user-agent", "dining-web/5.1");
    ctx.set_payload_fields(fields.iter().map(|s| s.to_string()));
    ctx
}

fn apply(
    _: &Principal,
    _: &BTreeSet<String>,
) -> Result<&'static str, std::io::Error> {
    Ok("applied")
}

#[test]
fn happy_path_runs_operation_and_audits_success() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    let result = h
        .pipeline
        .execute(&config, staff_update(&["isAvailable", "isHot"]), apply);
    assert_eq!(result.unwrap(), "applied");

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert!(entry.success);
    assert_eq!(entry.net_id, "jdoe42");
    assert_eq!(entry.action, "update");
    assert_eq!(entry.resource, "menu_item");
    assert_eq!(entry.method, "PUT");
    assert_eq!(entry.path, "/api/menu/42");
    assert_eq!(entry.user_agent.as_deref(), Some("dining-web/5.1"));
    assert_eq!(
        entry.changes.as_deref(),
        Some(&["isAvailable".to_string(), "isHot".to_string()][..])
    );
}

#[test]
fn fail_fast_unauthenticated_beats_invalid_fields() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/42", "10.1.1.1");
    ctx.add_payload_field("bogusField");

    let err = h.pipeline.execute(&config, ctx, apply).unwrap_err();
    let rejection = err.rejection().expect("gate rejection");
    assert_eq!(rejection.status, 401);
    assert_eq!(rejection.code, ErrorCode::AuthRequired);
}

#[test]
fn customer_is_rejected_at_the_role_gate_with_role_context() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    let mut ctx = staff_update(&["isAvailable"]);
    ctx.set_principal(Some(Principal::new("cust01", Role::Customer)));

    let err = h.pipeline.execute(&config, ctx, apply).unwrap_err();
    let body = err.rejection().expect("gate rejection").body();
    assert_eq!(body["code"], "INSUFFICIENT_PERMISSIONS");
    assert_eq!(body["requiredRole"], "staff");
    assert_eq!(body["currentRole"], "customer");
}

#[test]
fn mutating_request_without_marker_is_csrf_rejected_even_for_admin() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/42", "10.1.1.1");
    ctx.set_principal(Some(Principal::new("root01", Role::Admin)));
    ctx.add_payload_field("price");

    let err = h.pipeline.execute(&config, ctx, apply).unwrap_err();
    assert_eq!(
        err.rejection().expect("gate rejection").code,
        ErrorCode::CsrfValidationFailed
    );
}

#[test]
fn staff_submitting_admin_field_gets_the_exact_field_lists() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    let err = h
        .pipeline
        .execute(&config, staff_update(&["isAvailable", "price"]), apply)
        .unwrap_err();

    let body = err.rejection().expect("gate rejection").body();
    assert_eq!(body["code"], "FIELD_AUTHORIZATION_ERROR");
    assert_eq!(body["unauthorizedFields"], serde_json::json!(["price"]));
    assert_eq!(
        body["allowedFields"],
        serde_json::json!(["isAvailable", "isHot"])
    );
}

#[test]
fn admin_submitting_the_same_payload_is_accepted() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    let mut ctx = staff_update(&["isAvailable", "price"]);
    ctx.set_principal(Some(Principal::new("root01", Role::Admin)));

    assert!(h.pipeline.execute(&config, ctx, apply).is_ok());
}

#[test]
fn rate_limit_boundary_allow_allow_allow_reject_then_reset() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item")
        .with_rate_limit(RateLimitConfig::new(60_000, 3));

    for _ in 0..3 {
        assert!(h
            .pipeline
            .execute(&config, staff_update(&["isHot"]), apply)
            .is_ok());
    }

    let err = h
        .pipeline
        .execute(&config, staff_update(&["isHot"]), apply)
        .unwrap_err();
    let rejection = err.rejection().expect("gate rejection");
    assert_eq!(rejection.status, 429);
    assert_eq!(rejection.code, ErrorCode::RateLimitExceeded);
    assert_eq!(rejection.body()["retryAfter"], 60);

    h.clock.advance(60_000);
    assert!(h
        .pipeline
        .execute(&config, staff_update(&["isHot"]), apply)
        .is_ok());
}

#[test]
fn rate_limited_requests_do_not_reach_the_operation_or_audit() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item")
        .with_rate_limit(RateLimitConfig::new(60_000, 1));

    assert!(h
        .pipeline
        .execute(&config, staff_update(&["isHot"]), apply)
        .is_ok());

    let mut operation_ran = false;
    let _ = h
        .pipeline
        .execute(&config, staff_update(&["isHot"]), |_, _| {
            operation_ran = true;
            Ok::<_, std::io::Error>(())
        });

    assert!(!operation_ran);
    // Only the first (successful) request is audited.
    assert_eq!(h.audit.len(), 1);
}

#[test]
fn audit_trail_is_queryable_by_user_action_and_resource() {
    let h = harness();
    let update = RouteConfig::new(Role::Staff, "update", "menu_item");
    let remove = RouteConfig::new(Role::Admin, "delete", "menu_item");

    assert!(h
        .pipeline
        .execute(&update, staff_update(&["isHot"]), apply)
        .is_ok());

    let mut admin_ctx = staff_update(&[]);
    admin_ctx.set_principal(Some(Principal::new("root01", Role::Admin)));
    assert!(h.pipeline.execute(&remove, admin_ctx, apply).is_ok());

    assert_eq!(h.audit.query(&AuditQuery::any()).len(), 2);
    assert_eq!(h.audit.query(&AuditQuery::any().net_id("jdoe42")).len(), 1);
    assert_eq!(h.audit.query(&AuditQuery::any().action("delete")).len(), 1);
    assert_eq!(
        h.audit
            .query(&AuditQuery::any().resource("menu_item"))
            .len(),
        2
    );
}

#[test]
fn every_request_reaching_the_operation_gets_exactly_one_entry() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item");

    // One success, one operation failure, one gate rejection.
    assert!(h
        .pipeline
        .execute(&config, staff_update(&["isHot"]), apply)
        .is_ok());

    let failing: Result<(), _> =
        h.pipeline
            .execute(&config, staff_update(&["isHot"]), |_, _| {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "db down"))
            });
    assert!(matches!(failing, Err(PipelineError::Operation(_))));

    let _ = h
        .pipeline
        .execute(&config, staff_update(&["price"]), apply);

    let entries = h.audit.entries();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].success);
    assert!(!entries[1].success);
}

#[test]
fn sanitize_route_drops_fields_instead_of_rejecting() {
    let h = harness();
    let config = RouteConfig::new(Role::Staff, "update", "menu_item")
        .with_field_validation_mode(FieldValidationMode::Sanitize);

    let seen = h
        .pipeline
        .execute(
            &config,
            staff_update(&["isAvailable", "price", "name"]),
            |_, fields| Ok::<_, std::io::Error>(fields.iter().cloned().collect::<Vec<_>>()),
        )
        .unwrap();

    assert_eq!(seen, vec!["isAvailable".to_string()]);
}
