//! Property tests for the pipeline's cross-module invariants.

use std::collections::BTreeSet;
use std::sync::Arc;

use menu_guard::audit::InMemoryAuditStore;
use menu_guard::{
    allowed_fields, all_fields, ErrorCode, FieldName, HttpMethod, InMemoryRateLimitStore,
    Pipeline, Principal, RateLimitConfig, RequestContext, Role, RouteConfig,
    ADMIN_ONLY_FIELDS, STAFF_FIELDS,
};
use proptest::prelude::*;

fn arb_role() -> impl Strategy<Value = Role> {
    prop_oneof![Just(Role::Customer), Just(Role::Staff), Just(Role::Admin)]
}

fn arb_principal() -> impl Strategy<Value = Principal> {
    (prop::string::string_regex("[a-z]{2,6}[0-9]{1,4}").unwrap(), arb_role())
        .prop_map(|(net_id, role)| Principal::new(net_id, role))
}

fn arb_known_field() -> impl Strategy<Value = FieldName> {
    prop::sample::select(all_fields().collect::<Vec<_>>())
}

proptest! {
    /// Property: the hierarchy is monotone. Whoever meets a higher
    /// threshold also meets every lower one.
    #[test]
    fn proptest_hierarchy_monotonicity(role in arb_role()) {
        if role.meets(Role::Admin) {
            prop_assert!(role.meets(Role::Staff));
        }
        if role.meets(Role::Staff) {
            prop_assert!(role.meets(Role::Customer));
        }
    }

    /// Property: a role's allowed field set grows with the hierarchy,
    /// and Admin's is exactly the union of Staff's and the admin-only
    /// set.
    #[test]
    fn proptest_allowed_fields_grow_with_role(role in arb_role()) {
        let allowed: BTreeSet<_> = allowed_fields(role).into_iter().collect();
        let staff: BTreeSet<_> = STAFF_FIELDS.iter().copied().collect();
        let admin_only: BTreeSet<_> = ADMIN_ONLY_FIELDS.iter().copied().collect();

        match role {
            Role::Customer => prop_assert!(allowed.is_empty()),
            Role::Staff => prop_assert_eq!(allowed, staff),
            Role::Admin => {
                prop_assert_eq!(
                    allowed,
                    staff.union(&admin_only).copied().collect::<BTreeSet<_>>()
                );
            }
        }
    }

    /// Property: an unauthenticated request is always answered 401,
    /// regardless of payload or method - authentication runs first.
    #[test]
    fn proptest_missing_principal_always_yields_401(
        fields in prop::collection::vec("[a-zA-Z]{1,12}", 0..5),
        mutating in any::<bool>()
    ) {
        let pipeline = Pipeline::new(
            Arc::new(InMemoryRateLimitStore::new()),
            Arc::new(InMemoryAuditStore::new()),
        );
        let config = RouteConfig::new(Role::Staff, "update", "menu_item");

        let method = if mutating { HttpMethod::Put } else { HttpMethod::Get };
        let mut ctx = RequestContext::new(method, "/api/menu/1", "10.0.0.1");
        ctx.set_payload_fields(fields);

        let err = pipeline
            .execute(&config, ctx, |_, _| Ok::<_, std::io::Error>(()))
            .unwrap_err();
        let rejection = err.rejection().expect("gate rejection");
        prop_assert_eq!(rejection.status, 401);
        prop_assert_eq!(rejection.code, ErrorCode::AuthRequired);
    }

    /// Property: the limiter allows exactly `max` requests per key per
    /// window, no matter how many arrive.
    #[test]
    fn proptest_limiter_never_exceeds_quota(
        max in 1u32..10,
        attempts in 1usize..30,
        principal in arb_principal(),
        field in arb_known_field()
    ) {
        // Admin passes field authorization for any known field; lower
        // roles are capped to their own allowlist, so pin Admin here -
        // this property is about the limiter, not field policy.
        let principal = Principal::new(principal.net_id, Role::Admin);
        let pipeline = Pipeline::new(
            Arc::new(InMemoryRateLimitStore::new()),
            Arc::new(InMemoryAuditStore::new()),
        );
        let config = RouteConfig::new(Role::Customer, "update", "menu_item")
            .with_rate_limit(RateLimitConfig::new(60_000, max));

        let mut allowed = 0u32;
        for _ in 0..attempts {
            let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/1", "10.0.0.1");
            ctx.set_principal(Some(principal.clone()));
            ctx.add_header("x-requested-with", "XMLHttpRequest");
            ctx.add_payload_field(field.as_str());

            match pipeline.execute(&config, ctx, |_, _| Ok::<_, std::io::Error>(())) {
                Ok(()) => allowed += 1,
                Err(err) => {
                    let rejection = err.rejection().expect("gate rejection");
                    prop_assert_eq!(rejection.code, ErrorCode::RateLimitExceeded);
                }
            }
        }
        prop_assert_eq!(allowed, max.min(attempts as u32));
    }

    /// Property: whatever single known field a principal submits, the
    /// pipeline's verdict agrees with the role's allowed set.
    #[test]
    fn proptest_field_verdict_matches_allowlist(
        principal in arb_principal(),
        field in arb_known_field()
    ) {
        let pipeline = Pipeline::new(
            Arc::new(InMemoryRateLimitStore::new()),
            Arc::new(InMemoryAuditStore::new()),
        );
        let config = RouteConfig::new(Role::Customer, "update", "menu_item");

        let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/1", "10.0.0.1");
        ctx.set_principal(Some(principal.clone()));
        ctx.add_header("x-requested-with", "XMLHttpRequest");
        ctx.add_payload_field(field.as_str());

        let result = pipeline.execute(&config, ctx, |_, _| Ok::<_, std::io::Error>(()));
        let permitted = allowed_fields(principal.role).contains(&field);
        prop_assert_eq!(result.is_ok(), permitted);
    }
}
