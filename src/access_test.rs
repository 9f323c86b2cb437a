use super::*;

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_parse_round_trips_every_role() {
    for role in Role::ALL {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
    assert_eq!(Role::parse("  MANAGER "), Some(Role::Manager));
    assert_eq!(Role::parse("janitor"), None);
}

#[test]
fn only_client_is_not_staff() {
    for role in Role::ALL {
        assert_eq!(role.is_staff(), role != Role::Client, "{role}");
    }
}

#[test]
fn role_groups_partition_staff() {
    assert!(RoleGroup::Kitchen.contains(Role::Barista));
    assert!(RoleGroup::FrontDesk.contains(Role::Helper));
    assert!(RoleGroup::Managers.contains(Role::Owner));
    assert!(!RoleGroup::Managers.contains(Role::Cook));
    assert!(!RoleGroup::Staff.contains(Role::Client));
}

#[test]
fn landing_routes_per_role() {
    assert_eq!(Role::Client.landing_route(), "/dashboard");
    assert_eq!(Role::Cook.landing_route(), "/admin/kitchen/dashboard");
    assert_eq!(Role::Cashier.landing_route(), "/admin/front-desk/dashboard");
    assert_eq!(Role::Owner.landing_route(), "/admin/managers/dashboard");
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Barista).unwrap(), "\"barista\"");
}

// =============================================================================
// has_permission
// =============================================================================

#[test]
fn exact_match_is_permitted() {
    assert!(has_permission(Role::Cook, "/admin/kitchen/orders"));
    assert!(has_permission(Role::Client, "/dashboard/favorites"));
}

#[test]
fn nested_path_under_entry_is_permitted() {
    assert!(has_permission(Role::Manager, "/admin/managers/staff/42"));
    assert!(has_permission(Role::Client, "/order/abc"));
}

#[test]
fn sibling_with_shared_prefix_is_not_permitted() {
    // "/menu-secret" shares the "/menu" prefix but is not beneath it.
    assert!(!has_permission(Role::Client, "/menu-secret"));
    assert!(!has_permission(Role::Cook, "/admin/kitchen/dashboardx"));
}

#[test]
fn roles_cannot_reach_other_consoles() {
    assert!(!has_permission(Role::Cook, "/admin/managers/dashboard"));
    assert!(!has_permission(Role::Cashier, "/admin/kitchen/orders"));
    assert!(!has_permission(Role::Client, "/admin/profile"));
}

#[test]
fn owner_lacks_roadmap_but_manager_has_it() {
    assert!(has_permission(Role::Manager, "/roadmap"));
    assert!(!has_permission(Role::Owner, "/roadmap"));
}

// =============================================================================
// gate
// =============================================================================

#[test]
fn public_routes_are_allowed_anonymously() {
    assert_eq!(gate("/", None), GateDecision::Allow);
    assert_eq!(gate("/menu", None), GateDecision::Allow);
    assert_eq!(gate("/errors/forbidden", None), GateDecision::Allow);
}

#[test]
fn assets_and_api_bypass_gate() {
    assert_eq!(gate("/_next/static/chunk.js", None), GateDecision::Allow);
    assert_eq!(gate("/api/v1/expose/menu", None), GateDecision::Allow);
    assert_eq!(gate("/logo.png", None), GateDecision::Allow);
}

#[test]
fn anonymous_private_route_goes_to_login_with_redirect() {
    assert_eq!(
        gate("/admin/kitchen/orders", None),
        GateDecision::Login { location: "/authentication".into(), redirect: "/admin/kitchen/orders".into() }
    );
}

#[test]
fn unpermitted_route_redirects_to_landing() {
    assert_eq!(
        gate("/admin/managers/staff", Some(Role::Barista)),
        GateDecision::Redirect { location: "/admin/kitchen/dashboard".into() }
    );
    assert_eq!(
        gate("/admin/kitchen/dashboard", Some(Role::Client)),
        GateDecision::Redirect { location: "/dashboard".into() }
    );
}

#[test]
fn permitted_route_is_allowed() {
    assert_eq!(gate("/admin/front-desk/orders", Some(Role::Helper)), GateDecision::Allow);
}

#[test]
fn gate_decision_serializes_with_tag() {
    let json = serde_json::to_value(GateDecision::Redirect { location: "/dashboard".into() }).unwrap();
    assert_eq!(json["decision"], "redirect");
    assert_eq!(json["location"], "/dashboard");
}
