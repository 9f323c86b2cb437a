//! Roles and route gating.
//!
//! DESIGN
//! ======
//! Each role maps to a static whitelist of route prefixes. Navigation is
//! allowed when the path equals a whitelisted entry or sits beneath one
//! (`entry + "/"` is a prefix). Public pages and asset paths bypass the
//! table entirely. Unauthenticated visitors are sent to the login page with
//! the original path preserved; authenticated users who stray outside their
//! whitelist are sent to their role's landing dashboard.
//!
//! The same role groups gate the secure API (see `routes::auth::AuthUser`).

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// ROLES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Cashier,
    Helper,
    Cook,
    Barista,
    Manager,
    Owner,
}

impl Role {
    pub const ALL: [Role; 7] =
        [Self::Client, Self::Cashier, Self::Helper, Self::Cook, Self::Barista, Self::Manager, Self::Owner];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Cashier => "cashier",
            Self::Helper => "helper",
            Self::Cook => "cook",
            Self::Barista => "barista",
            Self::Manager => "manager",
            Self::Owner => "owner",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "client" => Some(Self::Client),
            "cashier" => Some(Self::Cashier),
            "helper" => Some(Self::Helper),
            "cook" => Some(Self::Cook),
            "barista" => Some(Self::Barista),
            "manager" => Some(Self::Manager),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_staff(self) -> bool {
        RoleGroup::Staff.contains(self)
    }

    /// Dashboard a role lands on after login or a denied navigation.
    #[must_use]
    pub fn landing_route(self) -> &'static str {
        match self {
            Self::Client => "/dashboard",
            Self::Cook | Self::Barista => "/admin/kitchen/dashboard",
            Self::Cashier | Self::Helper => "/admin/front-desk/dashboard",
            Self::Manager | Self::Owner => "/admin/managers/dashboard",
        }
    }

    #[must_use]
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            Self::Client => CLIENT_ROUTES,
            Self::Cook | Self::Barista => KITCHEN_ROUTES,
            Self::Cashier | Self::Helper => FRONT_DESK_ROUTES,
            Self::Manager => MANAGER_ROUTES,
            Self::Owner => OWNER_ROUTES,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named sets of roles used to guard API handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGroup {
    Staff,
    Kitchen,
    FrontDesk,
    Managers,
}

impl RoleGroup {
    #[must_use]
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::Staff => &[Role::Cashier, Role::Helper, Role::Cook, Role::Barista, Role::Manager, Role::Owner],
            Self::Kitchen => &[Role::Cook, Role::Barista],
            Self::FrontDesk => &[Role::Cashier, Role::Helper],
            Self::Managers => &[Role::Manager, Role::Owner],
        }
    }

    #[must_use]
    pub fn contains(self, role: Role) -> bool {
        self.roles().contains(&role)
    }
}

// =============================================================================
// PERMISSION TABLE
// =============================================================================

const CLIENT_ROUTES: &[&str] = &[
    "/dashboard",
    "/dashboard/profile",
    "/dashboard/favorites",
    "/dashboard/addresses",
    "/dashboard/payment",
    "/dashboard/settings",
    "/menu",
    "/order",
    "/about",
    "/contact",
    "/careers",
    "/mood-board",
    "/roadmap",
];

const KITCHEN_ROUTES: &[&str] = &[
    "/menu",
    "/order",
    "/about",
    "/contact",
    "/careers",
    "/mood-board",
    "/roadmap",
    "/admin/kitchen/dashboard",
    "/admin/kitchen/orders",
    "/admin/kitchen/menu",
    "/admin/kitchen/inventory",
    "/admin/help",
    "/admin/manual",
    "/admin/profile",
    "/admin/settings",
];

const FRONT_DESK_ROUTES: &[&str] = &[
    "/menu",
    "/order",
    "/about",
    "/contact",
    "/careers",
    "/mood-board",
    "/roadmap",
    "/admin/front-desk/dashboard",
    "/admin/front-desk/inventory",
    "/admin/front-desk/orders",
    "/admin/front-desk/reservations",
    "/admin/help",
    "/admin/manual",
    "/admin/profile",
    "/admin/settings",
];

const MANAGER_ROUTES: &[&str] = &[
    "/menu",
    "/order",
    "/about",
    "/contact",
    "/careers",
    "/mood-board",
    "/roadmap",
    "/admin/managers/dashboard",
    "/admin/managers/staff",
    "/admin/managers/inventory",
    "/admin/managers/orders",
    "/admin/managers/menu",
    "/admin/managers/customers",
    "/admin/managers/analytics",
    "/admin/managers/performance",
    "/admin/reports",
    "/admin/help",
    "/admin/requests",
    "/admin/manual",
    "/admin/settings",
    "/admin/profile",
];

// Owners share the manager console but not the marketing extras.
const OWNER_ROUTES: &[&str] = &[
    "/menu",
    "/order",
    "/about",
    "/contact",
    "/careers",
    "/admin/managers/dashboard",
    "/admin/managers/staff",
    "/admin/managers/inventory",
    "/admin/managers/orders",
    "/admin/managers/menu",
    "/admin/managers/customers",
    "/admin/managers/analytics",
    "/admin/managers/performance",
    "/admin/reports",
    "/admin/help",
    "/admin/requests",
    "/admin/manual",
    "/admin/settings",
    "/admin/profile",
];

pub const PUBLIC_ROUTES: &[&str] = &[
    "/",
    "/about",
    "/contact",
    "/careers",
    "/menu",
    "/mood-board",
    "/roadmap",
    "/authentication",
    "/errors/backend-down",
    "/errors/forbidden",
    "/errors/maintenance",
];

pub const LOGIN_ROUTE: &str = "/authentication";

const BYPASS_PREFIXES: &[&str] = &["/_next", "/api", "/static"];

/// Whether `role` may navigate to `path`.
#[must_use]
pub fn has_permission(role: Role, path: &str) -> bool {
    role.permissions()
        .iter()
        .any(|&allowed| path == allowed || path.strip_prefix(allowed).is_some_and(|rest| rest.starts_with('/')))
}

fn is_public(path: &str) -> bool {
    PUBLIC_ROUTES.contains(&path)
        || BYPASS_PREFIXES.iter().any(|p| path.starts_with(p))
        || path.contains('.')
}

// =============================================================================
// GATE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GateDecision {
    Allow,
    /// Not signed in: go to login and come back to `redirect` afterwards.
    Login { location: String, redirect: String },
    /// Signed in but not permitted: go to the role's dashboard.
    Redirect { location: String },
}

/// Decide what happens when a visitor with `role` navigates to `path`.
#[must_use]
pub fn gate(path: &str, role: Option<Role>) -> GateDecision {
    if is_public(path) {
        return GateDecision::Allow;
    }
    let Some(role) = role else {
        return GateDecision::Login { location: LOGIN_ROUTE.to_owned(), redirect: path.to_owned() };
    };
    if has_permission(role, path) {
        GateDecision::Allow
    } else {
        GateDecision::Redirect { location: role.landing_route().to_owned() }
    }
}

#[cfg(test)]
#[path = "access_test.rs"]
mod tests;
