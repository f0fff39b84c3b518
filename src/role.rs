use std::fmt;

use serde::{Deserialize, Serialize};

/// A role on the fixed access hierarchy.
///
/// Roles form a total order `Customer < Staff < Admin`. The derived
/// `Ord` implementation is the single source of truth for every
/// hierarchy decision in the crate; no gate enumerates allowed roles
/// separately, so the ordering cannot drift between call sites.
///
/// # Examples
///
/// ```
/// use menu_guard::Role;
///
/// assert!(Role::Admin > Role::Staff);
/// assert!(Role::Staff.meets(Role::Customer));
/// assert!(!Role::Customer.meets(Role::Staff));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ordinary customer; may browse and order, never mutate the menu.
    Customer,
    /// Dining staff; may toggle operational flags on menu items.
    Staff,
    /// Administrator; full control over menu content.
    Admin,
}

impl Role {
    /// Returns true if this role sits at or above `min` on the hierarchy.
    ///
    /// This is the hierarchy comparison every role gate delegates to.
    ///
    /// # Examples
    ///
    /// ```
    /// use menu_guard::Role;
    ///
    /// assert!(Role::Admin.meets(Role::Staff));
    /// assert!(Role::Staff.meets(Role::Staff));
    /// assert!(!Role::Staff.meets(Role::Admin));
    /// ```
    pub fn meets(self, min: Role) -> bool {
        self >= min
    }

    /// Returns the stable lowercase wire name for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated identity attached to a request.
///
/// Produced once per request by the surrounding web layer's principal
/// resolver (session middleware, token validation, etc.) and read-only
/// for the request's lifetime. This crate never creates or persists
/// principals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    /// Campus NetID identifying the user.
    pub net_id: String,
    /// The user's role on the access hierarchy.
    pub role: Role,
}

impl Principal {
    /// Creates a principal with the given NetID and role.
    pub fn new(net_id: impl Into<String>, role: Role) -> Self {
        Self {
            net_id: net_id.into(),
            role,
        }
    }
}
