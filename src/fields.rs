//! Menu-item field schema and per-role allowlists.
//!
//! Two fixed sets exist in this domain: the operational flags staff may
//! toggle and the content fields reserved for admins. The sets are
//! disjoint; their union is the authoritative payload schema. Admin's
//! allowed set is always derived as the union rather than enumerated a
//! second time, so the two representations cannot drift.

use std::fmt;

use crate::role::Role;

/// A known menu-item field, identified by its stable wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldName {
    /// `isAvailable` - whether the item is currently orderable.
    IsAvailable,
    /// `isHot` - whether the item is served hot.
    IsHot,
    /// `name` - display name.
    Name,
    /// `description` - long-form description.
    Description,
    /// `category` - menu section.
    Category,
    /// `price` - unit price.
    Price,
    /// `imageUrl` - item photo location.
    ImageUrl,
    /// `modifiers` - selectable customizations.
    Modifiers,
    /// `dietaryInfo` - allergen and dietary labels.
    DietaryInfo,
}

/// Fields staff may set: day-to-day operational toggles.
pub const STAFF_FIELDS: [FieldName; 2] = [FieldName::IsAvailable, FieldName::IsHot];

/// Fields only admins may set: menu content and pricing.
pub const ADMIN_ONLY_FIELDS: [FieldName; 7] = [
    FieldName::Name,
    FieldName::Description,
    FieldName::Category,
    FieldName::Price,
    FieldName::ImageUrl,
    FieldName::Modifiers,
    FieldName::DietaryInfo,
];

impl FieldName {
    /// Returns the stable wire name for this field.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldName::IsAvailable => "isAvailable",
            FieldName::IsHot => "isHot",
            FieldName::Name => "name",
            FieldName::Description => "description",
            FieldName::Category => "category",
            FieldName::Price => "price",
            FieldName::ImageUrl => "imageUrl",
            FieldName::Modifiers => "modifiers",
            FieldName::DietaryInfo => "dietaryInfo",
        }
    }

    /// Parses a wire name into a known field.
    ///
    /// Matching is exact and case-sensitive; anything else is an unknown
    /// field and belongs in a schema rejection.
    pub fn parse(name: &str) -> Option<FieldName> {
        all_fields().find(|field| field.as_str() == name)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Iterates the authoritative schema: every known field, staff set first.
pub fn all_fields() -> impl Iterator<Item = FieldName> {
    STAFF_FIELDS.iter().chain(ADMIN_ONLY_FIELDS.iter()).copied()
}

/// Returns the fields a role is allowed to set.
///
/// Admin's set is the union of the staff set and the admin-only set
/// (capability inheritance); Customer may set nothing.
///
/// # Examples
///
/// ```
/// use menu_guard::{allowed_fields, Role};
///
/// assert!(allowed_fields(Role::Customer).is_empty());
/// assert_eq!(allowed_fields(Role::Staff).len(), 2);
/// assert_eq!(allowed_fields(Role::Admin).len(), 9);
/// ```
pub fn allowed_fields(role: Role) -> Vec<FieldName> {
    match role {
        Role::Customer => Vec::new(),
        Role::Staff => STAFF_FIELDS.to_vec(),
        Role::Admin => all_fields().collect(),
    }
}
