//! Audit record schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::Role;

/// One append-only audit record.
///
/// Created exactly once per request that reaches the recorder and never
/// mutated afterwards. Causality between entries is tracked through
/// `timestamp`, not append order.
///
/// # Example
///
/// ```
/// use menu_guard::audit::AuditEntry;
/// use menu_guard::Role;
///
/// let entry = AuditEntry::new("abc123", Role::Staff, "update", "menu_item")
///     .with_resource_id("42")
///     .with_request("PUT", "/api/menu/42", "10.0.0.7")
///     .with_changes(vec!["isAvailable".to_string()])
///     .finish(true, Some(200));
///
/// assert!(entry.success);
/// assert_eq!(entry.changes.as_deref(), Some(&["isAvailable".to_string()][..]));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// When the terminal outcome was recorded.
    pub timestamp: DateTime<Utc>,
    /// NetID of the acting principal (`"anonymous"` for rejected
    /// unauthenticated requests logged by a failure-logging recorder).
    pub net_id: String,
    /// Role of the acting principal.
    pub role: Role,
    /// Logical action, e.g. `"update"` or `"delete"`.
    pub action: String,
    /// Resource kind, e.g. `"menu_item"`.
    pub resource: String,
    /// Specific resource identifier, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// HTTP method of the request.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Originating client address.
    pub ip: String,
    /// Client User-Agent, when sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Field names applied by a successful mutation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<Vec<String>>,
    /// Whether the protected operation (or chain) succeeded. Never
    /// ambiguous: a request whose outcome is unknown is recorded as
    /// `false`.
    pub success: bool,
    /// HTTP status of the outcome, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Builder for an [`AuditEntry`]; `finish` stamps the outcome.
#[derive(Debug, Clone)]
pub struct AuditEntryBuilder {
    entry: AuditEntry,
}

impl AuditEntry {
    /// Starts a builder with the identifying fields.
    pub fn new(
        net_id: impl Into<String>,
        role: Role,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> AuditEntryBuilder {
        AuditEntryBuilder {
            entry: AuditEntry {
                timestamp: Utc::now(),
                net_id: net_id.into(),
                role,
                action: action.into(),
                resource: resource.into(),
                resource_id: None,
                method: String::new(),
                path: String::new(),
                ip: String::new(),
                user_agent: None,
                changes: None,
                success: false,
                status_code: None,
            },
        }
    }
}

impl AuditEntryBuilder {
    /// Sets the specific resource identifier.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.entry.resource_id = Some(resource_id.into());
        self
    }

    /// Sets the transport details of the request being audited.
    pub fn with_request(
        mut self,
        method: impl Into<String>,
        path: impl Into<String>,
        ip: impl Into<String>,
    ) -> Self {
        self.entry.method = method.into();
        self.entry.path = path.into();
        self.entry.ip = ip.into();
        self
    }

    /// Sets the client User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.entry.user_agent = Some(user_agent.into());
        self
    }

    /// Records the field names a successful mutation applied.
    pub fn with_changes(mut self, changes: Vec<String>) -> Self {
        self.entry.changes = Some(changes);
        self
    }

    /// Stamps the terminal outcome and returns the immutable entry.
    pub fn finish(mut self, success: bool, status_code: Option<u16>) -> AuditEntry {
        self.entry.success = success;
        self.entry.status_code = status_code;
        self.entry
    }
}
