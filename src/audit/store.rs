//! Audit storage backends.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::AuditEntry;

/// Error from an audit storage backend.
///
/// Backends surface their own failure detail as a message; the pipeline
/// treats any append failure as best-effort and logs it out-of-band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditStoreError {
    message: String,
}

impl AuditStoreError {
    /// Creates a backend error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "audit store error: {}", self.message)
    }
}

impl std::error::Error for AuditStoreError {}

/// Append-only audit storage.
///
/// Swappable backend: in-memory, a relational table, an external log
/// sink. Concurrent appends must not interleave partial entries;
/// ordering between entries from different requests is not required
/// (entries carry timestamps).
pub trait AuditStore: Send + Sync {
    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns an [`AuditStoreError`] when the backend cannot persist
    /// the entry. Callers must treat this as non-fatal.
    fn append(&self, entry: AuditEntry) -> Result<(), AuditStoreError>;
}

/// Filter for inspecting recorded entries.
///
/// Unset fields match everything; time bounds are inclusive `from`,
/// exclusive `until`.
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    /// Match entries for this NetID.
    pub net_id: Option<String>,
    /// Match entries with this action.
    pub action: Option<String>,
    /// Match entries for this resource kind.
    pub resource: Option<String>,
    /// Earliest timestamp to include.
    pub from: Option<DateTime<Utc>>,
    /// Timestamp at which to stop including.
    pub until: Option<DateTime<Utc>>,
}

impl AuditQuery {
    /// Matches every entry.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts to one NetID.
    pub fn net_id(mut self, net_id: impl Into<String>) -> Self {
        self.net_id = Some(net_id.into());
        self
    }

    /// Restricts to one action.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// Restricts to one resource kind.
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Restricts to entries at or after `from`.
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Restricts to entries strictly before `until`.
    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    fn matches(&self, entry: &AuditEntry) -> bool {
        self.net_id.as_deref().is_none_or(|id| entry.net_id == id)
            && self.action.as_deref().is_none_or(|a| entry.action == a)
            && self.resource.as_deref().is_none_or(|r| entry.resource == r)
            && self.from.is_none_or(|from| entry.timestamp >= from)
            && self.until.is_none_or(|until| entry.timestamp < until)
    }
}

/// Reference backend: a mutex-guarded vector.
///
/// Appends are whole-entry and serialized by the lock, so concurrent
/// writers can never interleave partial records.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded entry.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the entries matching `query`, in append order.
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect()
    }
}

impl AuditStore for InMemoryAuditStore {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditStoreError> {
        self.entries.lock().push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;
    use chrono::Duration;

    fn entry(net_id: &str, action: &str, success: bool) -> AuditEntry {
        AuditEntry::new(net_id, Role::Staff, action, "menu_item")
            .with_request("PUT", "/api/menu/1", "10.0.0.1")
            .finish(success, Some(if success { 200 } else { 403 }))
    }

    #[test]
    fn store_starts_empty() {
        let store = InMemoryAuditStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn append_preserves_entries() {
        let store = InMemoryAuditStore::new();
        store.append(entry("abc123", "update", true)).unwrap();
        store.append(entry("xyz789", "delete", false)).unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].net_id, "abc123");
        assert_eq!(entries[1].net_id, "xyz789");
    }

    #[test]
    fn query_filters_by_net_id_action_and_resource() {
        let store = InMemoryAuditStore::new();
        store.append(entry("abc123", "update", true)).unwrap();
        store.append(entry("abc123", "delete", true)).unwrap();
        store.append(entry("xyz789", "update", true)).unwrap();

        let by_user = store.query(&AuditQuery::any().net_id("abc123"));
        assert_eq!(by_user.len(), 2);

        let by_action = store.query(&AuditQuery::any().action("update"));
        assert_eq!(by_action.len(), 2);

        let combined = store.query(&AuditQuery::any().net_id("abc123").action("delete"));
        assert_eq!(combined.len(), 1);

        let none = store.query(&AuditQuery::any().resource("order"));
        assert!(none.is_empty());
    }

    #[test]
    fn query_time_range_is_half_open() {
        let store = InMemoryAuditStore::new();
        store.append(entry("abc123", "update", true)).unwrap();
        let stamp = store.entries()[0].timestamp;

        let hit = store.query(
            &AuditQuery::any()
                .from(stamp)
                .until(stamp + Duration::seconds(1)),
        );
        assert_eq!(hit.len(), 1);

        let miss = store.query(&AuditQuery::any().until(stamp));
        assert!(miss.is_empty());
    }

    #[test]
    fn concurrent_appends_never_lose_entries() {
        let store = std::sync::Arc::new(InMemoryAuditStore::new());
        let mut handles = Vec::new();
        for worker in 0..4 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..50 {
                    store
                        .append(entry(&format!("user-{worker}-{i}"), "update", true))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 200);
    }
}
