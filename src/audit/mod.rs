//! Append-only audit trail for the request pipeline.
//!
//! This module provides:
//! - `AuditEntry`: the append-only record schema
//! - `AuditStore`: the swappable storage backend interface
//! - `InMemoryAuditStore`: reference backend with a query surface
//! - `AuditRecorder`: best-effort recorder that never blocks a response
//!
//! Entries are created exactly once per terminal outcome and never
//! mutated. Retention and rotation belong to the storage backend, not
//! to this module.

mod entry;
mod recorder;
mod store;

pub use entry::{AuditEntry, AuditEntryBuilder};
pub use recorder::AuditRecorder;
pub use store::{AuditQuery, AuditStore, AuditStoreError, InMemoryAuditStore};
