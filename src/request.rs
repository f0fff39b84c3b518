//! Framework-agnostic request boundary types.
//!
//! The surrounding web layer adapts its own request type into a
//! [`RequestContext`] once per request, then hands it to the pipeline.
//! This module contains no framework-specific code; it holds simple,
//! owned data so any HTTP stack can build it.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::role::Principal;

/// HTTP method of an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method
    Get,
    /// HTTP POST method
    Post,
    /// HTTP PUT method
    Put,
    /// HTTP PATCH method
    Patch,
    /// HTTP DELETE method
    Delete,
}

impl HttpMethod {
    /// Returns true for state-changing methods (everything but GET).
    ///
    /// The CSRF gate only guards mutating methods; read-only requests
    /// bypass it entirely.
    pub fn is_mutating(self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Everything the pipeline knows about one request.
///
/// Built once by the web adapter and read by every gate. The only
/// mutation the pipeline itself performs is dropping payload fields in
/// sanitize mode; everything else is read-only.
///
/// Header keys are lowercased on insertion so lookups are
/// case-insensitive, matching HTTP semantics.
///
/// # Examples
///
/// ```
/// use menu_guard::{HttpMethod, Principal, RequestContext, Role};
///
/// let mut ctx = RequestContext::new(HttpMethod::Put, "/api/menu/42", "10.0.0.7");
/// ctx.set_principal(Some(Principal::new("abc123", Role::Staff)));
/// ctx.add_header("X-Requested-With", "XMLHttpRequest");
/// ctx.add_payload_field("isAvailable");
///
/// assert_eq!(ctx.header("x-requested-with"), Some("XMLHttpRequest"));
/// assert!(ctx.payload_fields().contains("isAvailable"));
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    principal: Option<Principal>,
    method: HttpMethod,
    path: String,
    payload_fields: BTreeSet<String>,
    client_address: String,
    headers: HashMap<String, String>,
}

impl RequestContext {
    /// Creates a context for a request with no principal, payload, or
    /// headers yet.
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        client_address: impl Into<String>,
    ) -> Self {
        Self {
            principal: None,
            method,
            path: path.into(),
            payload_fields: BTreeSet::new(),
            client_address: client_address.into(),
            headers: HashMap::new(),
        }
    }

    /// Sets the resolved principal.
    ///
    /// Called by the web layer after session resolution, before the
    /// pipeline runs. The pipeline only ever reads it.
    pub fn set_principal(&mut self, principal: Option<Principal>) {
        self.principal = principal;
    }

    /// Adds one field name from the request payload.
    pub fn add_payload_field(&mut self, name: impl Into<String>) {
        self.payload_fields.insert(name.into());
    }

    /// Replaces the payload field set wholesale.
    pub fn set_payload_fields(&mut self, fields: impl IntoIterator<Item = String>) {
        self.payload_fields = fields.into_iter().collect();
    }

    /// Adds a request header. Keys are lowercased for lookup.
    pub fn add_header(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Returns the resolved principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the field names present in the payload.
    pub fn payload_fields(&self) -> &BTreeSet<String> {
        &self.payload_fields
    }

    /// Returns the originating client address.
    pub fn client_address(&self) -> &str {
        &self.client_address
    }

    /// Looks up a header by case-insensitive name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the client's User-Agent header, if sent.
    pub fn user_agent(&self) -> Option<&str> {
        self.header("user-agent")
    }

    /// Drops every payload field for which `keep` returns false.
    ///
    /// Only the sanitize mode of field authorization uses this.
    pub(crate) fn retain_payload_fields(&mut self, keep: impl Fn(&str) -> bool) {
        self.payload_fields.retain(|field| keep(field));
    }
}
