//! Fixed-window rate limiting over an injected counter store.
//!
//! The algorithm is a fixed window, not sliding and not token-bucket:
//! each key owns a counter and a reset timestamp; the window resets
//! wholesale when it elapses. The store performs the whole
//! read-modify-write for a key inside one call so two concurrent
//! requests can never both observe `count == max - 1` and both pass.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::error::Rejection;
use crate::request::RequestContext;

/// Source of the current time in unix milliseconds.
///
/// Injected so tests can drive the window deterministically.
pub trait Clock: Send + Sync {
    /// Milliseconds since the unix epoch.
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Per-key counter state for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests observed in the current window, this one included.
    pub count: u32,
    /// Unix-millisecond timestamp at which the window resets.
    pub window_reset_at_ms: u64,
}

/// Shared counter store for the rate limiter.
///
/// `record` is the single atomic read-modify-write per request: it
/// creates, resets, or increments the key's entry and returns the
/// post-update snapshot. Implementations must serialize updates to a
/// given key; a lost update silently under-counts and is an exploitable
/// bug, not a performance detail. A distributed backend (anything with
/// an atomic increment) is a valid substitution.
pub trait RateLimitStore: Send + Sync {
    /// Applies one request to `key`'s window and returns the resulting
    /// entry.
    ///
    /// If no entry exists, or `now_ms` has reached the entry's reset
    /// time, the entry becomes `{count: 1, reset: now + window}`;
    /// otherwise the count increments.
    fn record(&self, key: &str, now_ms: u64, window_ms: u64) -> RateLimitEntry;
}

/// Process-local counter store.
///
/// Entries are ephemeral: a restart clears every counter. That is an
/// accepted tradeoff of the reference design; swap the store for a
/// shared backend when counters must survive restarts or span
/// processes.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl InMemoryRateLimitStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn record(&self, key: &str, now_ms: u64, window_ms: u64) -> RateLimitEntry {
        // One lock spans the whole read-modify-write; concurrent calls
        // for the same key serialize here.
        let mut entries = self.entries.lock();
        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if now_ms >= entry.window_reset_at_ms {
                    entry.count = 1;
                    entry.window_reset_at_ms = now_ms + window_ms;
                } else {
                    entry.count += 1;
                }
            })
            .or_insert(RateLimitEntry {
                count: 1,
                window_reset_at_ms: now_ms + window_ms,
            });
        *entry
    }
}

/// How the limiter derives the counter key from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStrategy {
    /// Principal NetID, falling back to the client address when the
    /// request is unauthenticated.
    #[default]
    PrincipalNetId,
    /// Always the originating client address.
    ClientAddress,
}

/// Per-route rate-limit settings.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Requests allowed per key per window.
    pub max_requests: u32,
    /// Key derivation strategy.
    pub key: KeyStrategy,
}

impl RateLimitConfig {
    /// Creates a config with the default NetID key strategy.
    pub fn new(window_ms: u64, max_requests: u32) -> Self {
        Self {
            window_ms,
            max_requests,
            key: KeyStrategy::default(),
        }
    }

    /// Overrides the key derivation strategy.
    pub fn keyed_by(mut self, key: KeyStrategy) -> Self {
        self.key = key;
        self
    }
}

impl Default for RateLimitConfig {
    /// 30 requests per minute, keyed by NetID.
    fn default() -> Self {
        Self::new(60_000, 30)
    }
}

/// Applies a [`RateLimitConfig`] to requests against a shared store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Creates a limiter backed by the given store.
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Records this request and rejects it once the window's quota is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns a 429 [`Rejection`] with `retryAfter` (whole seconds,
    /// rounded up) when the key has exceeded `max_requests` in the
    /// current window.
    pub fn check(
        &self,
        config: &RateLimitConfig,
        ctx: &RequestContext,
        now_ms: u64,
    ) -> Result<(), Rejection> {
        let key = match config.key {
            KeyStrategy::PrincipalNetId => ctx
                .principal()
                .map(|principal| principal.net_id.as_str())
                .unwrap_or_else(|| ctx.client_address()),
            KeyStrategy::ClientAddress => ctx.client_address(),
        };

        let entry = self.store.record(key, now_ms, config.window_ms);
        if entry.count > config.max_requests {
            let remaining_ms = entry.window_reset_at_ms.saturating_sub(now_ms);
            let retry_after = remaining_ms.div_ceil(1000);
            tracing::warn!(key, count = entry.count, retry_after, "rate limit exceeded");
            return Err(Rejection::rate_limit_exceeded(retry_after));
        }
        Ok(())
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
