//! Route table ownership and transactional updates.
//!
//! # Responsibilities
//! - Hold the single current snapshot
//! - Run parse → diff → swap for each update, all or nothing
//! - Notify subscribers after every successful swap
//!
//! # Design Decisions
//! - Readers load the snapshot pointer once (`ArcSwapOption`) and never block
//! - Writers are serialized by a mutex around parse-diff-swap
//! - Subscribers run after the writer lock is released, so they may call
//!   `lookup`, `apply` or `subscribe` themselves
//! - Under concurrent writers, events can arrive out of version order;
//!   `RoutesChanged::version` is monotonic per snapshot so consumers can drop stale ones

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use arc_swap::ArcSwapOption;
use serde::Serialize;

use crate::routing::attributes::RequestAttributes;
use crate::routing::diff::{diff, DeltaSummary};
use crate::routing::error::RouteError;
use crate::routing::parser::{parse_routes, PayloadFormat};
use crate::routing::snapshot::RouteTableSnapshot;
use crate::routing::spec::RouteSpec;

/// Lifecycle of the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerState {
    /// No snapshot yet; every lookup misses.
    Empty,
    /// Serving a snapshot.
    Ready,
    /// A validated snapshot is being published.
    Updating,
}

impl ManagerState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => ManagerState::Ready,
            2 => ManagerState::Updating,
            _ => ManagerState::Empty,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ManagerState::Empty => 0,
            ManagerState::Ready => 1,
            ManagerState::Updating => 2,
        }
    }
}

/// Event delivered to subscribers after a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutesChanged {
    /// Version of the snapshot just published.
    pub version: u64,
    /// Number of routes in that snapshot.
    pub route_count: usize,
    /// Identifier of the payload source.
    pub source: String,
    pub delta: DeltaSummary,
}

/// Handle returned by [`RouteTableManager::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&RoutesChanged) + Send + Sync>;

/// Owns the route table and applies updates to it.
pub struct RouteTableManager {
    current: ArcSwapOption<RouteTableSnapshot>,
    writer: Mutex<()>,
    state: AtomicU8,
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

impl RouteTableManager {
    /// Create a manager with no routes.
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
            writer: Mutex::new(()),
            state: AtomicU8::new(ManagerState::Empty.as_u8()),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
        }
    }

    /// Apply a JSON route payload.
    ///
    /// Returns the version now being served.
    pub fn apply(&self, raw: impl AsRef<[u8]>) -> Result<u64, RouteError> {
        self.apply_from(raw.as_ref(), PayloadFormat::Json, "direct")
    }

    /// Apply a payload in the given format, attributing it to `source`.
    ///
    /// On error nothing changes. A payload identical to the current table
    /// (same routes, same order) returns the current version without
    /// notifying subscribers.
    pub fn apply_from(
        &self,
        raw: &[u8],
        format: PayloadFormat,
        source: &str,
    ) -> Result<u64, RouteError> {
        let event = {
            let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

            let parsed = parse_routes(raw, format).map_err(|e| {
                tracing::warn!(
                    source = %source,
                    kind = %e.kind(),
                    error = %e,
                    "Route update rejected, keeping current table"
                );
                e
            })?;

            let current = self.current.load_full();
            let previous = current.as_deref();
            let delta = diff(previous.map_or(&[][..], |s| s.routes()), &parsed);

            if let Some(prev) = previous {
                if delta.is_noop() {
                    tracing::debug!(
                        source = %source,
                        version = prev.version(),
                        "Route payload unchanged"
                    );
                    return Ok(prev.version());
                }
            }

            self.set_state(ManagerState::Updating);
            let next = RouteTableSnapshot::next(
                previous,
                &delta,
                parsed.iter().map(|r| r.id.as_str()),
            );
            let event = RoutesChanged {
                version: next.version(),
                route_count: next.len(),
                source: source.to_string(),
                delta: delta.summary(),
            };
            self.current.store(Some(Arc::new(next)));
            self.set_state(ManagerState::Ready);

            tracing::info!(
                source = %source,
                version = event.version,
                routes = event.route_count,
                added = event.delta.added.len(),
                removed = event.delta.removed.len(),
                updated = event.delta.updated.len(),
                reordered = delta.reordered,
                "Route table updated"
            );
            event
        };

        self.notify(&event);
        Ok(event.version)
    }

    /// Find the route for a request in the current snapshot.
    ///
    /// Fails closed: `None` while no snapshot has been published.
    pub fn lookup(&self, req: &RequestAttributes) -> Option<Arc<RouteSpec>> {
        let guard = self.current.load();
        guard.as_deref()?.lookup(req).cloned()
    }

    /// Register a callback for every successful swap.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RoutesChanged) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(sub, _)| *sub != id);
        subscribers.len() != before
    }

    /// The snapshot currently being served.
    pub fn snapshot(&self) -> Option<Arc<RouteTableSnapshot>> {
        self.current.load_full()
    }

    /// Version currently being served (0 before the first update).
    pub fn version(&self) -> u64 {
        self.current.load().as_deref().map_or(0, |s| s.version())
    }

    pub fn state(&self) -> ManagerState {
        ManagerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ManagerState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn notify(&self, event: &RoutesChanged) {
        let callbacks: Vec<(SubscriptionId, Callback)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, cb)| (*id, Arc::clone(cb)))
            .collect();

        for (id, callback) in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::error!(
                    subscription = id.0,
                    version = event.version,
                    "Route change subscriber panicked"
                );
            }
        }
    }
}

impl Default for RouteTableManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RouteTableManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTableManager")
            .field("state", &self.state())
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

/// A shared reference to the route table manager.
pub type SharedRouteTable = Arc<RouteTableManager>;
