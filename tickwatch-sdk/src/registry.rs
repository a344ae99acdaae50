//! Identifier to handler interning.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::handler::{TimingHandler, TimingsState};
use crate::identifier::TimingIdentifier;

#[derive(Debug, Default)]
struct RegistryInner {
    by_id: HashMap<Arc<TimingIdentifier>, Arc<TimingHandler>>,
    ordered: Vec<Arc<TimingHandler>>,
}

/// Interning cache mapping each identifier to exactly one handler.
///
/// Lookups of an already-interned identifier only take the read lock, so
/// they never contend with each other. Insertion takes the write lock, and
/// registry-wide sweeps hold the read lock for their whole pass, which keeps
/// sweeps and insertions mutually exclusive.
#[derive(Debug)]
pub struct TimingRegistry {
    inner: RwLock<RegistryInner>,
    state: Arc<TimingsState>,
    created: AtomicUsize,
}

impl TimingRegistry {
    pub(crate) fn new(state: Arc<TimingsState>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            state,
            created: AtomicUsize::new(0),
        }
    }

    /// Get or create the handler for an identifier.
    pub fn get_or_create(&self, id: TimingIdentifier) -> Arc<TimingHandler> {
        self.intern(id, false)
    }

    /// Get or create a handler the tick sweep must skip.
    ///
    /// The special flag only applies when this call creates the handler.
    pub(crate) fn get_or_create_special(&self, id: TimingIdentifier) -> Arc<TimingHandler> {
        self.intern(id, true)
    }

    fn intern(&self, id: TimingIdentifier, special: bool) -> Arc<TimingHandler> {
        // Fast path: check if it exists
        {
            let inner = self.inner.read();
            if let Some(handler) = inner.by_id.get(&id) {
                return handler.clone();
            }
        }

        // Slow path: create it
        // Double-check after acquiring write lock
        let mut inner = self.inner.write();
        if let Some(handler) = inner.by_id.get(&id) {
            return handler.clone();
        }

        let id = Arc::new(id);
        let handler = TimingHandler::new(id.clone(), special, self.state.clone());
        inner.by_id.insert(id, handler.clone());
        inner.ordered.push(handler.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        handler
    }

    /// Look up a handler without creating it.
    pub fn get(&self, id: &TimingIdentifier) -> Option<Arc<TimingHandler>> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// Visit every handler in registration order.
    ///
    /// Insertions block until the visit completes.
    pub fn for_each(&self, mut f: impl FnMut(&TimingHandler)) {
        let inner = self.inner.read();
        for handler in inner.ordered.iter() {
            f(handler);
        }
    }

    /// All handlers in registration order.
    pub fn handlers(&self) -> Vec<Arc<TimingHandler>> {
        self.inner.read().ordered.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handlers ever constructed by this registry.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}
