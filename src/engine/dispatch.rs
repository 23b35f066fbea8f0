//! The dispatch table and the single-step transition over it.
//!
//! ## Invariants
//!
//! - The table is built once by the flattener and never mutated afterwards;
//!   the dispatcher only holds it behind an `Arc`.
//! - `DispatchTable::index` maps a type string to its position in
//!   `DispatchTable::handlers`. The two must stay aligned.
//! - An unknown type is a no-op: the incoming state is returned as-is (moved
//!   back out, so an `Arc`-held state keeps its identity).

use super::TRACE_TARGET;
use crate::api::MillFlags;
use crate::{Action, Handler, Reducer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Flat mapping from type string to handler, in registration order.
pub struct DispatchTable<S, P> {
    handlers: Vec<(String, Handler<S, P>)>,
    index: HashMap<String, usize>,
}

impl<S, P> DispatchTable<S, P> {
    pub(crate) fn new() -> Self {
        DispatchTable { handlers: Vec::new(), index: HashMap::new() }
    }

    /// Register `handler` at `kind`.
    ///
    /// A colliding type string replaces the earlier handler in place.
    pub(crate) fn insert(&mut self, kind: String, handler: Handler<S, P>) {
        match self.index.get(&kind) {
            Some(&idx) => self.handlers[idx].1 = handler,
            None => {
                self.index.insert(kind.clone(), self.handlers.len());
                self.handlers.push((kind, handler));
            }
        }
    }

    pub fn get(&self, kind: &str) -> Option<&Handler<S, P>> {
        self.index.get(kind).map(|&idx| &self.handlers[idx].1)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.index.contains_key(kind)
    }

    /// Registered type strings, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(kind, _)| kind.as_str())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<S, P> fmt::Debug for DispatchTable<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.handlers.iter().map(|(kind, _)| (kind.as_str(), "<function>"))).finish()
    }
}

/// Looks an action's type up in the table and runs the matched handler.
pub(crate) struct Dispatcher<S, P> {
    table: Arc<DispatchTable<S, P>>,
    flags: MillFlags,
}

impl<S, P> Dispatcher<S, P>
where
    S: fmt::Debug + Send + Sync + 'static,
    P: fmt::Debug + Send + Sync + 'static,
{
    pub(crate) fn new(table: Arc<DispatchTable<S, P>>, flags: MillFlags) -> Self {
        Dispatcher { table, flags }
    }

    pub(crate) fn dispatch(&self, state: S, action: &Action<P>) -> S {
        let Some(handler) = self.table.get(&action.kind) else {
            return state;
        };

        if self.flags.contains(MillFlags::DEBUG) {
            tracing::debug!(target: TRACE_TARGET, kind = %action.kind, payload = ?action.payload, "action handled");
        }
        let next = handler(state, &action.payload, action);
        if self.flags.contains(MillFlags::STATE_DEBUG) {
            tracing::debug!(target: TRACE_TARGET, kind = %action.kind, state = ?next, "state after handler");
        }
        next
    }

    pub(crate) fn into_reducer(self) -> Reducer<S, P> {
        Arc::new(move |state: S, action: &Action<P>| self.dispatch(state, action))
    }
}
