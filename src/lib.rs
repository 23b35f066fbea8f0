extern crate self as reducer_mill;

use std::fmt;
use std::sync::Arc;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;

#[cfg(test)]
mod tests;

pub use api::{Config, CreatorWrap, DispatcherWrap, HandlerWrap, Mill, MillFlags, RootState, build};
pub use engine::{ActionCreator, ActionCreators, DispatchTable, make_type};
pub use error::{Hook, MillError, NodeKind};

// --- Callables --------------------------------------------------------------

/// A state transition: `(state, payload, raw action) -> next state`.
///
/// The return value becomes the next state verbatim.
pub type Handler<S, P> = Arc<dyn Fn(S, &P, &Action<P>) -> S + Send + Sync>;

/// A whole-store transition: `(state, action) -> next state`.
pub type Reducer<S, P> = Arc<dyn Fn(S, &Action<P>) -> S + Send + Sync>;

/// Builds an [`Action`] record from a payload.
pub type CreatorFn<P> = Arc<dyn Fn(P) -> Action<P> + Send + Sync>;

// --- Action record ----------------------------------------------------------

/// The record produced by an [`ActionCreator`] and consumed by a [`Mill`].
///
/// `kind` is the type string the dispatch table is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action<P> {
    pub kind: String,
    pub payload: P,
}

impl<P> Action<P> {
    pub fn new(kind: impl Into<String>, payload: P) -> Self {
        Action { kind: kind.into(), payload }
    }
}

// --- Rule tree --------------------------------------------------------------

/// A key inside a [`RuleMap`].
///
/// Keys are normalized to strings when they are created, so the numeric key
/// `0` and the string key `"0"` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey(String);

impl RuleKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RuleKey {
    fn from(value: &str) -> Self {
        RuleKey(value.to_string())
    }
}

impl From<String> for RuleKey {
    fn from(value: String) -> Self {
        RuleKey(value)
    }
}

impl From<&String> for RuleKey {
    fn from(value: &String) -> Self {
        RuleKey(value.clone())
    }
}

macro_rules! rule_key_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for RuleKey {
                fn from(value: $t) -> Self {
                    RuleKey(value.to_string())
                }
            }
        )*
    };
}

rule_key_from_integer!(i32, i64, u8, u16, u32, u64, usize);

/// One node of a declarative rule tree.
///
/// A node is either a handler, a nested mapping (whose main-key entry is the
/// mapping's own handler), or `Nil`, which contributes nothing.
pub enum Rule<S, P> {
    Nil,
    Handler(Handler<S, P>),
    Mapping(RuleMap<S, P>),
}

impl<S, P> Rule<S, P> {
    /// Wrap a closure as a handler node.
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(S, &P, &Action<P>) -> S + Send + Sync + 'static,
    {
        Rule::Handler(Arc::new(f))
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Rule::Nil => NodeKind::Nil,
            Rule::Handler(_) => NodeKind::Handler,
            Rule::Mapping(_) => NodeKind::Mapping,
        }
    }
}

impl<S, P> Clone for Rule<S, P> {
    fn clone(&self) -> Self {
        match self {
            Rule::Nil => Rule::Nil,
            Rule::Handler(handler) => Rule::Handler(Arc::clone(handler)),
            Rule::Mapping(map) => Rule::Mapping(map.clone()),
        }
    }
}

impl<S, P> From<RuleMap<S, P>> for Rule<S, P> {
    fn from(map: RuleMap<S, P>) -> Self {
        Rule::Mapping(map)
    }
}

impl<S, P> fmt::Debug for Rule<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Nil => f.write_str("Nil"),
            Rule::Handler(_) => f.write_str("Handler(<function>)"),
            Rule::Mapping(map) => fmt::Debug::fmt(map, f),
        }
    }
}

/// Insertion-ordered mapping from [`RuleKey`] to [`Rule`].
pub struct RuleMap<S, P> {
    entries: Vec<(RuleKey, Rule<S, P>)>,
}

impl<S, P> RuleMap<S, P> {
    pub fn new() -> Self {
        RuleMap { entries: Vec::new() }
    }

    /// Insert `rule` under `key`.
    ///
    /// Re-inserting an existing key replaces its rule but keeps its position.
    pub fn insert(&mut self, key: impl Into<RuleKey>, rule: Rule<S, P>) -> &mut Self {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = rule,
            None => self.entries.push((key, rule)),
        }
        self
    }

    /// Builder form of [`RuleMap::insert`] for a handler closure.
    pub fn on<F>(mut self, key: impl Into<RuleKey>, f: F) -> Self
    where
        F: Fn(S, &P, &Action<P>) -> S + Send + Sync + 'static,
    {
        self.insert(key, Rule::handler(f));
        self
    }

    /// Builder form of [`RuleMap::insert`] for a nested mapping.
    pub fn nest(mut self, key: impl Into<RuleKey>, map: RuleMap<S, P>) -> Self {
        self.insert(key, Rule::Mapping(map));
        self
    }

    pub fn get(&self, key: impl Into<RuleKey>) -> Option<&Rule<S, P>> {
        let key = key.into();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, &Rule<S, P>)> {
        self.entries.iter().map(|(k, rule)| (k, rule))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S, P> Default for RuleMap<S, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, P> Clone for RuleMap<S, P> {
    fn clone(&self) -> Self {
        RuleMap { entries: self.entries.clone() }
    }
}

impl<S, P> fmt::Debug for RuleMap<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, rule)| (k.as_str(), rule))).finish()
    }
}
