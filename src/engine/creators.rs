//! Action creator synthesis.
//!
//! Walks a rule tree and builds a fresh tree of [`ActionCreator`]s with the
//! same shape. The rule tree itself is left untouched.
//!
//! - Every key gets a creator whose type string is `make_type(prefix, divider, key)`.
//! - A creator built for a mapping carries the mapping's children as its own
//!   children; the mapping's main-key slot is dropped (its handler already
//!   lives in the dispatch table under the mapping's type).
//! - Main-key slots are dropped at the root level too.
//! - `creator_wrap` sees creators in pre-order: a parent before its children.
//!
//! A creator stands in for its type string: it implements `Display`,
//! `AsRef<str>` and compares equal to `str`/`String` holding that type.

use super::TRACE_TARGET;
use super::naming::make_type;
use crate::api::Config;
use crate::{Action, CreatorFn, Hook, MillError, Rule, RuleKey, RuleMap};
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// Builds [`Action`] records of one type; may have nested creators.
pub struct ActionCreator<P> {
    type_string: String,
    create: CreatorFn<P>,
    children: ActionCreators<P>,
}

impl<P> ActionCreator<P> {
    /// Build the action record for `payload`.
    pub fn create(&self, payload: P) -> Action<P> {
        (self.create)(payload)
    }

    /// The type string this creator stamps on its actions.
    pub fn type_string(&self) -> &str {
        &self.type_string
    }

    pub fn as_str(&self) -> &str {
        &self.type_string
    }

    /// The underlying callable, e.g. to hand out to code that only needs `Fn(P) -> Action<P>`.
    pub fn creator_fn(&self) -> CreatorFn<P> {
        Arc::clone(&self.create)
    }

    pub fn get(&self, key: impl Into<RuleKey>) -> Option<&ActionCreator<P>> {
        self.children.get(key)
    }

    pub fn children(&self) -> &ActionCreators<P> {
        &self.children
    }
}

impl<P> fmt::Display for ActionCreator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_string)
    }
}

impl<P> fmt::Debug for ActionCreator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() {
            f.debug_tuple("ActionCreator").field(&self.type_string).finish()
        } else {
            f.debug_struct("ActionCreator")
                .field("type", &self.type_string)
                .field("children", &self.children)
                .finish()
        }
    }
}

impl<P> AsRef<str> for ActionCreator<P> {
    fn as_ref(&self) -> &str {
        &self.type_string
    }
}

impl<P> PartialEq<str> for ActionCreator<P> {
    fn eq(&self, other: &str) -> bool {
        self.type_string == other
    }
}

impl<P> PartialEq<&str> for ActionCreator<P> {
    fn eq(&self, other: &&str) -> bool {
        self.type_string == *other
    }
}

impl<P> PartialEq<String> for ActionCreator<P> {
    fn eq(&self, other: &String) -> bool {
        self.type_string == *other
    }
}

impl<P> PartialEq<ActionCreator<P>> for &str {
    fn eq(&self, other: &ActionCreator<P>) -> bool {
        *self == other.type_string
    }
}

impl<P> PartialEq<ActionCreator<P>> for String {
    fn eq(&self, other: &ActionCreator<P>) -> bool {
        *self == other.type_string
    }
}

impl<P, K: Into<RuleKey>> Index<K> for ActionCreator<P> {
    type Output = ActionCreator<P>;

    fn index(&self, key: K) -> &Self::Output {
        &self.children[key]
    }
}

/// One level of the creator tree, in rule-tree order.
pub struct ActionCreators<P> {
    entries: Vec<(RuleKey, ActionCreator<P>)>,
}

impl<P> ActionCreators<P> {
    pub fn get(&self, key: impl Into<RuleKey>) -> Option<&ActionCreator<P>> {
        let key = key.into();
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, creator)| creator)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RuleKey, &ActionCreator<P>)> {
        self.entries.iter().map(|(k, creator)| (k, creator))
    }

    /// Every creator below this level, parents before their children.
    pub fn walk(&self) -> Vec<&ActionCreator<P>> {
        let mut out = Vec::new();
        let mut stack: Vec<&ActionCreator<P>> = self.entries.iter().rev().map(|(_, c)| c).collect();
        while let Some(creator) = stack.pop() {
            out.push(creator);
            stack.extend(creator.children.entries.iter().rev().map(|(_, c)| c));
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<P> Default for ActionCreators<P> {
    fn default() -> Self {
        ActionCreators { entries: Vec::new() }
    }
}

impl<P, K: Into<RuleKey>> Index<K> for ActionCreators<P> {
    type Output = ActionCreator<P>;

    /// # Panics
    ///
    /// Panics if there is no creator under `key`.
    fn index(&self, key: K) -> &Self::Output {
        let key = key.into();
        match self.get(key.clone()) {
            Some(creator) => creator,
            None => panic!("no action creator under key `{key}`"),
        }
    }
}

impl<P> fmt::Debug for ActionCreators<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter().map(|(k, c)| (k.as_str(), c))).finish()
    }
}

/// Build the creator tree mirroring `map`, rooted at `prefix`.
pub(crate) fn synthesize<S, P>(
    map: &RuleMap<S, P>,
    prefix: &str,
    config: &Config<S, P>,
) -> Result<ActionCreators<P>, MillError>
where
    P: fmt::Debug + Send + Sync + 'static,
{
    let mut entries = Vec::with_capacity(map.len());

    for (key, value) in map.iter() {
        if *key == config.main_key {
            continue;
        }

        let type_string = make_type(prefix, &config.divider, key.as_str());
        let create = default_creator(type_string.clone(), config.traced());
        let create = match &config.creator_wrap {
            Some(wrap) => wrap(create, &type_string)
                .ok_or_else(|| MillError::ContractViolation { hook: Hook::CreatorWrap, path: type_string.clone() })?,
            None => create,
        };

        let children = match value {
            Rule::Mapping(inner) => synthesize(inner, &type_string, config)?,
            Rule::Handler(_) | Rule::Nil => ActionCreators::default(),
        };

        entries.push((key.clone(), ActionCreator { type_string, create, children }));
    }

    Ok(ActionCreators { entries })
}

fn default_creator<P>(kind: String, traced: bool) -> CreatorFn<P>
where
    P: fmt::Debug + Send + Sync + 'static,
{
    Arc::new(move |payload: P| {
        if traced {
            tracing::debug!(target: TRACE_TARGET, kind = %kind, payload = ?payload, "action created");
        }
        Action { kind: kind.clone(), payload }
    })
}
