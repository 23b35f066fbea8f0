//! Structural checks over a rule tree.
//!
//! The tagged `Rule` variant already rules out anything that is neither a
//! handler, a mapping nor nil. What is left to check at runtime:
//!
//! - the root is a mapping;
//! - every main-key entry is a handler (never a mapping, never nil).
//!
//! `validate_tree` runs before the flattener so that no caller hook is invoked
//! on a tree that is going to be rejected.

use super::naming::make_type;
use crate::{Handler, MillError, Rule, RuleKey, RuleMap};

/// Return the root mapping or fail with `RootNotMapping`.
pub(crate) fn check_root<S, P>(rules: &Rule<S, P>) -> Result<&RuleMap<S, P>, MillError> {
    match rules {
        Rule::Mapping(map) => Ok(map),
        other => Err(MillError::RootNotMapping { found: other.kind() }),
    }
}

/// Return the handler stored under a main key found at `path`.
pub(crate) fn main_handler<'r, S, P>(
    path: &str,
    key: &RuleKey,
    node: &'r Rule<S, P>,
) -> Result<&'r Handler<S, P>, MillError> {
    match node {
        Rule::Handler(handler) => Ok(handler),
        other => Err(MillError::MainKeyNotHandler {
            path: path.to_string(),
            key: key.to_string(),
            found: other.kind(),
        }),
    }
}

/// Walk `map` (rooted at `path`) and report the first structural violation.
pub(crate) fn validate_tree<S, P>(
    map: &RuleMap<S, P>,
    path: &str,
    divider: &str,
    main_key: &RuleKey,
) -> Result<(), MillError> {
    for (key, value) in map.iter() {
        if key == main_key {
            main_handler(path, key, value)?;
        } else if let Rule::Mapping(inner) = value {
            validate_tree(inner, &make_type(path, divider, key.as_str()), divider, main_key)?;
        }
    }
    Ok(())
}
