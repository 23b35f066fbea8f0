use std::fmt;
use thiserror::Error;

/// Structural classification of a rule node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Nil,
    Handler,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Nil => "nil",
            NodeKind::Handler => "handler",
            NodeKind::Mapping => "mapping",
        })
    }
}

/// The caller-supplied hooks whose results are checked at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    HandlerWrap,
    DispatcherWrap,
    CreatorWrap,
}

impl Hook {
    fn contract(self) -> &'static str {
        match self {
            Hook::HandlerWrap => "Fn(state, payload, action) -> state",
            Hook::DispatcherWrap => "Fn(state, action) -> state",
            Hook::CreatorWrap => "Fn(payload) -> action",
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Hook::HandlerWrap => "handler_wrap",
            Hook::DispatcherWrap => "dispatcher_wrap",
            Hook::CreatorWrap => "creator_wrap",
        })
    }
}

/// Construction failures.
///
/// An action whose type has no handler is not an error: dispatching it
/// returns the state unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MillError {
    #[error("rule tree root should be a mapping, got {found}")]
    RootNotMapping { found: NodeKind },

    #[error("[{path}.{key}] should be a handler because it is the base handler of [{path}], got {found}")]
    MainKeyNotHandler { path: String, key: String, found: NodeKind },

    #[error("{hook} should return {} for [{path}]", .hook.contract())]
    ContractViolation { hook: Hook, path: String },
}

impl MillError {
    /// True for errors caused by the shape of the rule tree.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, MillError::RootNotMapping { .. } | MillError::MainKeyNotHandler { .. })
    }

    /// True for errors caused by a hook that returned nothing callable.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, MillError::ContractViolation { .. })
    }
}
