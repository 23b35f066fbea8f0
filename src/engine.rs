//! Rule tree compilation.
//!
//! This module is the *core* of the mill: it turns one declarative rule tree
//! into the two artifacts the store adapter hands out.
//!
//! ## How the parts work together
//!
//! ```text
//! rule tree ──┐
//!             │  validate_tree               (validate.rs)
//!             │   - root must be a mapping
//!             │   - main-key entries must be handlers
//!             v
//!        ┌────┴───────────────────────────┐
//!        │                                │
//!  flatten (flatten.rs)            synthesize (creators.rs)
//!   - one entry per handler         - one creator per key
//!   - main key -> parent path       - main-key slots dropped
//!   - handler_wrap applied          - creator_wrap applied (pre-order)
//!        │                                │
//!        v                                v
//!  DispatchTable ── Dispatcher      ActionCreators
//!                  (dispatch.rs)
//! ```
//!
//! Type strings come from `make_type` (naming.rs): the path from the root to a
//! node, joined by the configured divider, with empty segments omitted.
//!
//! ## Responsibilities by module
//!
//! - `naming.rs`: derives type strings from a prefix, a divider and a key.
//! - `validate.rs`: checks the structural contract of a rule tree before any
//!   hook is invoked.
//! - `flatten.rs`: walks the tree and builds the `DispatchTable`.
//! - `creators.rs`: walks the same tree and builds the `ActionCreators` tree.
//! - `dispatch.rs`: the immutable table and the single-step transition over it.
//!
//! ## Debugging
//!
//! Enable `MillFlags::DEBUG` (and optionally `MillFlags::STATE_DEBUG`) and
//! install a `tracing` subscriber for the `reducer_mill` target.

#[path = "engine/creators.rs"]
mod creators;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/flatten.rs"]
mod flatten;
#[path = "engine/naming.rs"]
mod naming;
#[path = "engine/validate.rs"]
mod validate;

pub use creators::{ActionCreator, ActionCreators};
pub(crate) use creators::synthesize;
pub use dispatch::DispatchTable;
pub(crate) use dispatch::Dispatcher;
pub(crate) use flatten::flatten;
pub use naming::make_type;
pub(crate) use validate::{check_root, validate_tree};

/// `tracing` target for every event the mill emits.
pub(crate) const TRACE_TARGET: &str = "reducer_mill";
