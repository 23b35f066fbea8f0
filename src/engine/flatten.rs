//! Rule tree flattening.
//!
//! Produces exactly one `DispatchTable` entry per reachable handler, keyed by
//! the handler's structural path:
//!
//! - a leaf handler is registered at its own path;
//! - a main-key handler is registered at its parent mapping's path;
//! - a mapping without a main-key entry contributes no entry of its own;
//! - `Nil` contributes nothing.

use super::dispatch::DispatchTable;
use super::naming::make_type;
use super::{TRACE_TARGET, validate};
use crate::api::Config;
use crate::{Handler, Hook, MillError, Rule};
use std::sync::Arc;

/// Flatten `node`, rooted at `path`, into a dispatch table.
pub(crate) fn flatten<S, P>(
    node: &Rule<S, P>,
    path: &str,
    config: &Config<S, P>,
) -> Result<DispatchTable<S, P>, MillError> {
    let mut table = DispatchTable::new();
    collect(node, path, config, &mut table)?;
    Ok(table)
}

fn collect<S, P>(
    node: &Rule<S, P>,
    path: &str,
    config: &Config<S, P>,
    table: &mut DispatchTable<S, P>,
) -> Result<(), MillError> {
    match node {
        Rule::Nil => {}
        Rule::Handler(handler) => register(handler, path, config, table)?,
        Rule::Mapping(map) => {
            for (key, value) in map.iter() {
                if *key == config.main_key {
                    let handler = validate::main_handler(path, key, value)?;
                    register(handler, path, config, table)?;
                } else {
                    collect(value, &make_type(path, &config.divider, key.as_str()), config, table)?;
                }
            }
        }
    }
    Ok(())
}

fn register<S, P>(
    handler: &Handler<S, P>,
    path: &str,
    config: &Config<S, P>,
    table: &mut DispatchTable<S, P>,
) -> Result<(), MillError> {
    let handler = match &config.handler_wrap {
        Some(wrap) => wrap(Arc::clone(handler), path)
            .ok_or_else(|| MillError::ContractViolation { hook: Hook::HandlerWrap, path: path.to_string() })?,
        None => Arc::clone(handler),
    };
    if config.traced() {
        tracing::debug!(target: TRACE_TARGET, kind = %path, "handler registered");
    }
    table.insert(path.to_string(), handler);
    Ok(())
}
