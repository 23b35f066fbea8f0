use crate::engine::{self, ActionCreators, DispatchTable, Dispatcher};
use crate::{Action, CreatorFn, Handler, Hook, MillError, Reducer, Rule, RuleKey};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Intercepts every handler once, at flatten time. Receives the handler and
/// its type string; `None` means the hook produced nothing callable.
pub type HandlerWrap<S, P> = Arc<dyn Fn(Handler<S, P>, &str) -> Option<Handler<S, P>> + Send + Sync>;

/// Replaces the built dispatcher. Receives the initial state and the
/// dispatcher; runs exactly once per [`build`].
pub type DispatcherWrap<S, P> = Arc<dyn Fn(&S, Reducer<S, P>) -> Option<Reducer<S, P>> + Send + Sync>;

/// Replaces the default action creator of one node. Receives the default
/// creator and its type string; runs once per creator, parents first.
pub type CreatorWrap<P> = Arc<dyn Fn(CreatorFn<P>, &str) -> Option<CreatorFn<P>> + Send + Sync>;

bitflags::bitflags! {
    /// Boolean switches of a [`Config`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MillFlags: u8 {
        /// Trace construction, action creation and handled actions.
        const DEBUG          = 1 << 0;
        /// Trace the state returned by every handler.
        const STATE_DEBUG    = 1 << 1;
        /// Seed the root path with the store name.
        const NAME_AS_PREFIX = 1 << 2;
    }
}

/// Options that affect how a rule tree is milled.
///
/// Every field has a default; the chained setters exist for convenience.
pub struct Config<S, P> {
    pub flags: MillFlags,
    /// Separator placed between path segments of a type string.
    pub divider: String,
    /// Key that marks a mapping's own handler.
    pub main_key: RuleKey,
    pub handler_wrap: Option<HandlerWrap<S, P>>,
    pub dispatcher_wrap: Option<DispatcherWrap<S, P>>,
    pub creator_wrap: Option<CreatorWrap<P>>,
}

impl<S, P> Config<S, P> {
    pub fn debug(mut self, on: bool) -> Self {
        self.flags.set(MillFlags::DEBUG, on);
        self
    }

    pub fn state_debug(mut self, on: bool) -> Self {
        self.flags.set(MillFlags::STATE_DEBUG, on);
        self
    }

    pub fn name_as_prefix(mut self, on: bool) -> Self {
        self.flags.set(MillFlags::NAME_AS_PREFIX, on);
        self
    }

    pub fn divider(mut self, divider: impl Into<String>) -> Self {
        self.divider = divider.into();
        self
    }

    pub fn main_key(mut self, key: impl Into<RuleKey>) -> Self {
        self.main_key = key.into();
        self
    }

    pub fn handler_wrap<F>(mut self, wrap: F) -> Self
    where
        F: Fn(Handler<S, P>, &str) -> Option<Handler<S, P>> + Send + Sync + 'static,
    {
        self.handler_wrap = Some(Arc::new(wrap));
        self
    }

    pub fn dispatcher_wrap<F>(mut self, wrap: F) -> Self
    where
        F: Fn(&S, Reducer<S, P>) -> Option<Reducer<S, P>> + Send + Sync + 'static,
    {
        self.dispatcher_wrap = Some(Arc::new(wrap));
        self
    }

    pub fn creator_wrap<F>(mut self, wrap: F) -> Self
    where
        F: Fn(CreatorFn<P>, &str) -> Option<CreatorFn<P>> + Send + Sync + 'static,
    {
        self.creator_wrap = Some(Arc::new(wrap));
        self
    }

    pub(crate) fn traced(&self) -> bool {
        self.flags.contains(MillFlags::DEBUG)
    }
}

impl<S, P> Default for Config<S, P> {
    fn default() -> Self {
        Config {
            flags: MillFlags::empty(),
            divider: "_".to_string(),
            main_key: RuleKey::from(0),
            handler_wrap: None,
            dispatcher_wrap: None,
            creator_wrap: None,
        }
    }
}

impl<S, P> Clone for Config<S, P> {
    fn clone(&self) -> Self {
        Config {
            flags: self.flags,
            divider: self.divider.clone(),
            main_key: self.main_key.clone(),
            handler_wrap: self.handler_wrap.clone(),
            dispatcher_wrap: self.dispatcher_wrap.clone(),
            creator_wrap: self.creator_wrap.clone(),
        }
    }
}

impl<S, P> fmt::Debug for Config<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("flags", &self.flags)
            .field("divider", &self.divider)
            .field("main_key", &self.main_key)
            .field("handler_wrap", &self.handler_wrap.as_ref().map(|_| "<function>"))
            .field("dispatcher_wrap", &self.dispatcher_wrap.as_ref().map(|_| "<function>"))
            .field("creator_wrap", &self.creator_wrap.as_ref().map(|_| "<function>"))
            .finish()
    }
}

/// A full application state that holds named store slices.
pub trait RootState<S> {
    fn slice(&self, name: &str) -> Option<&S>;
}

impl<S> RootState<S> for HashMap<String, S> {
    fn slice(&self, name: &str) -> Option<&S> {
        self.get(name)
    }
}

impl<S> RootState<S> for BTreeMap<String, S> {
    fn slice(&self, name: &str) -> Option<&S> {
        self.get(name)
    }
}

impl RootState<serde_json::Value> for serde_json::Value {
    fn slice(&self, name: &str) -> Option<&serde_json::Value> {
        self.get(name)
    }
}

/// The store adapter returned by [`build`].
///
/// Holds the reducer for the store slice called [`Mill::name`] (the plain
/// dispatcher, or whatever `dispatcher_wrap` replaced it with) and adapts
/// selectors to that slice.
pub struct Mill<S, P> {
    name: String,
    initial_state: S,
    reducer: Reducer<S, P>,
    table: Arc<DispatchTable<S, P>>,
}

impl<S, P> Mill<S, P>
where
    S: Clone,
{
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_state(&self) -> &S {
        &self.initial_state
    }

    /// The reducer, shareable with a surrounding store.
    pub fn reducer(&self) -> Reducer<S, P> {
        Arc::clone(&self.reducer)
    }

    /// The flattened dispatch table.
    pub fn table(&self) -> &DispatchTable<S, P> {
        &self.table
    }

    /// Run one transition. `None` starts from the initial state.
    pub fn reduce(&self, state: Option<S>, action: &Action<P>) -> S {
        let state = state.unwrap_or_else(|| self.initial_state.clone());
        (self.reducer)(state, action)
    }

    /// Run one transition from `state`.
    pub fn dispatch(&self, state: S, action: &Action<P>) -> S {
        (self.reducer)(state, action)
    }

    /// Adapt `selector` so it reads this store's slice of a root state.
    ///
    /// A missing slice is passed on as `None`.
    pub fn select<R, T, F>(&self, selector: F) -> impl Fn(&R) -> T + use<S, P, R, T, F>
    where
        R: RootState<S>,
        F: Fn(Option<&S>) -> T,
    {
        let name = self.name.clone();
        move |root: &R| selector(root.slice(&name))
    }

    /// Like [`Mill::select`], forwarding one extra argument to `selector`.
    pub fn select_with<R, A, T, F>(&self, selector: F) -> impl Fn(&R, A) -> T + use<S, P, R, A, T, F>
    where
        R: RootState<S>,
        F: Fn(Option<&S>, A) -> T,
    {
        let name = self.name.clone();
        move |root: &R, extra: A| selector(root.slice(&name), extra)
    }
}

impl<S, P> fmt::Debug for Mill<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mill")
            .field("name", &self.name)
            .field("reducer", &"<function>")
            .field("table", &self.table)
            .finish()
    }
}

/// Mill `rules` into a store adapter and its action creators.
///
/// `rules` is consumed. Its handlers end up in the dispatch table (wrapped by
/// `handler_wrap` when set); its shape is mirrored, minus main-key slots, by
/// the returned [`ActionCreators`].
///
/// # Example
/// ```
/// use reducer_mill::{Action, Config, RuleMap, build};
///
/// let rules = RuleMap::new()
///     .on("INC", |n: i64, by: &i64, _| n + by)
///     .nest("RESET", RuleMap::new().on(0, |_: i64, _: &i64, _| 0).on("TO", |_: i64, to: &i64, _| *to));
///
/// let (mill, creators) = build(0, rules, "counter", Config::default()).unwrap();
///
/// assert_eq!(creators["RESET"]["TO"].as_str(), "RESET_TO");
/// assert_eq!(mill.reduce(None, &creators["INC"].create(2)), 2);
/// assert_eq!(mill.dispatch(5, &creators["RESET"].create(0)), 0);
/// assert_eq!(mill.dispatch(5, &Action::new("UNKNOWN", 1)), 5);
/// ```
pub fn build<S, P>(
    initial_state: S,
    rules: impl Into<Rule<S, P>>,
    store_name: impl Into<String>,
    config: Config<S, P>,
) -> Result<(Mill<S, P>, ActionCreators<P>), MillError>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    P: fmt::Debug + Send + Sync + 'static,
{
    let name = store_name.into();
    let rules = rules.into();
    let traced = config.traced();

    if traced {
        tracing::debug!(
            target: engine::TRACE_TARGET,
            store = %name,
            divider = %config.divider,
            main_key = %config.main_key,
            flags = ?config.flags,
            initial_state = ?initial_state,
            rules = ?rules,
            "milling rule tree"
        );
    }

    let root = engine::check_root(&rules)?;
    let prefix = if config.flags.contains(MillFlags::NAME_AS_PREFIX) { name.as_str() } else { "" };
    engine::validate_tree(root, prefix, &config.divider, &config.main_key)?;

    let table = Arc::new(engine::flatten(&rules, prefix, &config)?);
    if traced {
        tracing::debug!(target: engine::TRACE_TARGET, store = %name, cases = ?table, "dispatch table built");
    }

    let creators = engine::synthesize(root, prefix, &config)?;
    if traced {
        tracing::debug!(target: engine::TRACE_TARGET, store = %name, creators = ?creators, "action creators built");
    }

    let reducer = Dispatcher::new(Arc::clone(&table), config.flags).into_reducer();
    let reducer = match &config.dispatcher_wrap {
        Some(wrap) => {
            if traced {
                tracing::debug!(target: engine::TRACE_TARGET, store = %name, "wrapping dispatcher");
            }
            wrap(&initial_state, reducer).ok_or_else(|| MillError::ContractViolation {
                hook: Hook::DispatcherWrap,
                path: name.clone(),
            })?
        }
        None => reducer,
    };

    Ok((Mill { name, initial_state, reducer, table }, creators))
}
