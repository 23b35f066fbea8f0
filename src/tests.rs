use crate::{Action, Config, CreatorFn, Handler, Hook, MillError, NodeKind, Reducer, Rule, RuleMap, build};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn merge(mut state: Value, patch: &Value) -> Value {
    if let (Some(base), Some(patch)) = (state.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            base.insert(key.clone(), value.clone());
        }
    }
    state
}

fn reducer() -> RuleMap<Value, Value> {
    rules! {
        "SET" => |mut s: Value, name: &Value, _| {
            s["name"] = name.clone();
            s
        },
        "GET" => {
            0 => |s: Value, p: &Value, _| merge(s, p),
            "X" => |mut s: Value, p: &Value, _| {
                s["value"] = p["value"].clone();
                s
            },
            "LOAD" => |mut s: Value, _: &Value, _| {
                s["loading"] = json!(true);
                s
            },
        },
    }
}

fn init_state() -> Value {
    json!({ "a": 10, "b": 20, "name": "default", "value": null })
}

// --- Construction -----------------------------------------------------------

#[test]
fn empty_rule_tree_builds_an_empty_mill() {
    let (mill, creators) = build(json!({}), RuleMap::new(), "myName", Config::default()).unwrap();
    assert_eq!(mill.name(), "myName");
    assert!(mill.table().is_empty());
    assert!(creators.is_empty());
    assert_eq!(mill.reduce(None, &Action::new("any", Value::Null)), json!({}));
}

#[test]
fn root_that_is_not_a_mapping_is_rejected() {
    let err = build(json!({}), Rule::handler(|s: Value, _: &Value, _| s), "aaa", Config::default()).unwrap_err();
    assert_eq!(err, MillError::RootNotMapping { found: NodeKind::Handler });

    let err = build(json!({}), Rule::<Value, Value>::Nil, "aaa", Config::default()).unwrap_err();
    assert!(err.is_shape_error());
}

#[test]
fn main_key_that_is_not_a_handler_is_rejected() {
    let rules: RuleMap<Value, Value> = rules! { "A" => { 0 => {} } };
    let err = build(json!({}), rules, "aaa", Config::default()).unwrap_err();
    assert!(err.to_string().contains("should be a handler because it is the base handler of [A]"));
}

#[test]
fn invalid_tree_never_reaches_the_hooks() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let config = Config::default().handler_wrap(move |h: Handler<Value, Value>, _: &str| {
        *counter.lock().unwrap() += 1;
        Some(h)
    });
    let rules: RuleMap<Value, Value> = rules! {
        "OK" => |s: Value, _: &Value, _| s,
        "BAD" => { 0 => {} },
    };

    assert!(build(json!({}), rules, "aaa", config).is_err());
    assert_eq!(*calls.lock().unwrap(), 0);
}

// --- Selector ---------------------------------------------------------------

#[test]
fn selector_receives_the_store_slice() {
    let init = json!({ "a": 10, "b": 20 });
    let (mill, _) = build(init.clone(), RuleMap::<Value, Value>::new(), "myName", Config::default()).unwrap();
    let root = json!({ "myName": init.clone(), "other": 1 });

    let select = mill.select::<Value, _, _>(|s: Option<&Value>| s.cloned());
    assert_eq!(select(&root), Some(init));

    let select_a = mill.select::<Value, _, _>(|s: Option<&Value>| s.and_then(|s| s["a"].as_i64()));
    assert_eq!(select_a(&root), Some(10));

    let missing = mill.select::<Value, _, _>(|s: Option<&Value>| s.is_none());
    assert!(missing(&json!({})));
}

#[test]
fn selector_forwards_extra_arguments() {
    let (mill, _) = build(json!({ "items": [1, 2, 3] }), RuleMap::<Value, Value>::new(), "list", Config::default()).unwrap();
    let root = json!({ "list": { "items": [1, 2, 3] } });
    let nth = mill.select_with::<Value, _, _, _>(|s: Option<&Value>, idx: usize| s.and_then(|s| s["items"].get(idx)).cloned());
    assert_eq!(nth(&root, 1), Some(json!(2)));
    assert_eq!(nth(&root, 9), None);
}

// --- State transitions ------------------------------------------------------

#[test]
fn specific_action_from_initial_state() {
    let (mill, creators) = build(init_state(), reducer(), "myName", Config::default()).unwrap();
    let next = mill.reduce(None, &creators["SET"].create(json!("TestName")));
    assert_eq!(next, merge(init_state(), &json!({ "name": "TestName" })));
}

#[test]
fn deep_action_from_initial_state() {
    let (mill, creators) = build(init_state(), reducer(), "myName", Config::default()).unwrap();
    let next = mill.reduce(None, &creators["GET"]["X"].create(json!({ "value": "999" })));
    assert_eq!(next, merge(init_state(), &json!({ "value": "999" })));
}

#[test]
fn root_action_of_a_mapping_runs_its_main_handler() {
    let (mill, creators) = build(init_state(), reducer(), "myName", Config::default()).unwrap();
    let next = mill.reduce(None, &creators["GET"].create(json!({ "zzz": 888 })));
    assert_eq!(next, merge(init_state(), &json!({ "zzz": 888 })));

    let next = mill.reduce(Some(json!({ "zzz": 777 })), &creators["GET"].create(json!({ "zzz": 888 })));
    assert_eq!(next, json!({ "zzz": 888 }));
}

#[test]
fn unknown_action_returns_the_same_state() {
    let rules = RuleMap::new().on("SET", |s: Arc<Value>, p: &Value, _| Arc::new(merge((*s).clone(), p)));
    let (mill, _) = build(Arc::new(init_state()), rules, "myName", Config::default()).unwrap();

    let state = Arc::clone(mill.initial_state());
    let next = mill.dispatch(Arc::clone(&state), &Action::new("uuuu", Value::Null));
    assert!(Arc::ptr_eq(&state, &next));

    let next = mill.reduce(None, &Action::new("uuuu", Value::Null));
    assert!(Arc::ptr_eq(mill.initial_state(), &next));
}

#[test]
fn debug_tracing_does_not_change_results() {
    let subscriber = tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).with_test_writer().finish();
    tracing::subscriber::with_default(subscriber, || {
        let config = Config::default().debug(true).state_debug(true);
        let (mill, creators) = build(init_state(), reducer(), "myName", config).unwrap();
        let next = mill.reduce(Some(json!({ "zzz": 777 })), &creators["GET"].create(json!({ "zzz": 888 })));
        assert_eq!(next, json!({ "zzz": 888 }));
    });
}

#[test]
fn every_creator_dispatches_to_the_handler_at_its_path() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&hits);
    let config = Config::default().handler_wrap(move |inner: Handler<Value, Value>, kind: &str| {
        let log = Arc::clone(&log);
        let kind = kind.to_string();
        let traced: Handler<Value, Value> = Arc::new(move |s: Value, p: &Value, a: &Action<Value>| {
            log.lock().unwrap().push(kind.clone());
            inner(s, p, a)
        });
        Some(traced)
    });
    let (mill, creators) = build(init_state(), reducer(), "myName", config).unwrap();

    for creator in creators.walk() {
        hits.lock().unwrap().clear();
        mill.reduce(None, &creator.create(json!({ "value": 1 })));
        assert_eq!(*hits.lock().unwrap(), vec![creator.type_string().to_string()]);
    }
}

// --- Action creators --------------------------------------------------------

fn reducer_with_save() -> RuleMap<Value, Value> {
    let mut rules = reducer();
    rules.insert("SAVE", Rule::handler(|s: Value, p: &Value, _| merge(s, p)));
    rules.insert(
        "GET",
        Rule::Mapping(rules! {
            0 => |s: Value, _: &Value, _| s,
            "X" => |mut s: Value, p: &Value, _| {
                s["value"] = p["value"].clone();
                s
            },
            "LOAD" => |mut s: Value, _: &Value, _| {
                s["loading"] = json!(true);
                s
            },
        }),
    );
    rules
}

#[test]
fn creators_exist_for_each_key() {
    let (_, creators) = build(init_state(), reducer_with_save(), "myName", Config::default()).unwrap();
    for key in ["SAVE", "SET", "GET"] {
        assert!(creators.get(key).is_some(), "missing creator for {key}");
    }
    assert!(creators["GET"].get(0).is_none());
    assert!(creators["GET"].get("X").is_some());
    assert!(creators["GET"].get("LOAD").is_some());
}

#[test]
fn custom_main_key_moves_the_main_creator() {
    let config = Config::default().main_key("X");
    let (mill, creators) = build(init_state(), reducer_with_save(), "myName", config).unwrap();
    assert!(creators["GET"].get(0).is_some());
    assert!(creators["GET"].get("X").is_none());
    assert!(creators["GET"].get("LOAD").is_some());
    assert!(mill.table().contains("GET_0"));
}

#[test]
fn type_strings_follow_prefix_and_divider() {
    for name_as_prefix in [false, true] {
        let prepare = |v: &str| if name_as_prefix { format!("myName_{v}") } else { v.to_string() };
        let prepare_with = |v: &str, sep: &str| if name_as_prefix { format!("myName{sep}{v}") } else { v.to_string() };

        let config = Config::default().name_as_prefix(name_as_prefix);
        let (_, creators) = build(init_state(), reducer_with_save(), "myName", config).unwrap();
        assert_eq!(creators["GET"].to_string(), prepare("GET"));
        assert_eq!(creators["GET"]["LOAD"].to_string(), prepare("GET_LOAD"));
        assert_eq!(format!("!{}", creators["GET"]), format!("!{}", prepare("GET")));
        assert_eq!(format!("{}!", creators["GET"]["LOAD"]), format!("{}!", prepare("GET_LOAD")));
        assert!(creators["GET"] == prepare("GET"));
        assert_eq!(creators["GET"]["LOAD"].type_string(), prepare("GET_LOAD"));

        let config = Config::default().name_as_prefix(name_as_prefix).divider("_x_");
        let (_, creators) = build(init_state(), reducer_with_save(), "myName", config).unwrap();
        assert_eq!(creators["GET"].type_string(), prepare_with("GET", "_x_"));
        assert_eq!(creators["GET"]["LOAD"].type_string(), prepare_with("GET_x_LOAD", "_x_"));

        let config = Config::default().name_as_prefix(name_as_prefix).divider("---");
        let (_, creators) = build(init_state(), reducer_with_save(), "myName", config).unwrap();
        let payload = json!({ "a": 1, "b": 2 });
        assert_eq!(
            creators["GET"]["LOAD"].create(payload.clone()),
            Action::new(prepare_with("GET---LOAD", "---"), payload)
        );
    }
}

#[test]
fn name_as_prefix_namespaces_the_dispatch_table() {
    let config = Config::default().name_as_prefix(true);
    let (mill, creators) = build(init_state(), reducer(), "myName", config).unwrap();
    assert_eq!(mill.table().types().collect::<Vec<_>>(), vec!["myName_SET", "myName_GET", "myName_GET_X", "myName_GET_LOAD"]);

    let next = mill.reduce(None, &creators["GET"]["LOAD"].create(Value::Null));
    assert_eq!(next["loading"], json!(true));
    assert_eq!(mill.reduce(None, &Action::new("GET_LOAD", Value::Null)), init_state());
}

#[test]
fn root_main_key_has_no_creator_but_dispatches_at_the_root_type() {
    fn with_root_handler() -> RuleMap<Value, Value> {
        rules! {
            0 => |mut s: Value, _: &Value, _| {
                s["root"] = json!(true);
                s
            },
            "NS" => {
                "A" => |mut s: Value, p: &Value, _| {
                    s["a"] = p.clone();
                    s
                },
            },
        }
    }

    for (name_as_prefix, root_type) in [(false, ""), (true, "st")] {
        let config = Config::default().name_as_prefix(name_as_prefix);
        let (mill, creators) = build(json!({}), with_root_handler(), "st", config).unwrap();

        assert!(creators.get(0).is_none());
        assert!(creators.get("0").is_none());
        assert_eq!(creators.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(), vec!["NS"]);

        assert_eq!(mill.table().types().next(), Some(root_type));
        let next = mill.reduce(None, &Action::new(root_type, Value::Null));
        assert_eq!(next, json!({ "root": true }));
    }
}

#[test]
fn concrete_get_x_scenario() {
    let rules: RuleMap<Value, Value> = rules! {
        "SET" => |mut s: Value, n: &Value, _| {
            s["name"] = n.clone();
            s
        },
        "GET" => {
            0 => |s: Value, p: &Value, _| merge(s, p),
            "X" => |mut s: Value, p: &Value, _| {
                s["value"] = p["value"].clone();
                s
            },
        },
    };
    let init = json!({ "value": null });
    let (mill, creators) = build(init.clone(), rules, "myName", Config::default()).unwrap();

    assert_eq!(mill.table().types().collect::<Vec<_>>(), vec!["SET", "GET", "GET_X"]);
    assert_eq!(creators["GET"].to_string(), "GET");
    assert_eq!(creators["GET"]["X"].create(json!("3")), Action::new("GET_X", json!("3")));

    let next = mill.reduce(None, &creators["GET"]["X"].create(json!({ "value": "999" })));
    assert_eq!(next, merge(init, &json!({ "value": "999" })));
}

// --- Hooks ------------------------------------------------------------------

type Calls = Arc<Mutex<Vec<(Value, Value, Action<Value>)>>>;

fn recording_handler_wrap(calls: Calls, wraps: Arc<Mutex<usize>>) -> Config<Value, Value> {
    Config::default().handler_wrap(move |inner: Handler<Value, Value>, _: &str| {
        *wraps.lock().unwrap() += 1;
        let calls = Arc::clone(&calls);
        let wrapped: Handler<Value, Value> = Arc::new(move |s: Value, p: &Value, a: &Action<Value>| {
            calls.lock().unwrap().push((s.clone(), p.clone(), a.clone()));
            inner(s, p, a)
        });
        Some(wrapped)
    })
}

#[test]
fn handler_wrap_is_not_called_for_an_empty_tree() {
    let calls: Calls = Arc::default();
    let wraps = Arc::new(Mutex::new(0));
    build(json!({}), RuleMap::new(), "myName", recording_handler_wrap(Arc::clone(&calls), Arc::clone(&wraps))).unwrap();
    assert_eq!(*wraps.lock().unwrap(), 0);
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn handler_wrap_runs_once_per_handler_and_intercepts_matches_only() {
    let calls: Calls = Arc::default();
    let wraps = Arc::new(Mutex::new(0));
    let config = recording_handler_wrap(Arc::clone(&calls), Arc::clone(&wraps));
    let (mill, _) = build(json!({ "a": 10 }), reducer(), "myName", config).unwrap();
    assert_eq!(*wraps.lock().unwrap(), 4);
    assert!(calls.lock().unwrap().is_empty());

    mill.dispatch(json!({ "b": 1 }), &Action::new("some", Value::Null));
    assert!(calls.lock().unwrap().is_empty());

    let set = Action::new("SET", Value::Null);
    let next = mill.dispatch(json!({ "c": 2 }), &set);
    assert_eq!(next, json!({ "c": 2, "name": null }));

    let get_x = Action::new("GET_X", json!({ "value": 100 }));
    let next = mill.dispatch(json!({ "d": 3 }), &get_x);
    assert_eq!(next, json!({ "d": 3, "value": 100 }));

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (json!({ "c": 2 }), Value::Null, set));
    assert_eq!(calls[1], (json!({ "d": 3 }), json!({ "value": 100 }), get_x));
    assert_eq!(*wraps.lock().unwrap(), 4);
}

#[test]
fn handler_wrap_without_a_callable_fails_before_any_dispatch() {
    let config = Config::default().handler_wrap(|_: Handler<Value, Value>, _: &str| None);
    let err = build(json!({}), reducer(), "myName", config).unwrap_err();
    assert!(err.is_contract_violation());
    assert_eq!(err, MillError::ContractViolation { hook: Hook::HandlerWrap, path: "SET".into() });
}

#[test]
fn dispatcher_wrap_sees_every_dispatch() {
    let wraps = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(Mutex::new(Vec::new()));
    let (wrap_log, call_log) = (Arc::clone(&wraps), Arc::clone(&calls));
    let config = Config::default().dispatcher_wrap(move |initial: &Value, inner: Reducer<Value, Value>| {
        wrap_log.lock().unwrap().push(initial.clone());
        let call_log = Arc::clone(&call_log);
        let wrapped: Reducer<Value, Value> = Arc::new(move |s: Value, a: &Action<Value>| {
            call_log.lock().unwrap().push((s.clone(), a.kind.clone()));
            inner(s, a)
        });
        Some(wrapped)
    });

    let (mill, _) = build(json!({ "a": 10 }), reducer(), "myName", config).unwrap();
    assert_eq!(*wraps.lock().unwrap(), vec![json!({ "a": 10 })]);
    assert!(calls.lock().unwrap().is_empty());

    let results: Vec<Value> = [("some1", json!({ "b": 1 })), ("some2", json!({ "c": 2 })), ("GET_LOAD", json!({ "e": 4 }))]
        .into_iter()
        .map(|(kind, state)| mill.dispatch(state, &Action::new(kind, Value::Null)))
        .collect();

    assert_eq!(wraps.lock().unwrap().len(), 1);
    assert_eq!(calls.lock().unwrap().len(), 3);
    assert_eq!(calls.lock().unwrap()[2], (json!({ "e": 4 }), "GET_LOAD".to_string()));
    assert_eq!(results, vec![json!({ "b": 1 }), json!({ "c": 2 }), json!({ "e": 4, "loading": true })]);
}

#[test]
fn creator_wrap_replaces_default_creators_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let config = Config::default().creator_wrap(move |base: CreatorFn<Value>, kind: &str| {
        let sample = base(json!("probe"));
        log.lock().unwrap().push((kind.to_string(), sample));
        let wrapped: CreatorFn<Value> =
            Arc::new(move |payload: Value| base(json!({ "data": payload, "meta": "meta" })));
        Some(wrapped)
    });

    let (_, creators) = build(json!({}), reducer(), "myName", config).unwrap();

    let seen = seen.lock().unwrap();
    let kinds: Vec<_> = seen.iter().map(|(kind, _)| kind.as_str()).collect();
    assert_eq!(kinds, vec!["SET", "GET", "GET_X", "GET_LOAD"]);
    for (kind, sample) in seen.iter() {
        assert_eq!(*sample, Action::new(kind.clone(), json!("probe")));
    }

    assert_eq!(
        creators["GET"]["X"].create(json!("3")),
        Action::new("GET_X", json!({ "data": "3", "meta": "meta" }))
    );
}

#[test]
fn creator_wrap_is_not_called_for_an_empty_tree() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let config = Config::default().creator_wrap(move |base: CreatorFn<Value>, _: &str| {
        *counter.lock().unwrap() += 1;
        Some(base)
    });
    build(json!({}), RuleMap::new(), "myName", config).unwrap();
    assert_eq!(*calls.lock().unwrap(), 0);
}
