mod debug_report;

use debug_report::DispatchRun;
use once_cell::sync::Lazy;
use reducer_mill::{Action, Config, RuleMap, build, rules};
use serde_json::{Value, json};
use std::io::{self, IsTerminal};

const STORE_NAME: &str = "todos";

static DEFAULT_STATE: Lazy<Value> = Lazy::new(|| json!({ "items": [], "filter": "all", "loading": false }));

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if config.debug {
        init_tracing();
    }

    let mill_config = Config::default()
        .divider(config.divider.clone())
        .main_key(config.main_key.clone())
        .name_as_prefix(config.prefix)
        .debug(config.debug)
        .state_debug(config.debug);

    let (mill, creators) = match build(DEFAULT_STATE.clone(), demo_rules(), STORE_NAME, mill_config) {
        Ok(built) => built,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    let before = config.state.unwrap_or_else(|| mill.initial_state().clone());
    let run = config.action.map(|kind| {
        let action = Action::new(kind, config.payload);
        let matched = mill.table().contains(&action.kind);
        let after = mill.dispatch(before.clone(), &action);
        DispatchRun { action, matched, before, after }
    });

    debug_report::print_report(&mill, &creators, run.as_ref(), config.color);
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reducer_mill=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn demo_rules() -> RuleMap<Value, Value> {
    rules! {
        "ADD" => |mut s: Value, title: &Value, _| {
            if let Some(items) = s["items"].as_array_mut() {
                items.push(json!({ "title": title, "done": false }));
            }
            s
        },
        "TOGGLE" => |mut s: Value, idx: &Value, _| {
            if let (Some(i), Some(items)) = (idx.as_u64(), s["items"].as_array_mut()) {
                if let Some(item) = items.get_mut(i as usize) {
                    let done = item["done"].as_bool().unwrap_or(false);
                    item["done"] = json!(!done);
                }
            }
            s
        },
        "FILTER" => {
            0 => |mut s: Value, filter: &Value, _| {
                s["filter"] = filter.clone();
                s
            },
            "ALL" => |mut s: Value, _: &Value, _| {
                s["filter"] = json!("all");
                s
            },
            "DONE" => |mut s: Value, _: &Value, _| {
                s["filter"] = json!("done");
                s
            },
        },
        "FETCH" => {
            "START" => |mut s: Value, _: &Value, _| {
                s["loading"] = json!(true);
                s
            },
            "DONE" => |mut s: Value, items: &Value, _| {
                s["loading"] = json!(false);
                s["items"] = items.clone();
                s
            },
        },
    }
}

struct CliConfig {
    action: Option<String>,
    payload: Value,
    state: Option<Value>,
    divider: String,
    main_key: String,
    prefix: bool,
    debug: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut config = CliConfig {
        action: None,
        payload: Value::Null,
        state: None,
        divider: "_".to_string(),
        main_key: "0".to_string(),
        prefix: false,
        debug: false,
        color: io::stdout().is_terminal(),
    };
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("reducer-mill {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => config.color = true,
            "--no-color" => config.color = false,
            "--prefix" => config.prefix = true,
            "--debug" => config.debug = true,
            "--action" | "-a" => {
                let value = args.next().ok_or_else(|| "error: --action expects a value".to_string())?;
                config.action = Some(value);
            }
            "--payload" | "-p" => {
                let value = args.next().ok_or_else(|| "error: --payload expects a value".to_string())?;
                config.payload = parse_json("--payload", &value)?;
            }
            "--state" => {
                let value = args.next().ok_or_else(|| "error: --state expects a value".to_string())?;
                config.state = Some(parse_json("--state", &value)?);
            }
            "--divider" => {
                config.divider = args.next().ok_or_else(|| "error: --divider expects a value".to_string())?;
            }
            "--main-key" => {
                config.main_key = args.next().ok_or_else(|| "error: --main-key expects a value".to_string())?;
            }
            _ if arg.starts_with("--action=") => {
                config.action = Some(arg.trim_start_matches("--action=").to_string());
            }
            _ if arg.starts_with("--payload=") => {
                config.payload = parse_json("--payload", arg.trim_start_matches("--payload="))?;
            }
            _ if arg.starts_with("--divider=") => {
                config.divider = arg.trim_start_matches("--divider=").to_string();
            }
            _ => {
                return Err(format!("error: unknown argument `{arg}`\n\n{}", usage()));
            }
        }
    }

    Ok(config)
}

fn parse_json(flag: &str, value: &str) -> Result<Value, String> {
    serde_json::from_str(value).map_err(|err| format!("error: {flag} expects JSON ({err})"))
}

fn print_help() {
    println!("{}", usage());
}

fn usage() -> String {
    [
        "reducer-mill - inspect how a rule tree is milled into a dispatch table and action creators",
        "",
        "Usage:",
        "  reducer-mill [--action TYPE] [--payload JSON] [--state JSON] [options]",
        "",
        "Options:",
        "  -a, --action TYPE     Dispatch TYPE against the demo store",
        "  -p, --payload JSON    Payload for the dispatched action (default: null)",
        "      --state JSON      Starting state (default: the store's initial state)",
        "      --divider D       Separator between type segments (default: _)",
        "      --main-key K      Key marking a mapping's own handler (default: 0)",
        "      --prefix          Prefix every type with the store name",
        "      --debug           Trace construction and dispatch (RUST_LOG overrides the filter)",
        "      --color           Force ANSI colors",
        "      --no-color        Disable ANSI colors",
        "  -h, --help            Show this help",
        "  -V, --version         Show version",
    ]
    .join("\n")
}
