use reducer_mill::{Action, ActionCreators, Mill};
use serde_json::Value;

/// Colors keyed by what they mark in the report.
#[derive(Clone, Copy)]
enum Role {
    Store,
    Section,
    Key,
    Kind,
    Payload,
    State,
    Muted,
}

impl Role {
    fn code(self) -> &'static str {
        match self {
            Role::Store => "\x1b[1;36m",
            Role::Section => "\x1b[90m",
            Role::Key => "\x1b[34m",
            Role::Kind => "\x1b[32m",
            Role::Payload => "\x1b[33m",
            Role::State => "\x1b[36m",
            Role::Muted => "\x1b[2m",
        }
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(&self, s: impl AsRef<str>, role: Role) -> String {
        if self.enabled { format!("{}{}\x1b[0m", role.code(), s.as_ref()) } else { s.as_ref().to_string() }
    }

    fn section(&self, title: &str) {
        println!("\n{}", self.paint(format!("━━━ {title} ━━━"), Role::Section));
    }
}

/// One dispatched action and the states around it.
pub struct DispatchRun {
    pub action: Action<Value>,
    pub matched: bool,
    pub before: Value,
    pub after: Value,
}

pub fn print_report(mill: &Mill<Value, Value>, creators: &ActionCreators<Value>, run: Option<&DispatchRun>, color: bool) {
    let palette = Palette { enabled: color };
    println!("\n{}", palette.paint(format!("⚙  Store: \"{}\"", mill.name()), Role::Store));

    palette.section("Dispatch table");
    if mill.table().is_empty() {
        println!("{}", palette.paint("  No handlers registered", Role::Muted));
    }
    for (idx, kind) in mill.table().types().enumerate() {
        println!("  {} {}", palette.paint(format!("[{}]", idx), Role::Section), palette.paint(display_kind(kind), Role::Kind));
    }

    palette.section("Action creators");
    print_creators(creators, 1, &palette);

    let Some(run) = run else {
        println!("\n{}", palette.paint("  Tip: pass --action TYPE [--payload JSON] to dispatch against the store", Role::Muted));
        println!();
        return;
    };

    palette.section("Dispatch");
    println!(
        "  {} {}  {} {}",
        palette.paint("type:", Role::Muted),
        palette.paint(display_kind(&run.action.kind), Role::Kind),
        palette.paint("│ payload:", Role::Muted),
        palette.paint(run.action.payload.to_string(), Role::Payload),
    );
    if run.matched {
        println!("  {}", palette.paint("✓ handled", Role::Kind));
    } else {
        println!("  {}", palette.paint("✗ no handler for this type, state unchanged", Role::Muted));
    }
    println!("  {} {}", palette.paint("before:", Role::Muted), run.before);
    println!("  {} {}", palette.paint("after: ", Role::Muted), palette.paint(run.after.to_string(), Role::State));
    println!();
}

fn print_creators(creators: &ActionCreators<Value>, depth: usize, palette: &Palette) {
    for (key, creator) in creators.iter() {
        println!(
            "{}{} {} {}",
            "  ".repeat(depth),
            palette.paint(key.as_str(), Role::Key),
            palette.paint("→", Role::Muted),
            palette.paint(display_kind(creator.type_string()), Role::Kind)
        );
        print_creators(creator.children(), depth + 1, palette);
    }
}

fn display_kind(kind: &str) -> String {
    if kind.is_empty() { "\"\"".to_string() } else { kind.to_string() }
}
