/// Build a [`RuleMap`](crate::RuleMap) from a declarative tree.
///
/// Each entry is `key => handler` or `key => { nested entries }`. Keys are any
/// expression convertible into a [`RuleKey`](crate::RuleKey); the main key
/// (`0` by default) marks a mapping's own handler.
///
/// ```
/// use reducer_mill::rules;
///
/// let rules = rules! {
///     "SET" => |s: i64, p: &i64, _| s + p,
///     "GET" => {
///         0 => |s: i64, _: &i64, _| s,
///         "X" => |_: i64, p: &i64, _| *p,
///     },
/// };
/// assert_eq!(rules.len(), 2);
/// ```
#[macro_export]
macro_rules! rules {
    (@entries $map:ident;) => {};
    (@entries $map:ident; $key:expr => { $($inner:tt)* } $(, $($rest:tt)*)?) => {
        $map.insert($key, $crate::Rule::Mapping($crate::rules!($($inner)*)));
        $crate::rules!(@entries $map; $($($rest)*)?);
    };
    (@entries $map:ident; $key:expr => $handler:expr $(, $($rest:tt)*)?) => {
        $map.insert($key, $crate::Rule::handler($handler));
        $crate::rules!(@entries $map; $($($rest)*)?);
    };
    ($($body:tt)*) => {{
        #[allow(unused_mut)]
        let mut map = $crate::RuleMap::new();
        $crate::rules!(@entries map; $($body)*);
        map
    }};
}

#[cfg(test)]
mod tests {
    use crate::{Rule, RuleMap};

    #[test]
    fn builds_nested_mappings_in_order() {
        let rules: RuleMap<i64, i64> = rules! {
            "A" => |s: i64, _: &i64, _| s,
            "B" => {
                0 => |s: i64, _: &i64, _| s,
                "C" => |s: i64, _: &i64, _| s,
            },
            "D" => |s: i64, _: &i64, _| s
        };

        let keys: Vec<_> = rules.iter().map(|(k, _)| k.as_str().to_string()).collect();
        assert_eq!(keys, vec!["A", "B", "D"]);
        match rules.get("B") {
            Some(Rule::Mapping(inner)) => {
                assert!(matches!(inner.get(0), Some(Rule::Handler(_))));
                assert!(matches!(inner.get("C"), Some(Rule::Handler(_))));
            }
            other => panic!("expected a mapping, got {other:?}"),
        }
    }

    #[test]
    fn empty_tree() {
        let rules: RuleMap<i64, i64> = rules! {};
        assert!(rules.is_empty());
    }
}
