//! Type string derivation.

/// Join `prefix` and `key` with `divider`.
///
/// Empty segments are omitted: an empty prefix yields `key`, an empty key
/// yields `prefix`. Dividers occurring inside keys are not escaped.
pub fn make_type(prefix: &str, divider: &str, key: &str) -> String {
    match (prefix.is_empty(), key.is_empty()) {
        (true, _) => key.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => {
            let mut out = String::with_capacity(prefix.len() + divider.len() + key.len());
            out.push_str(prefix);
            out.push_str(divider);
            out.push_str(key);
            out
        }
    }
}
