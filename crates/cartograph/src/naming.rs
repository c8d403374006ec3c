//! D2 key normalization and collision handling.

use std::collections::HashSet;

/// Words with a meaning of their own in D2 maps. A key never equals one.
const RESERVED_KEYS: &[&str] = &[
    "label",
    "shape",
    "style",
    "class",
    "classes",
    "vars",
    "direction",
    "near",
    "icon",
    "tooltip",
    "link",
    "width",
    "height",
    "constraint",
    "top",
    "left",
    "grid-rows",
    "grid-columns",
    "grid-gap",
    "vertical-gap",
    "horizontal-gap",
    "source-arrowhead",
    "target-arrowhead",
    "desc",
    "layers",
    "scenarios",
    "steps",
    "imports",
    "filled",
];

/// Turns a component name into a lowercase snake_case D2 key.
///
/// `UserService` and `user-service` both become `user_service`. Keys never
/// start with a digit, are never empty and never equal a reserved word.
pub fn normalize_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;

    for c in name.chars() {
        if c.is_alphanumeric() {
            let boundary = c.is_uppercase()
                && previous.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if boundary && !key.ends_with('_') {
                key.push('_');
            }
            // Lowercasing may add combining marks, which are not word characters.
            for lower in c.to_lowercase() {
                if lower.is_alphanumeric() {
                    key.push(lower);
                } else if !key.is_empty() && !key.ends_with('_') {
                    key.push('_');
                }
            }
        } else if !key.is_empty() && !key.ends_with('_') {
            key.push('_');
        }
        previous = Some(c);
    }

    while key.ends_with('_') {
        key.pop();
    }
    if key.is_empty() {
        key.push_str("component");
    }
    if key.starts_with(|c: char| c.is_ascii_digit()) {
        key.insert_str(0, "n_");
    }
    if RESERVED_KEYS.contains(&key.as_str()) {
        key.push_str("_node");
    }
    key
}

/// Hands out unique keys in request order.
///
/// The first request for a base key gets it unchanged; later requests get
/// `_2`, `_3`, ... appended. Comparison is case-insensitive, like D2's.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    used: HashSet<String>,
}

impl KeyAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let base = base.to_lowercase();
        if self.used.insert(base.clone()) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Escapes text for a double-quoted D2 string.
pub fn escape_label(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => {}
            other => escaped.push(other),
        }
    }
    escaped
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn check_key_is_word(key: &str) -> Result<(), TestCaseError> {
        prop_assert!(!key.is_empty());
        prop_assert!(
            key.chars().all(|c| c.is_alphanumeric() || c == '_'),
            "key {key:?} contains a non-word character"
        );
        prop_assert!(!key.starts_with('_') && !key.ends_with('_'));
        prop_assert!(!key.starts_with(|c: char| c.is_ascii_digit()));
        prop_assert!(!RESERVED_KEYS.contains(&key));
        let source = format!("{key}: \"{key}\"\n");
        prop_assert!(
            cartograph_parser::parse(&source).is_ok(),
            "key {key:?} is rejected by the D2 reader"
        );
        Ok(())
    }

    fn check_allocations_unique(names: &[String]) -> Result<(), TestCaseError> {
        let mut keys = KeyAllocator::new();
        let mut seen = HashSet::new();
        for name in names {
            let key = keys.allocate(&normalize_key(name));
            prop_assert!(seen.insert(key.clone()), "duplicate key {key}");
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn normalized_keys_are_words(name in "\\PC{0,40}") {
            check_key_is_word(&normalize_key(&name))?;
        }

        #[test]
        fn allocated_keys_are_unique(names in prop::collection::vec("[A-Za-z_ -]{0,8}", 0..30)) {
            check_allocations_unique(&names)?;
        }
    }
}
