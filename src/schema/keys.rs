//! Field name → wire key resolution.
use serde::Deserialize;

/// Rule turning a declared field name into its JSON key when the field
/// carries no explicit override. Fixed per type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    #[default]
    Original,
    SnakeCase,
}

impl KeyStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStrategy::Original => "original",
            KeyStrategy::SnakeCase => "snake_case",
        }
    }
}

/// Resolve the wire key for `name`. An override always wins, untouched.
pub fn resolve_key(name: &str, key_override: Option<&str>, strategy: KeyStrategy) -> String {
    match (key_override, strategy) {
        (Some(key), _) => key.to_string(),
        (None, KeyStrategy::Original) => name.to_string(),
        (None, KeyStrategy::SnakeCase) => to_snake_case(name),
    }
}

/// Separators go only at a lower→upper boundary, so acronym runs stay glued
/// (`userID` → `user_id`, `HTTPServer` → `httpserver`).
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_uppercase() && prev.is_some_and(char::is_lowercase) {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
        prev = Some(ch);
    }
    out
}
