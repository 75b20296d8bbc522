//! `.properties` files and the layered property loading built on them.
//!
//! [`PropertySet`] holds parsed `key=value` content in file order.
//! [`PropertyStore`] finds property files on the template path or through the
//! [`ResourceLocator`](crate::resources::ResourceLocator).
//!
//! # Format
//!
//! ```text
//! # comment
//! ! also a comment
//! project.name = Texen
//! project.owner: Apache
//! project.summary A generator \
//!     spanning two lines
//! unicode.value = café
//! ```
//!
//! Keys end at the first unescaped `=`, `:` or whitespace. Leading whitespace
//! of a value is dropped; trailing whitespace is kept. A line ending in an odd
//! number of backslashes continues on the next line.

mod store;

pub use store::{PropertyLoad, PropertyStore, TEMPLATE_PATH_PLACEHOLDERS};

use crate::encoding::decode_latin1;
use crate::utils::OrderedMap;

/// Parsed property entries, in the order they were first defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    entries: OrderedMap<String>,
}

impl PropertySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse property text. Later duplicates of a key overwrite earlier ones.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut set = Self::new();
        for line in logical_lines(text) {
            let (key, value) = split_entry(&line);
            set.set(key, value);
        }
        set
    }

    /// Parse raw bytes as UTF-8, falling back to ISO-8859-1 when they are not.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::parse(text),
            Err(_) => Self::parse(&decode_latin1(bytes)),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Boolean lookup using the vocabulary of [`PropertySet::test_boolean`].
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Self::test_boolean).unwrap_or(default)
    }

    /// Interpret a string as a boolean.
    ///
    /// `true`/`on`/`yes` and `false`/`off`/`no` are accepted, ignoring case;
    /// anything else is `None`.
    pub fn test_boolean(value: &str) -> Option<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" => Some(true),
            "false" | "off" | "no" => Some(false),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key, value.as_str()))
    }

    /// Entries whose key starts with `prefix`.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter(move |(key, _)| key.starts_with(prefix))
    }

    /// Copy every entry of `other` into this set; `other` wins on conflicts.
    pub fn merge(&mut self, other: &PropertySet) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries as a flat JSON object, for exposure to templates.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(key, value)| (key.to_string(), serde_json::Value::String(value.to_string())))
                .collect(),
        )
    }
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// Join continuation lines and drop comments and blank lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut pending: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim_start_matches(is_blank);
        let mut current = match pending.take() {
            Some(mut joined) => {
                joined.push_str(line);
                joined
            }
            None => {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                line.to_string()
            }
        };

        let trailing = current.chars().rev().take_while(|&c| c == '\\').count();
        if trailing % 2 == 1 {
            current.pop();
            pending = Some(current);
        } else {
            lines.push(current);
        }
    }

    if let Some(joined) = pending {
        lines.push(joined);
    }
    lines
}

fn split_entry(line: &str) -> (String, String) {
    let mut key_end = line.len();
    let mut escaped = false;
    for (pos, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            key_end = pos;
            break;
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches(is_blank);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(is_blank);
    }

    (unescape(key), unescape(rest))
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => out.push(decoded),
                    _ => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
