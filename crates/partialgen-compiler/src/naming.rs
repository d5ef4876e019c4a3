//! Naming helpers for generated members
//!
//! Labels are the PascalCase stem every generated name is built from
//! (`OnHealthChanged`, `SubscribeToHealth`); their camelCase form names
//! backing fields (`_healthHandle`).

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Prefixes of conventional Unity field names that never belong in a label
const FIELD_PREFIXES: &[&str] = &["m_", "s_", "k_"];

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class", "const",
    "continue", "decimal", "default", "delegate", "do", "double", "else", "enum", "event", "explicit", "extern",
    "false", "finally", "fixed", "float", "for", "foreach", "goto", "if", "implicit", "in", "int", "interface",
    "internal", "is", "lock", "long", "namespace", "new", "null", "object", "operator", "out", "override",
    "params", "private", "protected", "public", "readonly", "ref", "return", "sbyte", "sealed", "short",
    "sizeof", "stackalloc", "static", "string", "struct", "switch", "this", "throw", "true", "try", "typeof",
    "uint", "ulong", "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

fn word_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("word separator pattern is valid"))
}

fn identifier_pattern() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^@?[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"))
}

/// Convert a member or action name to a PascalCase label
///
/// `m_health` becomes `Health`, `jump-action` becomes `JumpAction` and a
/// map-qualified action such as `Gameplay/Jump` becomes `GameplayJump`. Every
/// character that cannot appear in an identifier separates words. Letters
/// after the first of each word keep their case so `HPBar` stays `HPBar`.
///
/// The result may still be unusable (empty, or starting with a digit); check
/// it with [`is_valid_identifier`].
pub fn to_label(name: &str) -> String {
    let mut trimmed = name.trim().trim_start_matches('@');
    for prefix in FIELD_PREFIXES {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            trimmed = rest;
            break;
        }
    }

    let mut label = String::with_capacity(trimmed.len());
    for word in word_separator().split(trimmed).filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            label.extend(first.to_uppercase());
            label.push_str(chars.as_str());
        }
    }
    label
}

/// Convert a PascalCase label to camelCase, lower-casing a leading acronym
///
/// `Health` → `health`, `HPBar` → `hpBar`, `UI` → `ui`.
pub fn to_camel_case(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    let upper_run = chars.iter().take_while(|c| c.is_uppercase()).count();

    let lower_count = match upper_run {
        0 => 0,
        n if n == chars.len() => n,
        1 => 1,
        // The last capital of a run starts the next word
        n if chars[n].is_lowercase() => n - 1,
        n => n,
    };

    chars
        .iter()
        .enumerate()
        .flat_map(|(i, c)| {
            if i < lower_count {
                c.to_lowercase().collect::<Vec<_>>()
            } else {
                vec![*c]
            }
        })
        .collect()
}

/// Remove the first matching suffix, unless nothing would remain
pub fn strip_suffix<'a>(name: &'a str, suffixes: &[&str]) -> &'a str {
    suffixes
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix).filter(|rest| !rest.is_empty()))
        .unwrap_or(name)
}

/// Whether `name` is a syntactically valid C# identifier
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_match(name)
}

pub fn is_keyword(name: &str) -> bool {
    CSHARP_KEYWORDS.contains(&name)
}

/// Prefix C# keywords with `@` so they can be used as identifiers
pub fn escape_keyword(name: &str) -> String {
    if is_keyword(name) {
        format!("@{}", name)
    } else {
        name.to_string()
    }
}

/// Hands out unique names within one declaration
///
/// The first request for a name returns it unchanged; later requests for the
/// same base get `_1`, `_2`, ... skipping anything already taken.
#[derive(Debug, Default, Clone)]
pub struct NameAllocator {
    taken: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a unique name derived from `base`
    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }

        let counter = self.counters.entry(base.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}_{}", base, counter);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }
}
