//! Column-name sanitization.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use unicode_normalization::UnicodeNormalization;

/// Substituted when a name is empty after cleaning.
pub const EMPTY_KEY_PLACEHOLDER: &str = "unnamed";

fn is_invisible(ch: char) -> bool {
    matches!(
        ch,
        '\u{FEFF}'
            | '\u{00AD}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{2069}'
    ) || (ch.is_control() && !ch.is_whitespace())
}

/// NFC-normalizes a column name, drops invisible and control characters,
/// collapses whitespace runs (NBSP included) and trims.
pub fn sanitize_key(raw: &str) -> String {
    let cleaned: String = raw.nfc().filter(|ch| !is_invisible(*ch)).collect();
    let collapsed = cleaned.split_whitespace().join(" ");
    if collapsed.is_empty() {
        EMPTY_KEY_PLACEHOLDER.to_string()
    } else {
        collapsed
    }
}

/// Memoizing sanitizer that keeps names unique across distinct raw keys.
///
/// The first raw key to claim a cleaned name keeps it; later raw keys that
/// clean to the same name get `_2`, `_3`, ... in encounter order.
#[derive(Debug, Default)]
pub struct KeySanitizer {
    resolved: HashMap<String, String>,
    taken: HashSet<String>,
}

impl KeySanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&mut self, raw: &str) -> String {
        if let Some(existing) = self.resolved.get(raw) {
            return existing.clone();
        }
        let base = sanitize_key(raw);
        let mut candidate = base.clone();
        let mut suffix = 2usize;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        self.resolved.insert(raw.to_string(), candidate.clone());
        candidate
    }
}
