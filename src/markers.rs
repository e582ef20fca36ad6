//! Null-marker policy.
//!
//! Sentinel strings such as `N/A` or `--` stand in for missing values in a
//! lot of exported data. When `use_null_markers_for_inference` is enabled they
//! are treated exactly like empty cells: excluded from every tally and
//! counted against completeness.

/// Default sentinel tokens, compared case-insensitively after trimming and
/// after dropping one leading `#`. Values made only of dashes always match.
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "na", "n/a", "n.a.", "null", "none", "nan", "unknown", "missing",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullMarkers {
    tokens: Vec<String>,
}

impl Default for NullMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_NULL_MARKERS.iter().copied())
    }
}

impl NullMarkers {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|token| token.as_ref().trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn matches(&self, value: &str) -> bool {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return false;
        }
        let lowered = trimmed.to_lowercase();
        let stripped = lowered.strip_prefix('#').unwrap_or(&lowered);
        if stripped.is_empty() {
            return false;
        }
        stripped.chars().all(|c| c == '-') || self.tokens.iter().any(|token| token == stripped)
    }
}
