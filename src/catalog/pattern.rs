//! Pattern and case analysis over dimension value lists.
//!
//! Pure functions: no I/O, no caching. The catalog feeds these the value
//! list it discovered and exposes the results alongside it.

use serde::{Deserialize, Serialize};

/// Dominant case convention of a value set.
///
/// Drives whether generated predicates compare case-insensitively: a
/// Title Case value set matched against lowercase entity text must not use
/// a raw `=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseConvention {
    Upper,
    Lower,
    Title,
    Mixed,
}

/// Kind of structural pattern detected in a value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Prefix,
    Suffix,
    FixedLength,
}

/// A reusable pattern shared by several values, usable as a
/// `LIKE 'prefix%'`-style predicate instead of an exact IN-list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePattern {
    pub kind: PatternKind,
    pub pattern: String,
    pub matching_values: Vec<String>,
}

impl ValuePattern {
    /// SQL LIKE pattern for this detected pattern, with LIKE wildcards in
    /// the underlying values escaped.
    pub fn like_pattern(&self) -> String {
        let escaped = self.pattern.replace('%', "\\%").replace('_', "\\_");
        match self.kind {
            PatternKind::Prefix => format!("{}%", escaped),
            PatternKind::Suffix => format!("%{}", escaped),
            PatternKind::FixedLength => "_".repeat(self.pattern.len()),
        }
    }
}

/// Classify the case convention of a value list.
pub fn detect_case_convention(values: &[String]) -> CaseConvention {
    let mut upper = 0usize;
    let mut lower = 0usize;
    let mut title = 0usize;
    let mut total = 0usize;

    for v in values {
        if !v.chars().any(|c| c.is_alphabetic()) {
            continue;
        }
        total += 1;
        if v.chars().all(|c| !c.is_lowercase()) {
            upper += 1;
        } else if v.chars().all(|c| !c.is_uppercase()) {
            lower += 1;
        } else if is_title_case(v) {
            title += 1;
        }
    }

    if total == 0 {
        return CaseConvention::Mixed;
    }
    if upper == total {
        CaseConvention::Upper
    } else if lower == total {
        CaseConvention::Lower
    } else if title == total {
        CaseConvention::Title
    } else {
        CaseConvention::Mixed
    }
}

fn is_title_case(v: &str) -> bool {
    v.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .all(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() => {
                    first.is_uppercase() && !chars.any(|c| c.is_uppercase())
                }
                _ => true,
            }
        })
}

/// Minimum characters for a prefix/suffix to count as a pattern.
const MIN_PATTERN_LEN: usize = 3;

/// Detect prefix, suffix, and fixed-length patterns in a value list.
///
/// A prefix/suffix qualifies when shared by at least two values and at
/// least `MIN_PATTERN_LEN` characters long. The longest qualifying
/// pattern of each kind is reported.
pub fn detect_patterns(values: &[String]) -> Vec<ValuePattern> {
    let mut patterns = vec![];

    if let Some(p) = best_affix(values, Affix::Prefix) {
        patterns.push(p);
    }
    if let Some(p) = best_affix(values, Affix::Suffix) {
        patterns.push(p);
    }

    if values.len() >= 2 {
        let len = values[0].chars().count();
        if len > 0 && values.iter().all(|v| v.chars().count() == len) {
            patterns.push(ValuePattern {
                kind: PatternKind::FixedLength,
                pattern: values[0].clone(),
                matching_values: values.to_vec(),
            });
        }
    }

    patterns
}

#[derive(Clone, Copy)]
enum Affix {
    Prefix,
    Suffix,
}

fn best_affix(values: &[String], affix: Affix) -> Option<ValuePattern> {
    if values.len() < 2 {
        return None;
    }

    // Sort (reversed for suffixes) so shared affixes become adjacent, then
    // take the longest affix any adjacent pair shares.
    let keyed: Vec<String> = match affix {
        Affix::Prefix => {
            let mut v = values.to_vec();
            v.sort_unstable();
            v
        }
        Affix::Suffix => {
            let mut v: Vec<String> = values.iter().map(|s| reverse(s)).collect();
            v.sort_unstable();
            v
        }
    };

    let mut best = String::new();
    for pair in keyed.windows(2) {
        let common = common_prefix(&pair[0], &pair[1]);
        if common.chars().count() > best.chars().count() {
            best = common;
        }
    }

    if best.chars().count() < MIN_PATTERN_LEN {
        return None;
    }

    let (kind, pattern) = match affix {
        Affix::Prefix => (PatternKind::Prefix, best),
        Affix::Suffix => (PatternKind::Suffix, reverse(&best)),
    };

    let matching: Vec<String> = values
        .iter()
        .filter(|v| match kind {
            PatternKind::Prefix => v.starts_with(&pattern),
            PatternKind::Suffix => v.ends_with(&pattern),
            PatternKind::FixedLength => unreachable!(),
        })
        .cloned()
        .collect();

    if matching.len() < 2 {
        return None;
    }

    Some(ValuePattern {
        kind,
        pattern,
        matching_values: matching,
    })
}

fn common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

fn reverse(s: &str) -> String {
    s.chars().rev().collect()
}
