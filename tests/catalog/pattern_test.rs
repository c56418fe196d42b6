//! Dimension value analysis: case conventions and structural patterns.

use sqlloom::catalog::{
    detect_case_convention, detect_patterns, CaseConvention, DimensionValue, PatternKind,
    ValueSet,
};

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_title_case_detection() {
    let values = strings(&["Equity Growth", "Bond Income", "Money Market"]);
    assert_eq!(detect_case_convention(&values), CaseConvention::Title);
}

#[test]
fn test_upper_case_with_codes() {
    let values = strings(&["EQ-01", "BD-02", "MM-03"]);
    assert_eq!(detect_case_convention(&values), CaseConvention::Upper);
}

#[test]
fn test_mixed_case_when_conventions_disagree() {
    let values = strings(&["Equity", "bond", "MONEY"]);
    assert_eq!(detect_case_convention(&values), CaseConvention::Mixed);
}

#[test]
fn test_numeric_only_values_are_mixed() {
    let values = strings(&["100", "200"]);
    assert_eq!(detect_case_convention(&values), CaseConvention::Mixed);
}

#[test]
fn test_prefix_pattern_exposes_like_predicate() {
    let values = strings(&["Equity Growth", "Equity Value", "Equity Income", "Bond"]);
    let patterns = detect_patterns(&values);
    let prefix = patterns
        .iter()
        .find(|p| p.kind == PatternKind::Prefix)
        .expect("prefix pattern");
    assert_eq!(prefix.pattern, "Equity ");
    assert_eq!(prefix.matching_values.len(), 3);
    assert_eq!(prefix.like_pattern(), "Equity %");
}

#[test]
fn test_like_pattern_escapes_wildcards() {
    let values = strings(&["50%_off_a", "50%_off_b"]);
    let patterns = detect_patterns(&values);
    let prefix = patterns
        .iter()
        .find(|p| p.kind == PatternKind::Prefix)
        .expect("prefix pattern");
    assert!(prefix.like_pattern().contains("\\%"));
    assert!(prefix.like_pattern().contains("\\_"));
}

#[test]
fn test_fixed_length_codes() {
    let values = strings(&["USD", "EUR", "GBP"]);
    let patterns = detect_patterns(&values);
    assert!(patterns.iter().any(|p| p.kind == PatternKind::FixedLength));
}

#[test]
fn test_value_set_analysis_combines_everything() {
    let set = ValueSet::analyze(vec![
        DimensionValue {
            value: "Equity Growth".into(),
            count: 12,
        },
        DimensionValue {
            value: "Equity Value".into(),
            count: 4,
        },
        DimensionValue {
            value: "Bond Income".into(),
            count: 9,
        },
    ]);
    assert!(!set.implicit);
    assert_eq!(set.case_convention, CaseConvention::Title);
    assert!(set.patterns.iter().any(|p| p.kind == PatternKind::Prefix));
    assert_eq!(
        set.matching_values("equity"),
        vec!["Equity Growth", "Equity Value"]
    );
}

#[test]
fn test_implicit_value_set_matches_nothing() {
    let set = ValueSet::implicit();
    assert!(set.implicit);
    assert!(set.matching_values("anything").is_empty());
}
