//! Interpretation of yes/no style flag cells.

/// Values that count as "yes" once trimmed and upper-cased.
pub const POSITIVE_VALUES: &[&str] = &["1", "1.0", "YES", "Y", "TRUE", "T", "X"];

/// Total predicate over flag cells: anything outside [`POSITIVE_VALUES`],
/// including a missing cell, is negative.
pub fn is_positive(value: Option<&str>) -> bool {
    let Some(value) = value else {
        return false;
    };
    let normalized = value.trim().to_uppercase();
    POSITIVE_VALUES.contains(&normalized.as_str())
}
