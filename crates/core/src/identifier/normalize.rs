//! Plan and lot canonicalization.
//!
//! Pure string functions shared by the parser and the query builders.

/// Widest lot range that is expanded. Wider ranges are kept as a literal token.
pub const MAX_LOT_RANGE: u64 = 500;

/// Canonicalizes a plan code: uppercase, alphanumerics only.
///
/// ```
/// use parcelkit_core::identifier::normalize_plan;
///
/// assert_eq!(normalize_plan(" dp 1242624 "), "DP1242624");
/// assert_eq!(normalize_plan("S.P-12345"), "SP12345");
/// ```
pub fn normalize_plan(plan: &str) -> String {
    plan.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Canonicalizes a lot token: uppercase, alphanumerics and `-` only.
///
/// The dash survives so that ranges like `1-3` can be expanded afterwards.
pub fn normalize_lot(lot: &str) -> String {
    lot.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Expands a numeric lot range into individual lots.
///
/// Descending ranges are walked downwards. Anything that is not a
/// `<digits>-<digits>` range, or spans more than [`MAX_LOT_RANGE`] lots, is
/// returned unchanged as a single element.
///
/// ```
/// use parcelkit_core::identifier::expand_lot_range;
///
/// assert_eq!(expand_lot_range("1-3"), vec!["1", "2", "3"]);
/// assert_eq!(expand_lot_range("3-1"), vec!["3", "2", "1"]);
/// assert_eq!(expand_lot_range("7A"), vec!["7A"]);
/// ```
pub fn expand_lot_range(lot: &str) -> Vec<String> {
    let Some((start, end)) = parse_range(lot) else {
        return vec![lot.to_string()];
    };

    if start.abs_diff(end) >= MAX_LOT_RANGE {
        return vec![lot.to_string()];
    }

    if start <= end {
        (start..=end).map(|n| n.to_string()).collect()
    } else {
        (end..=start).rev().map(|n| n.to_string()).collect()
    }
}

/// Returns the leading letters of a canonical plan code (`"DP1242624"` → `"DP"`).
pub fn plan_prefix(plan: &str) -> &str {
    let end = plan
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(plan.len());
    &plan[..end]
}

fn parse_range(lot: &str) -> Option<(u64, u64)> {
    let (start, end) = lot.split_once('-')?;
    if start.is_empty() || end.is_empty() {
        return None;
    }
    if !start.bytes().all(|b| b.is_ascii_digit()) || !end.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((start.parse().ok()?, end.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plan() {
        assert_eq!(normalize_plan("DP1242624"), "DP1242624");
        assert_eq!(normalize_plan("dp 1242624"), "DP1242624");
        assert_eq!(normalize_plan("  rp-912949 "), "RP912949");
        assert_eq!(normalize_plan(""), "");
        assert_eq!(normalize_plan("'; DROP"), "DROP");
    }

    #[test]
    fn test_normalize_lot() {
        assert_eq!(normalize_lot("13"), "13");
        assert_eq!(normalize_lot(" 7a "), "7A");
        assert_eq!(normalize_lot("1 - 3"), "1-3");
        assert_eq!(normalize_lot("1/3"), "13");
    }

    #[test]
    fn test_expand_ascending_range() {
        assert_eq!(expand_lot_range("1-3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_expand_descending_range() {
        assert_eq!(expand_lot_range("3-1"), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_expand_single_lot() {
        assert_eq!(expand_lot_range("5"), vec!["5"]);
        assert_eq!(expand_lot_range("5-5"), vec!["5"]);
    }

    #[test]
    fn test_non_numeric_ranges_pass_through() {
        assert_eq!(expand_lot_range("A-C"), vec!["A-C"]);
        assert_eq!(expand_lot_range("1-"), vec!["1-"]);
        assert_eq!(expand_lot_range("-4"), vec!["-4"]);
        assert_eq!(expand_lot_range("1-2-3"), vec!["1-2-3"]);
    }

    #[test]
    fn test_oversized_range_is_not_expanded() {
        assert_eq!(expand_lot_range("1-100000"), vec!["1-100000"]);
        assert_eq!(expand_lot_range("1-500").len(), 500);
        assert_eq!(expand_lot_range("1-501"), vec!["1-501"]);
    }

    #[test]
    fn test_plan_prefix() {
        assert_eq!(plan_prefix("DP1242624"), "DP");
        assert_eq!(plan_prefix("BUP1234"), "BUP");
        assert_eq!(plan_prefix("D12345"), "D");
        assert_eq!(plan_prefix("12345"), "");
        assert_eq!(plan_prefix("SP"), "SP");
    }
}
