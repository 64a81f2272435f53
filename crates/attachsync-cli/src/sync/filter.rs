//! Record query filter expressions
//!
//! Values are embedded verbatim between single quotes. The record API has no
//! documented escape for `'`, so values containing one are logged and sent
//! as-is.

use attachsync_common::types::FieldId;
use tracing::warn;

/// Exact-match filter: `<fieldId> eq '<value>'`
pub fn equals(field_id: FieldId, value: &str) -> String {
    build(field_id, "eq", value)
}

/// Containment filter: `<fieldId> contains '<value>'`
pub fn contains(field_id: FieldId, value: &str) -> String {
    build(field_id, "contains", value)
}

fn build(field_id: FieldId, operator: &str, value: &str) -> String {
    if value.contains('\'') {
        warn!(
            field_id,
            value, "Filter value contains a single quote and is sent unescaped; the query may fail or match unexpected records"
        );
    }

    format!("{} {} '{}'", field_id, operator, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_filter() {
        assert_eq!(equals(1001, "ABC123"), "1001 eq 'ABC123'");
        assert_eq!(equals(1001, ""), "1001 eq ''");
    }

    #[test]
    fn test_contains_filter() {
        assert_eq!(
            contains(1004, "00000000-0000-0000-0000-000000000001"),
            "1004 contains '00000000-0000-0000-0000-000000000001'"
        );
    }

    #[test]
    fn test_quotes_are_not_escaped() {
        assert_eq!(equals(5, "O'Brien"), "5 eq 'O'Brien'");
    }
}
