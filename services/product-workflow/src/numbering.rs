//! Yearly sequence numbers: `RFQ-2026-001`, `PRJ-2026-014`.

pub const RFQ_PREFIX: &str = "RFQ";
pub const PROJECT_PREFIX: &str = "PRJ";

/// The part shared by every number of `kind` issued in `year`, e.g. `RFQ-2026-`.
pub fn year_prefix(kind: &str, year: i32) -> String {
    format!("{}-{}-", kind, year)
}

/// The number following the highest sequence `last` issued this year.
pub fn next_number(kind: &str, year: i32, last: i64) -> String {
    format!("{}{:03}", year_prefix(kind, year), last + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_numbers_of_the_year() {
        assert_eq!(next_number(RFQ_PREFIX, 2026, 0), "RFQ-2026-001");
        assert_eq!(next_number(PROJECT_PREFIX, 2026, 41), "PRJ-2026-042");
    }

    #[test]
    fn test_sequence_grows_past_three_digits() {
        assert_eq!(next_number(RFQ_PREFIX, 2027, 999), "RFQ-2027-1000");
    }

    proptest! {
        #[test]
        fn prop_number_carries_prefix_and_sequence(year in 2000i32..2100, existing in 0i64..5000) {
            let number = next_number(RFQ_PREFIX, year, existing);
            let prefix = year_prefix(RFQ_PREFIX, year);
            prop_assert!(number.starts_with(&prefix));
            let sequence: i64 = number[prefix.len()..].parse().unwrap();
            prop_assert_eq!(sequence, existing + 1);
        }
    }
}
