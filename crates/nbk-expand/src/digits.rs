use std::collections::BTreeSet;

/// Every decimal digit in `s`, in order, duplicates kept. Non-digit
/// characters are discarded.
pub fn digits_of(s: &str) -> Vec<u8> {
    s.bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect()
}

/// Distinct decimal digits in `s`. Non-digit characters are discarded.
pub fn digit_set(s: &str) -> BTreeSet<u8> {
    digits_of(s).into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_of_keeps_duplicates_and_order() {
        assert_eq!(digits_of("3a1-1 9"), vec![3, 1, 1, 9]);
        assert!(digits_of("abc").is_empty());
    }

    #[test]
    fn digit_set_dedupes() {
        let s = digit_set("1,2,2,1 x");
        assert_eq!(s.into_iter().collect::<Vec<_>>(), vec![1, 2]);
    }
}
