//! Free-text shorthand parser.
//!
//! Each line is independent. After stripping a leading label and
//! normalizing separators, a line is tried against:
//!
//! 1. compact `digits=count=amount` (structural count check, then the
//!    cross-product of the digit set with itself)
//! 2. `12,21(100)`   list + parenthesized amount
//! 3. `12,21*100`    list + `*amount`
//! 4. `12,21==100`   list + one or more `=` + amount
//! 5. `1221=100`     one digit run split into two-digit keys + `=amount`
//!
//! The first shape that matches governs the line. Only two-character
//! tokens become keys. A line matching nothing is skipped; a compact line
//! with a bad count fails the whole submission.

use nbk_expand::{compact_keys, ExpandError};
use nbk_grid::{Amount, BetDirective, CellKey};
use tracing::debug;

use crate::IntakeError;

const OPERATORS: [char; 4] = ['=', '*', '(', ')'];

/// Parse a multi-line submission into directives, one per accepted line.
///
/// Returns an empty vec when nothing matched; the caller decides whether
/// that is an error.
pub fn parse_text(text: &str) -> Result<Vec<BetDirective>, IntakeError> {
    let mut out = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        match parse_line(raw, line_no)? {
            Some(d) => out.push(d),
            None => {
                if !raw.trim().is_empty() {
                    debug!(line = line_no, text = raw, "no recognized pattern; line skipped");
                }
            }
        }
    }
    Ok(out)
}

/// Parse one line. `Ok(None)` means no pattern matched.
pub fn parse_line(raw: &str, line_no: usize) -> Result<Option<BetDirective>, IntakeError> {
    let line = normalize_line(strip_label(raw));
    if line.is_empty() {
        return Ok(None);
    }

    if let Some((digits, count, amount)) = match_compact(&line) {
        let keys = compact_keys(digits, count).map_err(|e| match e {
            ExpandError::CountMismatch {
                digits,
                declared,
                with_self_pairs,
                without_self_pairs,
            } => IntakeError::StructuralValidation {
                line: line_no,
                digits,
                declared,
                with_self_pairs,
                without_self_pairs,
            },
            other => IntakeError::Expand(other),
        })?;
        if keys.is_empty() {
            return Ok(None);
        }
        let description = format!("{digits}={count} ({} keys) @ {amount}", keys.len());
        return Ok(Some(BetDirective::uniform(description, keys, amount)?));
    }

    let matched = match_parenthesized(&line)
        .or_else(|| match_star(&line))
        .or_else(|| match_equals_list(&line))
        .or_else(|| match_digit_run(&line));

    let Some((keys, amount)) = matched else {
        return Ok(None);
    };
    if keys.is_empty() {
        return Ok(None);
    }
    let description = format!(
        "{} @ {amount}",
        keys.iter()
            .map(CellKey::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );
    Ok(Some(BetDirective::uniform(description, keys, amount)?))
}

/// Drop a leading alphabetic label (`"ram: 12,21(50)"` -> `"12,21(50)"`).
pub fn strip_label(line: &str) -> &str {
    let t = line.trim();
    let label_end = t
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(t.len());
    if label_end == 0 {
        return t;
    }
    t[label_end..].trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '-')
}

/// Whitespace and period runs become a single comma; commas next to an
/// operator and at either end are dropped.
pub fn normalize_line(line: &str) -> String {
    let mut collapsed: Vec<char> = Vec::with_capacity(line.len());
    for c in line.trim().chars() {
        let c = if c.is_whitespace() || c == '.' { ',' } else { c };
        if c == ',' && collapsed.last() == Some(&',') {
            continue;
        }
        collapsed.push(c);
    }

    let mut out = String::with_capacity(collapsed.len());
    for (i, &c) in collapsed.iter().enumerate() {
        if c == ',' {
            let prev = i.checked_sub(1).and_then(|p| collapsed.get(p));
            let next = collapsed.get(i + 1);
            let touches_op = prev.is_some_and(|p| OPERATORS.contains(p))
                || next.is_some_and(|n| OPERATORS.contains(n));
            if touches_op {
                continue;
            }
        }
        out.push(c);
    }
    out.trim_matches(',').to_string()
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Digits separated by single commas, starting and ending with a digit.
fn is_list(s: &str) -> bool {
    !s.is_empty() && s.split(',').all(is_digits)
}

/// Free-text amounts are whole units and must be positive.
fn parse_amount(s: &str) -> Option<Amount> {
    if !is_digits(s) {
        return None;
    }
    Amount::parse(s).ok().filter(|a| a.is_positive())
}

/// Two-character tokens only, first occurrence wins.
fn list_keys(list: &str) -> Vec<CellKey> {
    let mut keys: Vec<CellKey> = Vec::new();
    for token in list.split(',') {
        if token.len() != 2 {
            continue;
        }
        if let Ok(k) = CellKey::parse(token) {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
    }
    keys
}

fn match_compact(line: &str) -> Option<(&str, usize, Amount)> {
    let mut parts = line.split('=');
    let (digits, count, amount) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || !is_list(digits) || !is_digits(count) {
        return None;
    }
    Some((digits, count.parse().ok()?, parse_amount(amount)?))
}

fn match_parenthesized(line: &str) -> Option<(Vec<CellKey>, Amount)> {
    let inner = line.strip_suffix(')')?;
    let (list, amount) = inner.rsplit_once('(')?;
    if !is_list(list) {
        return None;
    }
    Some((list_keys(list), parse_amount(amount)?))
}

fn match_star(line: &str) -> Option<(Vec<CellKey>, Amount)> {
    let (list, amount) = line.rsplit_once('*')?;
    if !is_list(list) {
        return None;
    }
    Some((list_keys(list), parse_amount(amount)?))
}

fn split_equals(line: &str) -> Option<(&str, Amount)> {
    let (list, rest) = line.split_once('=')?;
    let amount = rest.trim_start_matches('=');
    Some((list, parse_amount(amount)?))
}

/// A comma list, or a single token short enough to be a key.
fn match_equals_list(line: &str) -> Option<(Vec<CellKey>, Amount)> {
    let (list, amount) = split_equals(line)?;
    if !is_list(list) || (!list.contains(',') && list.len() > 2) {
        return None;
    }
    Some((list_keys(list), amount))
}

/// `1234=50` -> keys 12, 34. A trailing odd digit is not a key.
fn match_digit_run(line: &str) -> Option<(Vec<CellKey>, Amount)> {
    let (run, amount) = split_equals(line)?;
    if !is_digits(run) || run.len() < 2 {
        return None;
    }
    let chunks: Vec<&str> = run
        .as_bytes()
        .chunks(2)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect();
    Some((list_keys(&chunks.join(",")), amount))
}

// ---------------------------------------------------------------------------
// Live-typing formatting
// ---------------------------------------------------------------------------

fn group_pairs(digits: &str) -> Vec<&str> {
    digits
        .as_bytes()
        .chunks(2)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect()
}

/// Presentational comma insertion while typing.
///
/// Without `=`: a comma after every complete two-digit group. With a single
/// `=`: commas between the two-digit groups before it. Anything else
/// (labels, operators, compact notation) is returned unchanged.
pub fn auto_format_line(line: &str) -> String {
    let eq_count = line.matches('=').count();
    match eq_count {
        0 => {
            let digits: String = line.chars().filter(|c| *c != ',' && *c != ' ').collect();
            if !is_digits(&digits) {
                return line.to_string();
            }
            let groups = group_pairs(&digits);
            let mut out = groups.join(",");
            if groups.last().is_some_and(|g| g.len() == 2) {
                out.push(',');
            }
            out
        }
        1 => {
            let Some((left, right)) = line.split_once('=') else {
                return line.to_string();
            };
            let digits: String = left.chars().filter(|c| *c != ',' && *c != ' ').collect();
            if !is_digits(&digits) {
                return line.to_string();
            }
            format!("{}={}", group_pairs(&digits).join(","), right)
        }
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(d: &BetDirective) -> Vec<String> {
        d.deltas().iter().map(|(k, _)| k.to_string()).collect()
    }

    fn one(line: &str) -> BetDirective {
        parse_line(line, 1).unwrap().expect("line should match")
    }

    #[test]
    fn normalize_turns_spaces_and_periods_into_commas() {
        assert_eq!(normalize_line("12 34.56  78"), "12,34,56,78");
        assert_eq!(normalize_line(" 12 , 34 = 50 "), "12,34=50");
        assert_eq!(normalize_line("123 = 6 = 50"), "123=6=50");
        assert_eq!(normalize_line("12 21 (100)"), "12,21(100)");
    }

    #[test]
    fn label_is_stripped() {
        assert_eq!(strip_label("ram 12,21(50)"), "12,21(50)");
        assert_eq!(strip_label("Ram: 12"), "12");
        assert_eq!(strip_label("12 ram"), "12 ram");
    }

    #[test]
    fn parenthesized_amount() {
        let d = one("12,21(100)");
        assert_eq!(keys(&d), vec!["12", "21"]);
        assert_eq!(d.total(), Amount::from_units(200));
    }

    #[test]
    fn star_amount() {
        let d = one("05 50 55*20");
        assert_eq!(keys(&d), vec!["05", "50", "55"]);
        assert_eq!(d.total(), Amount::from_units(60));
    }

    #[test]
    fn equals_list_accepts_repeated_equals() {
        let d = one("11,22,33==10");
        assert_eq!(keys(&d), vec!["11", "22", "33"]);
        assert_eq!(d.total(), Amount::from_units(30));
        let single = one("07=40");
        assert_eq!(keys(&single), vec!["07"]);
    }

    #[test]
    fn digit_run_splits_into_pairs() {
        let d = one("123456=5");
        assert_eq!(keys(&d), vec!["12", "34", "56"]);
        let odd = one("12345=5");
        assert_eq!(keys(&odd), vec!["12", "34"]);
    }

    #[test]
    fn non_two_digit_tokens_are_dropped() {
        let d = one("1,12,123,45(10)");
        assert_eq!(keys(&d), vec!["12", "45"]);
    }

    #[test]
    fn duplicate_keys_collapse() {
        let d = one("12,12,21(10)");
        assert_eq!(keys(&d), vec!["12", "21"]);
        assert_eq!(d.total(), Amount::from_units(20));
    }

    #[test]
    fn compact_without_self_pairs() {
        let d = one("123=6=50");
        assert_eq!(d.deltas().len(), 6);
        assert_eq!(d.total(), Amount::from_units(300));
        assert!(d.deltas().iter().all(|(k, _)| !k.is_self_pair()));
    }

    #[test]
    fn compact_mismatch_is_structural_error() {
        let err = parse_line("12=5=10", 3).unwrap_err();
        assert_eq!(
            err,
            IntakeError::StructuralValidation {
                line: 3,
                digits: "12".to_string(),
                declared: 5,
                with_self_pairs: 4,
                without_self_pairs: 2,
            }
        );
    }

    #[test]
    fn unmatched_lines_are_skipped() {
        assert!(parse_line("hello there", 1).unwrap().is_none());
        assert!(parse_line("12,34", 1).unwrap().is_none());
        assert!(parse_line("12(0)", 1).unwrap().is_none());
        assert!(parse_line("", 1).unwrap().is_none());
    }

    #[test]
    fn parse_text_keeps_going_past_bad_lines() {
        let ds = parse_text("12,21(10)\nnonsense\n\n34*5").unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn parse_text_compact_failure_aborts_everything() {
        assert!(parse_text("12,21(10)\n12=5=10\n34*5").is_err());
    }

    #[test]
    fn auto_format_inserts_commas() {
        assert_eq!(auto_format_line("12"), "12,");
        assert_eq!(auto_format_line("1234"), "12,34,");
        assert_eq!(auto_format_line("12345"), "12,34,5");
        assert_eq!(auto_format_line("1234=50"), "12,34=50");
        assert_eq!(auto_format_line("123=6=50"), "123=6=50");
        assert_eq!(auto_format_line("ram 12"), "ram 12");
    }
}
