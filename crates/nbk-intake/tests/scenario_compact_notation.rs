use nbk_grid::{Amount, CellKey};
use nbk_intake::{parse_text, IntakeError};

#[test]
fn scenario_compact_count_selects_self_pair_rule() {
    let without = parse_text("123=6=50").unwrap();
    assert_eq!(without.len(), 1);
    assert_eq!(without[0].deltas().len(), 6);
    assert_eq!(without[0].total(), Amount::from_units(300));

    let with = parse_text("123=9=50").unwrap();
    assert_eq!(with[0].deltas().len(), 9);
    assert!(with[0]
        .deltas()
        .iter()
        .any(|(k, _)| *k == CellKey::parse("22").unwrap()));
}

#[test]
fn scenario_compact_digits_are_deduplicated_before_counting() {
    // digits {1,2,3}: 9 or 6 regardless of repetition
    let ds = parse_text("1 2 3 3=6=10").unwrap();
    assert_eq!(ds[0].total(), Amount::from_units(60));
}

#[test]
fn scenario_compact_mismatch_reports_both_counts() {
    let err = parse_text("12(5)\n12=5=10").unwrap_err();
    assert_eq!(err.code(), "INTAKE_STRUCTURAL_VALIDATION");
    match err {
        IntakeError::StructuralValidation {
            line,
            with_self_pairs,
            without_self_pairs,
            ..
        } => {
            assert_eq!(line, 2);
            assert_eq!(with_self_pairs, 4);
            assert_eq!(without_self_pairs, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
