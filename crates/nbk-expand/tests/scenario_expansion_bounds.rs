//! Size bounds and totals for the expansion engine across many inputs.

use std::collections::BTreeSet;

use nbk_expand::{cross_product, harup, harup_total, range, CrossOptions};
use nbk_grid::{Amount, Grid};

fn dedupe(d: &[u8]) -> usize {
    d.iter().collect::<BTreeSet<_>>().len()
}

/// All small digit sequences drawn from a fixed pool, duplicates included.
fn sequences() -> Vec<Vec<u8>> {
    vec![
        vec![1],
        vec![1, 1],
        vec![0, 9],
        vec![1, 2, 3],
        vec![3, 3, 2, 1, 1],
        vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
        vec![5, 5, 5, 5],
    ]
}

#[test]
fn cross_product_never_exceeds_deduped_product() {
    for a in sequences() {
        for b in sequences() {
            for remove_self_pairs in [false, true] {
                let plain = cross_product(
                    &a,
                    &b,
                    CrossOptions {
                        remove_self_pairs,
                        reverse: false,
                    },
                )
                .unwrap();
                assert!(plain.len() <= dedupe(&a) * dedupe(&b), "a={a:?} b={b:?}");

                let reversed = cross_product(
                    &a,
                    &b,
                    CrossOptions {
                        remove_self_pairs,
                        reverse: true,
                    },
                )
                .unwrap();
                assert!(reversed.len() <= 2 * dedupe(&a) * dedupe(&b), "a={a:?} b={b:?}");
                assert!(reversed.is_superset(&plain));
            }
        }
    }
}

#[test]
fn range_has_exactly_end_minus_start_plus_one_keys() {
    for start in (0u8..=99).step_by(7) {
        for end in start..=99 {
            assert_eq!(range(start, end).unwrap().len(), (end - start) as usize + 1);
        }
        if start > 0 {
            assert!(range(start, start - 1).is_err());
        }
    }
}

#[test]
fn harup_total_is_amount_times_digit_count_even_with_overlap() {
    let pools: [&[u8]; 4] = [&[], &[1], &[1, 2], &[0, 4, 9]];
    let amount = Amount::from_units(70);
    for lead in pools {
        for trail in pools {
            let lead: BTreeSet<u8> = lead.iter().copied().collect();
            let trail: BTreeSet<u8> = trail.iter().copied().collect();
            if lead.is_empty() && trail.is_empty() {
                continue;
            }
            let deltas = harup(&lead, &trail, amount).unwrap();
            let grid = Grid::from_cells(deltas).unwrap();
            let expected = harup_total(&lead, &trail, amount).unwrap();
            assert_eq!(grid.total(), expected, "lead={lead:?} trail={trail:?}");
        }
    }
}

#[test]
fn harup_overlapping_cell_gets_both_contributions() {
    let lead: BTreeSet<u8> = [4].into_iter().collect();
    let trail: BTreeSet<u8> = [2].into_iter().collect();
    let grid = Grid::from_cells(harup(&lead, &trail, Amount::from_units(100)).unwrap()).unwrap();
    assert_eq!(grid.get("42".parse().unwrap()), Amount::from_units(20));
    assert_eq!(grid.get("41".parse().unwrap()), Amount::from_units(10));
    assert_eq!(grid.len(), 19);
}
