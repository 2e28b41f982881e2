//! Per-product stock delta computation.
//!
//! The reconciler feeds this module *resolved* quantities — line items whose
//! product references already went through the catalog. Everything here is
//! pure arithmetic over maps, which keeps the composition law testable:
//! create, any chain of updates (each based on the immediately prior state)
//! and delete must net out to zero per product.

use std::collections::BTreeMap;

use billbook_products::ProductId;

/// Signed per-product adjustments ready to apply to the stock store.
pub type DeltaMap = BTreeMap<ProductId, i64>;

/// Sum quantities per product.
///
/// A document may reference the same product on several lines; they aggregate
/// before delta computation.
pub fn aggregate_quantities(
    items: impl IntoIterator<Item = (ProductId, i64)>,
) -> BTreeMap<ProductId, i64> {
    let mut totals: BTreeMap<ProductId, i64> = BTreeMap::new();
    for (product, qty) in items {
        *totals.entry(product).or_insert(0) += qty;
    }
    totals
}

/// Net signed delta per product between two aggregated quantity maps.
///
/// `direction` is the document type's stock direction (+1 or -1). Products
/// absent from `new` are fully reversed; products absent from `prior` count
/// in full. Zero deltas are omitted — they would be no-op writes.
pub fn signed_deltas(
    direction: i64,
    prior: &BTreeMap<ProductId, i64>,
    new: &BTreeMap<ProductId, i64>,
) -> DeltaMap {
    let mut deltas: DeltaMap = BTreeMap::new();

    for (product, qty) in new {
        let before = prior.get(product).copied().unwrap_or(0);
        deltas.insert(*product, direction * (qty - before));
    }
    for (product, qty) in prior {
        deltas.entry(*product).or_insert(direction * -qty);
    }

    deltas.retain(|_, delta| *delta != 0);
    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_core::AggregateId;

    fn pid() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    #[test]
    fn duplicate_lines_aggregate_before_diffing() {
        let p = pid();
        let totals = aggregate_quantities([(p, 3), (p, 4)]);
        assert_eq!(totals.get(&p), Some(&7));
    }

    #[test]
    fn create_is_the_empty_to_items_diff() {
        let p = pid();
        let new = aggregate_quantities([(p, 10)]);
        let deltas = signed_deltas(1, &BTreeMap::new(), &new);
        assert_eq!(deltas.get(&p), Some(&10));
    }

    #[test]
    fn delete_reverses_the_full_magnitude() {
        let p = pid();
        let prior = aggregate_quantities([(p, 10)]);
        let deltas = signed_deltas(1, &prior, &BTreeMap::new());
        assert_eq!(deltas.get(&p), Some(&-10));
    }

    #[test]
    fn update_diffs_against_the_prior_state() {
        let p = pid();
        let prior = aggregate_quantities([(p, 10)]);
        let new = aggregate_quantities([(p, 6)]);
        let deltas = signed_deltas(1, &prior, &new);
        assert_eq!(deltas.get(&p), Some(&-4));
    }

    #[test]
    fn returns_invert_the_sign() {
        let p = pid();
        let new = aggregate_quantities([(p, 5)]);
        let deltas = signed_deltas(-1, &BTreeMap::new(), &new);
        assert_eq!(deltas.get(&p), Some(&-5));
    }

    #[test]
    fn unchanged_products_are_omitted() {
        let p = pid();
        let q = pid();
        let prior = aggregate_quantities([(p, 10), (q, 2)]);
        let new = aggregate_quantities([(p, 10), (q, 5)]);
        let deltas = signed_deltas(1, &prior, &new);
        assert!(!deltas.contains_key(&p));
        assert_eq!(deltas.get(&q), Some(&3));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Quantity maps over a small fixed product universe so updates
        /// actually touch the same products.
        fn quantity_map() -> impl Strategy<Value = BTreeMap<ProductId, i64>> {
            let universe: Vec<ProductId> = (0..4).map(|_| pid()).collect();
            prop::collection::vec((0usize..4, 1i64..100), 0..6).prop_map(move |pairs| {
                aggregate_quantities(
                    pairs
                        .into_iter()
                        .map(|(idx, qty)| (universe[idx], qty)),
                )
            })
        }

        proptest! {
            /// create + updates (each based on the prior state) + delete
            /// composes to a net-zero adjustment for every product.
            #[test]
            fn full_lifecycle_nets_to_zero(
                direction in prop_oneof![Just(1i64), Just(-1i64)],
                states in prop::collection::vec(quantity_map(), 1..5),
            ) {
                let mut stock: BTreeMap<ProductId, i64> = BTreeMap::new();
                let empty = BTreeMap::new();

                let mut prior = &empty;
                for state in &states {
                    for (product, delta) in signed_deltas(direction, prior, state) {
                        *stock.entry(product).or_insert(0) += delta;
                    }
                    prior = state;
                }
                for (product, delta) in signed_deltas(direction, prior, &empty) {
                    *stock.entry(product).or_insert(0) += delta;
                }

                prop_assert!(stock.values().all(|v| *v == 0));
            }

            /// No zero entries ever survive into the delta map.
            #[test]
            fn zero_deltas_are_omitted(
                a in quantity_map(),
                b in quantity_map(),
            ) {
                let deltas = signed_deltas(1, &a, &b);
                prop_assert!(deltas.values().all(|v| *v != 0));
            }
        }
    }
}
