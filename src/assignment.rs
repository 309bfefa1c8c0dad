//! Most-likely assignment extraction.
//!
//! A pure read over a (typically converged) [`MatrixStore`]: for every
//! stored matrix in canonical orientation and for every row, the column
//! item with the maximum probability wins; exact ties go to the earlier
//! column, so extraction is deterministic in declaration order.

use alloc::string::String;

use hashbrown::HashMap;

use crate::category::Item;
use crate::store::MatrixStore;

/// The `(item, category) → most-likely item` table read off a store.
///
/// Recomputed on demand; never cached inside the store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Assignments {
    entries: HashMap<(Item, String), Item>,
}

impl Assignments {
    /// Extract the table from `store` without mutating it.
    pub fn extract(store: &MatrixStore) -> Self {
        let mut entries = HashMap::new();
        let n = store.category_count();
        for a in 0..n {
            for b in a + 1..n {
                if !store.relation_exists(a, b) {
                    continue;
                }
                let row_items = store.categories()[a].items();
                let col_items = store.categories()[b].items();
                let col_name = store.categories()[b].name();
                for (r, row_item) in row_items.iter().enumerate() {
                    let mut best = 0;
                    let mut best_p = store.cell(a, b, r, 0);
                    for c in 1..col_items.len() {
                        let p = store.cell(a, b, r, c);
                        if p > best_p {
                            best = c;
                            best_p = p;
                        }
                    }
                    entries.insert(
                        (row_item.clone(), String::from(col_name)),
                        col_items[best].clone(),
                    );
                }
            }
        }
        Self { entries }
    }

    /// The most likely `category` item paired with `item`, if the pairing
    /// was extracted.
    pub fn best(&self, item: &Item, category: &str) -> Option<&Item> {
        self.entries
            .get(&(item.clone(), String::from(category)))
    }

    /// Iterate all `((item, category), best_match)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&(Item, String), &Item)> {
        self.entries.iter()
    }

    /// Number of extracted pairings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn store() -> MatrixStore {
        MatrixStore::new(vec![
            (
                String::from("Vintage"),
                vec![Item::from(1984), Item::from(1988), Item::from(1992), Item::from(1996)],
            ),
            (
                String::from("Wine"),
                vec![
                    Item::from("Annata Branco"),
                    Item::from("Bianca Flaux"),
                    Item::from("Ece Suss"),
                    Item::from("Vendemmia"),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_argmax_row() {
        let mut s = store();
        for (c, v) in [(0, 0.01), (1, 0.01), (2, 1.0), (3, 0.01)] {
            s.set_cell("Vintage", "Wine", 0, c, v).unwrap();
        }
        let table = Assignments::extract(&s);
        assert_eq!(
            table.best(&Item::from(1984), "Wine"),
            Some(&Item::from("Ece Suss"))
        );
    }

    #[test]
    fn test_tie_breaks_to_earlier_column() {
        let table = Assignments::extract(&store());
        // Uniform matrix: every probability ties, first column wins.
        assert_eq!(
            table.best(&Item::from(1992), "Wine"),
            Some(&Item::from("Annata Branco"))
        );
    }

    #[test]
    fn test_one_entry_per_row_per_pair() {
        let table = Assignments::extract(&store());
        assert_eq!(table.len(), 4);
        assert!(!table.is_empty());
        assert_eq!(table.iter().count(), 4);
    }

    #[test]
    fn test_extraction_does_not_mutate_store() {
        let s = store();
        let before = s.clone();
        let _ = Assignments::extract(&s);
        let (va, vb) = (
            before.view("Vintage", "Wine").unwrap(),
            s.view("Vintage", "Wine").unwrap(),
        );
        for r in 0..4 {
            for c in 0..4 {
                assert_eq!(va.get(r, c), vb.get(r, c));
            }
        }
    }

    #[test]
    fn test_unknown_lookup_is_none() {
        let table = Assignments::extract(&store());
        assert_eq!(table.best(&Item::from(1984), "Type"), None);
        assert_eq!(table.best(&Item::from(2024), "Wine"), None);
    }
}
