//! Puzzle vocabulary — named categories and the items they contain.
//!
//! A logic-grid puzzle is declared as an ordered list of categories
//! (e.g. `Vintage`, `Wine`, `Type`), each holding an ordered list of
//! distinct items. Items are either numeric (years, prices — these
//! support order relations and exact-difference arithmetic) or textual
//! (names — these compare lexicographically and support no arithmetic).

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::EngineError;

// ─── Item ───────────────────────────────────────────────────────────────────

/// A single puzzle value within a category.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Item {
    /// Numeric item. Supports `<`/`>`/`=` relations and offset arithmetic.
    Num(i64),
    /// Textual item. Relations compare lexicographically; no arithmetic.
    Text(String),
}

impl Item {
    /// `true` for [`Item::Num`].
    pub fn is_num(&self) -> bool {
        matches!(self, Item::Num(_))
    }

    /// The item shifted by `diff`, or `None` for textual items.
    ///
    /// Used by exact-difference rules: `Num(1984).offset(4)` is `Num(1988)`.
    pub fn offset(&self, diff: i64) -> Option<Item> {
        match self {
            Item::Num(n) => n.checked_add(diff).map(Item::Num),
            Item::Text(_) => None,
        }
    }
}

impl From<i64> for Item {
    fn from(n: i64) -> Self {
        Item::Num(n)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::Text(String::from(s))
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::Text(s)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Num(n) => write!(f, "{n}"),
            Item::Text(s) => f.write_str(s),
        }
    }
}

// ─── Category ───────────────────────────────────────────────────────────────

/// A named puzzle dimension with an ordered sequence of distinct items.
///
/// Item order is significant: it fixes matrix row/column indices and the
/// tie-breaking order of assignment extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    name: String,
    items: Vec<Item>,
}

impl Category {
    /// Build a category, rejecting empty item lists and duplicate items.
    pub fn new(name: String, items: Vec<Item>) -> Result<Self, EngineError> {
        if items.is_empty() {
            return Err(EngineError::EmptyCategory(name));
        }
        for (i, item) in items.iter().enumerate() {
            if items[..i].contains(item) {
                return Err(EngineError::DuplicateItem {
                    item: item.clone(),
                    category: name,
                });
            }
        }
        Ok(Self { name, items })
    }

    /// The category name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The ordered item sequence.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `true` if the category has no items. Never true for a constructed
    /// category; present for completeness alongside [`Category::len`].
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Position of `item` in the declared order, if present.
    pub fn index_of(&self, item: &Item) -> Option<usize> {
        self.items.iter().position(|i| i == item)
    }

    /// `true` if `item` belongs to this category.
    pub fn contains(&self, item: &Item) -> bool {
        self.items.contains(item)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn test_item_ordering_numeric() {
        assert!(Item::from(1984) < Item::from(1996));
        assert_eq!(Item::from(1988), Item::from(1988));
    }

    #[test]
    fn test_item_ordering_textual() {
        assert!(Item::from("Annata Branco") < Item::from("Ece Suss"));
    }

    #[test]
    fn test_item_offset() {
        assert_eq!(Item::from(1984).offset(4), Some(Item::from(1988)));
        assert_eq!(Item::from(1984).offset(-4), Some(Item::from(1980)));
        assert_eq!(Item::from("merlot").offset(4), None);
    }

    #[test]
    fn test_category_index_of() {
        let cat = Category::new(
            "Vintage".to_string(),
            vec![Item::from(1984), Item::from(1988), Item::from(1992)],
        )
        .unwrap();
        assert_eq!(cat.len(), 3);
        assert_eq!(cat.index_of(&Item::from(1988)), Some(1));
        assert_eq!(cat.index_of(&Item::from(2000)), None);
        assert!(cat.contains(&Item::from(1992)));
    }

    #[test]
    fn test_category_rejects_duplicates() {
        let err = Category::new(
            "Wine".to_string(),
            vec![Item::from("merlot"), Item::from("merlot")],
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateItem { .. }));
    }

    #[test]
    fn test_category_rejects_empty() {
        let err = Category::new("Wine".to_string(), vec![]).unwrap_err();
        assert!(matches!(err, EngineError::EmptyCategory(_)));
    }
}
