use std::collections::BTreeSet;

use crate::error::{AppError, Result};

/// Tracks which grid rows are marked for download. Pure state, no I/O.
///
/// Indices are only ever valid relative to the fetch that produced them;
/// `reset` must be called whenever a new fetch replaces the item list.
#[derive(Debug, Default)]
pub struct SelectionSet {
    rows: BTreeSet<usize>,
    len: usize,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-bounds the set to a new item count and pre-selects row 0, matching
    /// the grid's default after a fetch. Empty fetches select nothing.
    pub fn reset(&mut self, len: usize) {
        self.rows.clear();
        self.len = len;
        if len > 0 {
            self.rows.insert(0);
        }
    }

    /// Flips membership of `row`.
    pub fn toggle(&mut self, row: usize) -> Result<()> {
        if row >= self.len {
            return Err(AppError::InvalidRow(row));
        }
        if !self.rows.remove(&row) {
            self.rows.insert(row);
        }
        Ok(())
    }

    /// Sets membership for every valid row.
    pub fn set_all(&mut self, selected: bool) {
        if selected {
            self.rows.extend(0..self.len);
        } else {
            self.rows.clear();
        }
    }

    /// Empties the set without touching the bound; rows stay toggleable.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn contains(&self, row: usize) -> bool {
        self.rows.contains(&row)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Read-only snapshot, in row order.
    pub fn members(&self) -> Vec<usize> {
        self.rows.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_is_an_involution() {
        let mut sel = SelectionSet::new();
        sel.reset(3);
        let before = sel.members();
        sel.toggle(2).unwrap();
        sel.toggle(2).unwrap();
        assert_eq!(sel.members(), before);
    }

    #[test]
    fn toggle_out_of_range_is_rejected() {
        let mut sel = SelectionSet::new();
        sel.reset(2);
        assert_eq!(sel.toggle(2), Err(AppError::InvalidRow(2)));
        assert_eq!(sel.members(), vec![0]);
    }

    #[test]
    fn set_all_covers_the_full_row_range() {
        let mut sel = SelectionSet::new();
        sel.reset(3);
        sel.set_all(true);
        assert_eq!(sel.members(), vec![0, 1, 2]);
        sel.set_all(false);
        assert!(sel.members().is_empty());
    }

    #[test]
    fn clear_empties_membership_but_keeps_the_bound() {
        let mut sel = SelectionSet::new();
        sel.reset(3);
        sel.set_all(true);
        sel.clear();
        assert!(sel.is_empty());
        assert!(sel.toggle(2).is_ok());
        assert_eq!(sel.members(), vec![2]);
    }

    #[test]
    fn reset_preselects_first_row() {
        let mut sel = SelectionSet::new();
        sel.reset(5);
        sel.set_all(true);
        sel.reset(2);
        assert_eq!(sel.members(), vec![0]);
    }

    #[test]
    fn reset_of_empty_fetch_selects_nothing() {
        let mut sel = SelectionSet::new();
        sel.reset(0);
        assert!(sel.is_empty());
        assert_eq!(sel.toggle(0), Err(AppError::InvalidRow(0)));
    }
}
