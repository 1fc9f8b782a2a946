//! Watch lists of the two-watched-literal scheme.
//!
//! Every clause of size two or more is watched by two of its literals; unit
//! clauses are watched by their single literal. When a literal becomes
//! false, the watch lists of that literal are scanned to find the clauses
//! whose watch needs to move, which also finds every clause that became
//! unit. Unassigning variables never invalidates the watches, so undo does
//! not touch these lists.
use std::mem::take;

use kcsat_formula::Lit;

use crate::clauses::ClauseId;

/// Watch lists indexed by watched literal code.
#[derive(Default)]
pub struct Watchlists {
    watches: Vec<Vec<ClauseId>>,
}

impl Watchlists {
    /// Update structures for a new variable count.
    ///
    /// `count` includes the slot of the contradiction variable.
    pub fn set_var_count(&mut self, count: usize) {
        self.watches.resize(count * 2, vec![]);
    }

    /// Make `lit` watch a clause.
    ///
    /// Newest first, so freshly watched clauses are scanned early.
    pub fn add_watch(&mut self, lit: Lit, clause: ClauseId) {
        self.watches[lit.code()].insert(0, clause);
    }

    /// Clauses watched by `lit`.
    pub fn watched_by(&self, lit: Lit) -> &[ClauseId] {
        &self.watches[lit.code()]
    }

    /// Detach `lit`'s watch list for scanning.
    ///
    /// While detached, watches may be added for other literals; the scanned
    /// list is handed back via [`restore`](Watchlists::restore).
    pub fn take(&mut self, lit: Lit) -> Vec<ClauseId> {
        take(&mut self.watches[lit.code()])
    }

    /// Reattach a watch list detached by [`take`](Watchlists::take).
    pub fn restore(&mut self, lit: Lit, watches: Vec<ClauseId>) {
        debug_assert!(self.watches[lit.code()].is_empty());
        self.watches[lit.code()] = watches;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kcsat_formula::lit;

    #[test]
    fn watch_lists_are_newest_first() {
        let mut watchlists = Watchlists::default();
        watchlists.set_var_count(2);

        let c1 = ClauseId::from_index(1);
        let c2 = ClauseId::from_index(2);

        watchlists.add_watch(lit!(-1), c1);
        watchlists.add_watch(lit!(-1), c2);

        assert_eq!(watchlists.watched_by(lit!(-1)), &[c2, c1]);
    }

    #[test]
    fn take_and_restore() {
        let mut watchlists = Watchlists::default();
        watchlists.set_var_count(3);

        let c1 = ClauseId::from_index(1);
        let c2 = ClauseId::from_index(2);

        watchlists.add_watch(lit!(1), c1);
        watchlists.add_watch(lit!(1), c2);
        watchlists.add_watch(lit!(-3), c2);

        let mut scan = watchlists.take(lit!(1));
        assert_eq!(scan, vec![c2, c1]);
        assert!(watchlists.watched_by(lit!(1)).is_empty());

        // c1 moves to another literal, c2 stays
        scan.retain(|&c| c != c1);
        watchlists.add_watch(lit!(2), c1);
        watchlists.restore(lit!(1), scan);

        assert_eq!(watchlists.watched_by(lit!(1)), &[c2]);
        assert_eq!(watchlists.watched_by(lit!(2)), &[c1]);
        assert_eq!(watchlists.watched_by(lit!(-3)), &[c2]);
    }
}
