//! The public engine interface.
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use partial_ref::{IntoPartialRefMut, PartialRef};

use anyhow::Error;

use kcsat_dimacs::parse_dimacs;
use kcsat_formula::{CnfFormula, Lit, Var};

use crate::clauses::ClauseId;
use crate::context::Context;
use crate::{decide, learn, load};

/// A stateful reasoning engine over a CNF formula.
///
/// The engine supports incremental decisions, unit resolution, clause
/// learning via the first unique implication point and chronological undo.
/// It is driven from the outside: there is no built-in search strategy.
///
/// The decision level starts at 1, the root level, where the consequences of
/// unit original clauses live. Every `decide` opens a new level and
/// `undo_decide` reverses the most recent one, including all clauses
/// asserted since.
#[derive(Default)]
pub struct SatState {
    ctx: Box<Context>,
}

impl SatState {
    /// Build a state from a formula and run root-level unit resolution.
    pub fn from_formula(formula: &CnfFormula) -> SatState {
        let mut state = SatState::default();
        let mut ctx = state.ctx.into_partial_ref_mut();
        load::load_formula(ctx.borrow(), formula);
        state
    }

    /// Read a DIMACS CNF input and build a state from it.
    pub fn from_dimacs(input: impl io::Read) -> Result<SatState, Error> {
        Ok(SatState::from_formula(&parse_dimacs(input)?))
    }

    /// Read a DIMACS CNF file and build a state from it.
    pub fn from_dimacs_file(path: impl AsRef<Path>) -> Result<SatState, Error> {
        Ok(SatState::from_dimacs(File::open(path)?)?)
    }

    /// Number of variables in the formula.
    pub fn var_count(&self) -> usize {
        self.ctx.variables.count()
    }

    /// Number of original clauses.
    pub fn clause_count(&self) -> usize {
        self.ctx.clauses.original_count()
    }

    /// Number of learned clauses.
    pub fn learned_count(&self) -> usize {
        self.ctx.clauses.learned_count()
    }

    /// Current decision level; 1 is the root level.
    pub fn decision_level(&self) -> usize {
        self.ctx.trail.current_level()
    }

    /// The variable with the given 1-based index.
    pub fn var(&self, index: usize) -> Var {
        debug_assert!(index >= 1 && index <= self.var_count());
        Var::from_dimacs(index as isize)
    }

    /// The 1-based index of a variable.
    pub fn var_index(&self, var: Var) -> usize {
        var.to_dimacs() as usize
    }

    /// The literal with the given signed 1-based index.
    pub fn literal(&self, index: isize) -> Lit {
        debug_assert!(index != 0 && index.abs() as usize <= self.var_count());
        Lit::from_dimacs(index)
    }

    /// The signed 1-based index of a literal.
    pub fn literal_index(&self, lit: Lit) -> isize {
        lit.to_dimacs()
    }

    /// The positive literal of a variable.
    pub fn pos_lit(&self, var: Var) -> Lit {
        var.positive()
    }

    /// The negative literal of a variable.
    pub fn neg_lit(&self, var: Var) -> Lit {
        var.negative()
    }

    /// The variable of a literal.
    pub fn literal_var(&self, lit: Lit) -> Var {
        lit.var()
    }

    /// Whether a variable is instantiated, by decision or unit resolution.
    pub fn is_instantiated(&self, var: Var) -> bool {
        self.ctx.assignment.is_instantiated(var)
    }

    /// Whether a literal is true under the current assignment.
    pub fn is_implied(&self, lit: Lit) -> bool {
        self.ctx.assignment.lit_is_true(lit)
    }

    /// Whether every original clause mentioning the variable is subsumed.
    pub fn is_irrelevant(&self, var: Var) -> bool {
        let occurs = &self.ctx.occurrences;
        occurs
            .appears_in(var.positive())
            .iter()
            .chain(occurs.appears_in(var.negative()))
            .all(|&clause| self.ctx.clauses.get(clause).is_subsumed())
    }

    /// Number of original clauses mentioning a variable.
    pub fn var_occurrences(&self, var: Var) -> usize {
        self.ctx.occurrences.var_occurrences(var)
    }

    /// The `index`-th original clause mentioning a variable.
    ///
    /// Positive appearances come first. Calling this with `index` out of
    /// range is a contract violation and panics.
    pub fn clause_of_var(&self, index: usize, var: Var) -> ClauseId {
        self.ctx.occurrences.clause_of_var(index, var)
    }

    /// The clause with the given 1-based index.
    pub fn clause(&self, index: usize) -> ClauseId {
        debug_assert!(index >= 1 && index <= self.ctx.clauses.original_count() + self.learned_count());
        ClauseId::from_index(index)
    }

    /// The index of a clause. Original clauses are numbered `1..=m` in input
    /// order, learned clauses continue from `m + 1` in allocation order.
    pub fn clause_index(&self, clause: ClauseId) -> usize {
        clause.index()
    }

    /// The literals of a clause.
    pub fn clause_literals(&self, clause: ClauseId) -> &[Lit] {
        self.ctx.clauses.get(clause).lits()
    }

    /// Number of literals in a clause.
    pub fn clause_size(&self, clause: ClauseId) -> usize {
        self.ctx.clauses.get(clause).len()
    }

    /// Whether a clause is subsumed at the current level.
    pub fn is_subsumed(&self, clause: ClauseId) -> bool {
        self.ctx.clauses.get(clause).is_subsumed()
    }

    /// The assertion level of a clause; 0 only for the false clause.
    pub fn assertion_level(&self, clause: ClauseId) -> usize {
        self.ctx.clauses.get(clause).assertion_level()
    }

    /// Whether `clause` is the false clause sentinel signaling
    /// unsatisfiability.
    pub fn is_false_clause(&self, clause: ClauseId) -> bool {
        clause.is_false_clause()
    }

    /// Decide a literal and run unit resolution.
    ///
    /// Returns `None` on success. On conflict the learned asserting clause
    /// is returned; undo decisions until [`at_assertion_level`] holds for
    /// it, then install it with [`assert_clause`].
    ///
    /// [`at_assertion_level`]: SatState::at_assertion_level
    /// [`assert_clause`]: SatState::assert_clause
    pub fn decide(&mut self, lit: Lit) -> Option<ClauseId> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        decide::decide(ctx.borrow(), lit)
    }

    /// Reverse the most recent decision and everything since it.
    pub fn undo_decide(&mut self) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        decide::undo_decide(ctx.borrow());
    }

    /// Whether the engine is at the assertion level of a clause.
    pub fn at_assertion_level(&self, clause: ClauseId) -> bool {
        self.ctx.clauses.get(clause).assertion_level() == self.decision_level()
    }

    /// Install a learned clause and run unit resolution.
    ///
    /// Must only be called when [`at_assertion_level`] holds for the clause.
    /// Returns `None` on success, another asserting clause on a further
    /// conflict, or the false clause when the formula is unsatisfiable. The
    /// false clause must not be passed back in.
    ///
    /// [`at_assertion_level`]: SatState::at_assertion_level
    pub fn assert_clause(&mut self, clause: ClauseId) -> Option<ClauseId> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        learn::assert_clause(ctx.borrow(), clause)
    }

    /// Run unit resolution on pending assignments.
    ///
    /// Exposed for root-level use and testing; `decide` and `assert_clause`
    /// run it internally. Returns false when a contradiction is found.
    pub fn unit_resolution(&mut self) -> bool {
        let mut ctx = self.ctx.into_partial_ref_mut();
        decide::unit_resolution(ctx.borrow())
    }

    /// Undo the current level's unit resolution.
    pub fn undo_unit_resolution(&mut self) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        decide::undo_unit_resolution(ctx.borrow());
    }

    /// Client-reserved mark bit of a variable; never touched by the engine.
    pub fn is_marked_var(&self, var: Var) -> bool {
        self.ctx.variables.is_marked(var)
    }

    pub fn mark_var(&mut self, var: Var) {
        self.ctx.variables.set_mark(var, true);
    }

    pub fn unmark_var(&mut self, var: Var) {
        self.ctx.variables.set_mark(var, false);
    }

    /// Client-reserved mark bit of a clause; never touched by the engine.
    pub fn is_marked_clause(&self, clause: ClauseId) -> bool {
        self.ctx.clauses.get(clause).mark
    }

    pub fn mark_clause(&mut self, clause: ClauseId) {
        self.ctx.clauses.get_mut(clause).mark = true;
    }

    pub fn unmark_clause(&mut self, clause: ClauseId) {
        self.ctx.clauses.get_mut(clause).mark = false;
    }

    /// The weight of a literal.
    ///
    /// Hook for a future weighted variant; constant 1 for now.
    pub fn literal_weight(&self, _lit: Lit) -> f64 {
        1.0
    }
}

impl fmt::Debug for SatState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "SatState(level {}, {} vars, {} clauses, {} learned, trail {:?})",
            self.decision_level(),
            self.var_count(),
            self.clause_count(),
            self.learned_count(),
            self.ctx.trail.trail(),
        )
    }
}

#[cfg(test)]
impl SatState {
    /// Checks the structural invariants of the engine state.
    ///
    /// Meant to run between public operations, so it expects no pending
    /// propagations and no recorded conflict.
    pub(crate) fn check_invariants(&self) {
        let ctx = &self.ctx;
        let slots = ctx.variables.count() + 1;

        // no pending propagations
        assert!(ctx.trail.queue_is_empty());

        // a variable is instantiated iff it is on the trail exactly once
        let mut trail_entries = vec![0usize; slots];
        for &lit in ctx.trail.trail() {
            trail_entries[lit.index()] += 1;
        }
        for index in 0..slots {
            let var = Var::from_index(index);
            let expected = ctx.assignment.is_instantiated(var) as usize;
            assert_eq!(trail_entries[index], expected, "trail entries of {:?}", var);
        }

        // trail levels grow one level at a time, opening with the decision
        let mut last_level = 1;
        for &lit in ctx.trail.trail() {
            let level = ctx.impl_graph.level(lit.var());
            if level != last_level {
                assert_eq!(level, last_level + 1, "trail level jump at {:?}", lit);
                assert_eq!(
                    ctx.impl_graph.reason(lit.var()),
                    crate::prop::Reason::Decision,
                    "level must open with its decision"
                );
                last_level = level;
            }
        }
        assert!(last_level <= ctx.trail.current_level());

        // the subsumption log mirrors the subsumed flags
        let mut logged = vec![0usize; ctx.clauses.original_count() + self.learned_count() + 1];
        for entry in ctx.subsumption.entries() {
            if let Some(clause) = entry {
                logged[clause.index()] += 1;
            }
        }
        for clause in ctx.clauses.all_ids() {
            let expected = ctx.clauses.get(clause).is_subsumed() as usize;
            assert_eq!(logged[clause.index()], expected, "log entries of {:?}", clause);
        }

        // watch legality only holds when propagation ran to completion; a
        // latched root conflict leaves the aborted root propagation behind
        if !ctx.engine_state.root_conflict {
            self.check_watches();
        }
    }

    /// Checks watch-list and clause watch field consistency plus two-watch
    /// legality.
    fn check_watches(&self) {
        let ctx = &self.ctx;
        let slots = ctx.variables.count() + 1;

        // watch lists and clause watch fields must agree
        let mut watched = vec![Vec::new(); ctx.clauses.original_count() + self.learned_count() + 1];
        for code in 0..slots * 2 {
            let lit = Lit::from_code(code);
            for &clause in ctx.watchlists.watched_by(lit) {
                watched[clause.index()].push(lit);
            }
        }

        for clause in ctx.clauses.all_ids() {
            let stored = ctx.clauses.get(clause);
            let mut expected: Vec<Lit> = stored.watch_a().into_iter().chain(stored.watch_b()).collect();
            let mut actual = watched[clause.index()].clone();
            expected.sort();
            actual.sort();

            if stored.watch_a().is_none() {
                // built but not yet asserted, or the false clause
                assert!(actual.is_empty(), "unattached {:?} must not be watched", clause);
                continue;
            }

            assert_eq!(actual, expected, "watches of {:?}", clause);
            // a clause whose first two literals are equal keeps its aliased
            // load-time watches until one of them moves
            if stored.len() >= 2 && stored.lits()[0] != stored.lits()[1] {
                assert_ne!(stored.watch_a(), stored.watch_b(), "watches of {:?} alias", clause);
            }

            // two-watch legality: between operations an alive clause has no
            // falsified watch; a falsified watch is resolved the moment its
            // literal is propagated, and clauses that propagated or were
            // satisfied get subsumed before the queue drains
            if !stored.is_subsumed() {
                for &lit in expected.iter() {
                    assert!(
                        !ctx.assignment.lit_is_false(lit),
                        "falsified watch {:?} on alive {:?}",
                        lit,
                        clause
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use kcsat_formula::test::{sat_formula, sgen_unsat_formula};
    use kcsat_formula::{cnf_formula, lit, lits};

    /// Checks the shape of a freshly learned asserting clause: exactly one
    /// literal of the conflict level leading the clause, everything else
    /// strictly below it, and the assertion level matching the deepest of
    /// those lower levels.
    fn check_asserting_shape(state: &SatState, clause: ClauseId) {
        let level = state.decision_level();
        let lits = state.clause_literals(clause);

        assert!(state.ctx.assignment.lit_is_false(lits[0]));
        assert_eq!(state.ctx.impl_graph.level(lits[0].var()), level);

        let mut deepest_lower = 1;
        for &lit in lits[1..].iter() {
            let lit_level = state.ctx.impl_graph.level(lit.var());
            assert!(state.ctx.assignment.lit_is_false(lit));
            assert!(lit_level < level);
            deepest_lower = deepest_lower.max(lit_level);
        }
        assert_eq!(state.assertion_level(clause), deepest_lower);
    }

    /// Minimal CDCL driver in the shape a knowledge compiler uses the
    /// engine: decide variables in index order, learn from conflicts, pop to
    /// the assertion level and install the learned clause.
    fn solve(state: &mut SatState) -> bool {
        let mut last_learned = state.clause_count();
        loop {
            state.check_invariants();
            let next = (1..=state.var_count())
                .map(|index| state.var(index))
                .find(|&var| !state.is_instantiated(var));
            let var = match next {
                Some(var) => var,
                None => return true,
            };
            let mut conflict = state.decide(var.positive());
            while let Some(clause) = conflict {
                if state.is_false_clause(clause) {
                    return false;
                }
                check_asserting_shape(state, clause);
                assert!(state.clause_index(clause) > last_learned);
                last_learned = state.clause_index(clause);
                while !state.at_assertion_level(clause) {
                    state.undo_decide();
                    state.check_invariants();
                }
                conflict = state.assert_clause(clause);
            }
        }
    }

    /// The observable assignment and subsumption state, for undo checks.
    fn snapshot(state: &SatState) -> (usize, Vec<Option<bool>>, Vec<bool>) {
        let values = (1..=state.var_count())
            .map(|index| {
                let var = state.var(index);
                if state.is_instantiated(var) {
                    Some(state.is_implied(var.positive()))
                } else {
                    None
                }
            })
            .collect();
        let subsumed = (1..=state.clause_count())
            .map(|index| state.is_subsumed(state.clause(index)))
            .collect();
        (state.decision_level(), values, subsumed)
    }

    #[test]
    fn learned_clause_completes_the_search() {
        let mut state = SatState::from_formula(&cnf_formula![
            1, 2;
            -1, 2;
            -2, 3;
        ]);

        let clause = state.decide(lit!(-3)).expect("conflict");
        assert_eq!(state.clause_literals(clause), &lits![2]);
        assert_eq!(state.assertion_level(clause), 1);
        assert!(!state.at_assertion_level(clause));

        state.undo_decide();
        state.check_invariants();
        assert!(state.at_assertion_level(clause));

        assert_eq!(state.assert_clause(clause), None);
        state.check_invariants();
        assert!(state.is_implied(lit!(2)));
        assert!(state.is_implied(lit!(3)));
        assert!(!state.is_instantiated(state.var(1)));
        assert_eq!(state.learned_count(), 1);
    }

    #[test]
    fn client_marks_survive_decide_and_undo() {
        let mut state = SatState::from_formula(&cnf_formula![-1, 2; -2, 3;]);

        state.mark_var(state.var(2));
        state.mark_clause(state.clause(1));

        assert_eq!(state.decide(lit!(1)), None);
        state.undo_decide();

        assert!(state.is_marked_var(state.var(2)));
        assert!(state.is_marked_clause(state.clause(1)));
        assert!(!state.is_marked_var(state.var(1)));

        state.unmark_var(state.var(2));
        state.unmark_clause(state.clause(1));
        assert!(!state.is_marked_var(state.var(2)));
        assert!(!state.is_marked_clause(state.clause(1)));
    }

    #[test]
    fn literal_weight_is_constant() {
        let state = SatState::from_formula(&cnf_formula![1, -2;]);
        assert_eq!(state.literal_weight(lit!(1)), 1.0);
        assert_eq!(state.literal_weight(lit!(-2)), 1.0);
    }

    proptest! {
        #[test]
        fn planted_formulas_are_satisfied(formula in sat_formula(
            3..15usize,
            0..60usize,
            0.1..0.4,
            0.7..1.0,
        )) {
            let mut state = SatState::from_formula(&formula);
            prop_assert!(solve(&mut state));

            for index in 1..=state.clause_count() {
                let clause = state.clause(index);
                let satisfied = state
                    .clause_literals(clause)
                    .iter()
                    .any(|&lit| state.is_implied(lit));
                prop_assert!(satisfied, "clause {} not satisfied", index);
            }
        }

        #[test]
        fn sgen_formulas_are_refuted(formula in sgen_unsat_formula(1..3usize)) {
            let mut state = SatState::from_formula(&formula);
            prop_assert!(!solve(&mut state));
        }

        #[test]
        fn decide_undo_restores_the_state(
            formula in kcsat_formula::cnf::strategy::cnf_formula(1..20usize, 0..40, 1..6),
        ) {
            let mut state = SatState::from_formula(&formula);
            if !state.unit_resolution() {
                // unsatisfiable by unit resolution alone; nothing to undo
                return Ok(());
            }
            state.check_invariants();

            let mut snapshots = vec![];
            for index in 1..=state.var_count() {
                let var = state.var(index);
                if state.is_instantiated(var) {
                    continue;
                }
                snapshots.push(snapshot(&state));
                if state.decide(var.negative()).is_some() {
                    // conflicting decisions are undone right away
                    state.undo_decide();
                    state.check_invariants();
                    prop_assert_eq!(&snapshot(&state), snapshots.last().unwrap());
                    snapshots.pop();
                }
            }

            while let Some(expected) = snapshots.pop() {
                state.undo_decide();
                state.check_invariants();
                prop_assert_eq!(snapshot(&state), expected);
            }
        }
    }
}
