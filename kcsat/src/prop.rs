//! Unit propagation.
//!
//! Draining the trail's queue region performs boolean constraint propagation
//! with two watched literals per clause. For every newly true literal the
//! propagator first subsumes every clause containing it (the clause is
//! satisfied, no watch maintenance is needed until the level is undone) and
//! then scans the watch list of the opposite literal: each still alive
//! watching clause either moves its watch to another literal, turns out to
//! be satisfied, forces its other watched literal, or is in conflict.
pub mod assignment;
pub mod graph;
pub mod watch;

pub use assignment::{enqueue_assignment, Assignment, Trail};
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use watch::Watchlists;

use partial_ref::{partial, PartialRef};

use kcsat_formula::Lit;

use crate::clauses::ClauseId;
use crate::context::{
    AssignmentP, ClausesP, Context, ImplGraphP, OccurrencesP, SubsumptionP, TrailP, VariablesP,
    WatchlistsP,
};
use crate::subsume::subsume;

/// Propagate all enqueued assignments to fixpoint.
///
/// On conflict the conflicting clause is recorded on the contradiction
/// variable and the remaining queue is left in place; the caller resets it
/// when undoing the level.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut ImplGraphP,
        mut SubsumptionP,
        mut TrailP,
        mut WatchlistsP,
        OccurrencesP,
        VariablesP,
    ),
) -> Result<(), Conflict> {
    while let Some(lit) = ctx.part_mut(TrailP).pop_queue() {
        propagate_lit(ctx.borrow(), lit)?;
    }
    Ok(())
}

/// Record a conflicting propagation on the contradiction variable.
///
/// The contradiction variable is assigned at the current level with the
/// conflicting clause as its implier and its positive literal enters the
/// trail. The conflict analyzer can then treat the conflict like any other
/// implied trail entry.
pub fn record_conflict(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut TrailP,
        VariablesP
    ),
    clause: ClauseId,
) -> Conflict {
    let sink = ctx.part(VariablesP).contradiction();
    debug_assert!(!ctx.part(AssignmentP).is_instantiated(sink));
    enqueue_assignment(ctx.borrow(), sink.positive(), Reason::Clause(clause));
    Conflict(clause)
}

/// Propagate the consequences of a single newly true literal.
fn propagate_lit(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut ImplGraphP,
        mut SubsumptionP,
        mut TrailP,
        mut WatchlistsP,
        OccurrencesP,
        VariablesP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    // every clause containing the literal is satisfied now
    let (occurs, mut ctx) = ctx.split_part(OccurrencesP);
    for &clause in occurs.appears_in(lit) {
        subsume(ctx.borrow(), clause);
    }
    for &clause in occurs.learned_containing(lit) {
        subsume(ctx.borrow(), clause);
    }

    let false_lit = !lit;
    let mut watches = ctx.part_mut(WatchlistsP).take(false_lit);

    let mut kept = 0;
    let mut pos = 0;
    while pos < watches.len() {
        let clause = watches[pos];
        pos += 1;

        if ctx.part(ClausesP).get(clause).is_subsumed() {
            watches[kept] = clause;
            kept += 1;
            continue;
        }

        let replacement = find_replacement(ctx.borrow(), clause);

        // the replacement scan may have discovered the clause is satisfied
        if ctx.part(ClausesP).get(clause).is_subsumed() {
            watches[kept] = clause;
            kept += 1;
            continue;
        }

        if let Some(new_watch) = replacement {
            debug_assert_ne!(new_watch, false_lit);
            ctx.part_mut(ClausesP)
                .get_mut(clause)
                .replace_watch(false_lit, new_watch);
            ctx.part_mut(WatchlistsP).add_watch(new_watch, clause);
            continue;
        }

        watches[kept] = clause;
        kept += 1;

        let other = ctx.part(ClausesP).get(clause).other_watch(false_lit);
        match other {
            Some(other) if ctx.part(AssignmentP).lit_is_unk(other) => {
                // the clause became unit and forces its other watch
                enqueue_assignment(ctx.borrow(), other, Reason::Clause(clause));
            }
            Some(other) if ctx.part(AssignmentP).lit_is_true(other) => {
                subsume(ctx.borrow(), clause);
            }
            _ => {
                // a falsified unit clause, or both watches false
                let conflict = record_conflict(ctx.borrow(), clause);
                while pos < watches.len() {
                    watches[kept] = watches[pos];
                    kept += 1;
                    pos += 1;
                }
                watches.truncate(kept);
                ctx.part_mut(WatchlistsP).restore(false_lit, watches);
                return Err(conflict);
            }
        }
    }

    watches.truncate(kept);
    ctx.part_mut(WatchlistsP).restore(false_lit, watches);
    Ok(())
}

/// Search a clause for a literal that can take over a watch.
///
/// Returns the first unassigned literal that is not already watched. If the
/// scan runs into a true literal the clause is satisfied: it is subsumed and
/// the watch stays where it is.
fn find_replacement(
    mut ctx: partial!(Context, mut ClausesP, mut SubsumptionP, AssignmentP),
    clause: ClauseId,
) -> Option<Lit> {
    let len = ctx.part(ClausesP).get(clause).len();
    for index in 0..len {
        let stored = ctx.part(ClausesP).get(clause);
        let lit = stored.lits()[index];
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => {
                subsume(ctx.borrow(), clause);
                return None;
            }
            Some(false) => (),
            None => {
                if stored.watch_a() != Some(lit) && stored.watch_b() != Some(lit) {
                    return Some(lit);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use kcsat_formula::{cnf_formula, lit, lits, var};

    use crate::load::load_formula;

    #[test]
    fn forced_chain() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_formula(ctx.borrow(), &cnf_formula![-1, 2; -2, 3;]);

        enqueue_assignment(ctx.borrow(), lit!(1), Reason::Decision);
        propagate(ctx.borrow()).unwrap();

        for &lit in lits![1, 2, 3].iter() {
            assert!(ctx.part(AssignmentP).lit_is_true(lit));
        }
        assert_eq!(
            ctx.part(ImplGraphP).reason(var!(2)),
            Reason::Clause(ClauseId::from_index(1))
        );
        assert_eq!(
            ctx.part(ImplGraphP).reason(var!(3)),
            Reason::Clause(ClauseId::from_index(2))
        );
        assert!(ctx.part(ClausesP).get(ClauseId::from_index(1)).is_subsumed());
        assert!(ctx.part(ClausesP).get(ClauseId::from_index(2)).is_subsumed());
        assert!(ctx.part(TrailP).queue_is_empty());
    }

    #[test]
    fn conflicting_watches() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_formula(ctx.borrow(), &cnf_formula![-1, 2; -1, -2;]);

        enqueue_assignment(ctx.borrow(), lit!(1), Reason::Decision);
        let conflict = propagate(ctx.borrow()).unwrap_err();

        // the newest watcher of ¬1 is scanned first and forces ¬2, so the
        // older clause is the one that becomes empty
        assert!(ctx.part(AssignmentP).lit_is_true(lit!(-2)));
        assert_eq!(
            ctx.part(ImplGraphP).reason(var!(2)),
            Reason::Clause(ClauseId::from_index(2))
        );
        assert_eq!(conflict, Conflict(ClauseId::from_index(1)));
        let sink = ctx.part(VariablesP).contradiction();
        assert!(ctx.part(AssignmentP).is_instantiated(sink));
        assert_eq!(ctx.part(ImplGraphP).reason(sink), Reason::Clause(conflict.0));
    }

    #[test]
    fn watch_moves_to_unassigned_literal() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        load_formula(ctx.borrow(), &cnf_formula![-1, -2, 3;]);
        let clause = ClauseId::from_index(1);

        enqueue_assignment(ctx.borrow(), lit!(1), Reason::Decision);
        propagate(ctx.borrow()).unwrap();

        // nothing is forced yet, the watch moved off ¬1
        assert!(ctx.part(AssignmentP).lit_is_unk(lit!(2)));
        assert!(ctx.part(WatchlistsP).watched_by(lit!(-1)).is_empty());
        assert_eq!(ctx.part(WatchlistsP).watched_by(lit!(3)), &[clause]);

        enqueue_assignment(ctx.borrow(), lit!(2), Reason::Decision);
        propagate(ctx.borrow()).unwrap();

        assert!(ctx.part(AssignmentP).lit_is_true(lit!(3)));
    }
}
