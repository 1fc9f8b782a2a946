//! Decision and undo control.
//!
//! A decision opens a new level, assigns the decided literal and runs unit
//! resolution. Undoing a decision reverses everything done since it,
//! including the clauses asserted at that level: trail entries of the level
//! are uninstantiated and subsumed clauses are revived through the level's
//! sentinel in the subsumption log.
use partial_ref::{partial, PartialRef};

use kcsat_formula::Lit;

use crate::analyze_conflict::build_asserting_clause;
use crate::clauses::ClauseId;
use crate::context::{
    AnalyzeConflictP, AssignmentP, ClausesP, Context, EngineStateP, ImplGraphP, OccurrencesP,
    SubsumptionP, TrailP, VariablesP, WatchlistsP,
};
use crate::prop::{enqueue_assignment, propagate, record_conflict, Conflict, Reason};
use crate::subsume::{revive_level, subsume};

/// Try to make a literal true at the current level.
///
/// An unassigned literal is assigned and scheduled for propagation. A
/// literal that is already true subsumes its implier instead. A falsified
/// literal records a conflict.
pub fn assign(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut ImplGraphP,
        mut SubsumptionP,
        mut TrailP,
        VariablesP,
    ),
    lit: Lit,
    reason: Reason,
) -> Result<(), Conflict> {
    match ctx.part(AssignmentP).lit_value(lit) {
        None => {
            enqueue_assignment(ctx.borrow(), lit, reason);
            Ok(())
        }
        Some(true) => {
            if let Reason::Clause(clause) = reason {
                subsume(ctx.borrow(), clause);
            }
            Ok(())
        }
        Some(false) => {
            let clause = match reason {
                Reason::Clause(clause) => clause,
                Reason::Decision => ClauseId::FALSE_CLAUSE,
            };
            Err(record_conflict(ctx.borrow(), clause))
        }
    }
}

/// Decide a literal and run unit resolution.
///
/// Returns `None` when propagation reaches a fixpoint and the asserting
/// clause learned from the conflict otherwise. The returned clause is not
/// yet installed; the caller has to undo decisions until its assertion level
/// is reached and call `assert_clause`.
pub fn decide(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ClausesP,
        mut ImplGraphP,
        mut SubsumptionP,
        mut TrailP,
        mut WatchlistsP,
        EngineStateP,
        OccurrencesP,
        VariablesP,
    ),
    lit: Lit,
) -> Option<ClauseId> {
    if ctx.part(EngineStateP).root_conflict {
        return Some(ClauseId::FALSE_CLAUSE);
    }
    debug_assert!(
        ctx.part(AssignmentP).lit_is_unk(lit),
        "decided literal must be uninstantiated"
    );
    debug_assert!(ctx.part(TrailP).queue_is_empty());

    ctx.part_mut(TrailP).new_level();
    ctx.part_mut(SubsumptionP).push_boundary();

    let mut result = assign(ctx.borrow(), lit, Reason::Decision);
    if result.is_ok() {
        result = propagate(ctx.borrow());
    }

    match result {
        Ok(()) => None,
        Err(_) => Some(build_asserting_clause(ctx.borrow())),
    }
}

/// Reverse the most recent decision.
pub fn undo_decide(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut SubsumptionP,
        mut TrailP,
        ImplGraphP,
    ),
) {
    debug_assert!(
        ctx.part(TrailP).current_level() > 1,
        "undoing the root level is not supported"
    );
    undo_unit_resolution(ctx.borrow());
    ctx.part_mut(TrailP).retract_level();
}

/// Run unit resolution on the pending assignments.
///
/// Returns false when a contradiction is found.
pub fn unit_resolution(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut ImplGraphP,
        mut SubsumptionP,
        mut TrailP,
        mut WatchlistsP,
        EngineStateP,
        OccurrencesP,
        VariablesP,
    ),
) -> bool {
    if ctx.part(EngineStateP).root_conflict {
        return false;
    }
    propagate(ctx.borrow()).is_ok()
}

/// Undo the current level's unit resolution.
///
/// Uninstantiates every trail entry of the current level, revives the
/// clauses subsumed at it and drops any pending propagations.
pub fn undo_unit_resolution(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClausesP,
        mut SubsumptionP,
        mut TrailP,
        ImplGraphP,
    ),
) {
    let level = ctx.part(TrailP).current_level();
    loop {
        let lit = match ctx.part(TrailP).trail().last() {
            Some(&lit) => lit,
            None => break,
        };
        if ctx.part(ImplGraphP).level(lit.var()) != level {
            break;
        }
        ctx.part_mut(TrailP).pop();
        ctx.part_mut(AssignmentP).unassign_var(lit.var());
    }
    revive_level(ctx.borrow());
    ctx.part_mut(TrailP).clear_queue();
}
