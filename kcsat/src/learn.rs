//! Installing learned clauses.
use partial_ref::{partial, PartialRef};

use log::{debug, trace};

use crate::analyze_conflict::build_asserting_clause;
use crate::clauses::ClauseId;
use crate::context::{
    AnalyzeConflictP, AssignmentP, ClausesP, Context, EngineStateP, ImplGraphP, OccurrencesP,
    SubsumptionP, TrailP, VariablesP, WatchlistsP,
};
use crate::decide::assign;
use crate::prop::{propagate, Reason};

/// Install a learned clause and run unit resolution.
///
/// Must only be called when the engine is at the clause's assertion level.
/// Returns `None` when propagation reaches a fixpoint, a new asserting
/// clause when it conflicts above the root level, and the false clause when
/// it conflicts at the root level, which means the formula is unsatisfiable.
pub fn assert_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ClausesP,
        mut EngineStateP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut SubsumptionP,
        mut TrailP,
        mut WatchlistsP,
        VariablesP,
    ),
    clause: ClauseId,
) -> Option<ClauseId> {
    if ctx.part(EngineStateP).root_conflict {
        return Some(ClauseId::FALSE_CLAUSE);
    }
    debug_assert!(!clause.is_false_clause());
    debug_assert_eq!(
        ctx.part(ClausesP).get(clause).assertion_level(),
        ctx.part(TrailP).current_level()
    );
    debug_assert!(ctx.part(TrailP).queue_is_empty());

    trace!("asserting {:?}", clause);

    // link the clause into the learned lists of its literals
    {
        let mut ctx: partial!(Context, ClausesP, mut OccurrencesP) = ctx.borrow();
        let (clauses, mut ctx) = ctx.split_part(ClausesP);
        for &lit in clauses.get(clause).lits() {
            ctx.part_mut(OccurrencesP).add_learned(lit, clause);
        }
    }

    // watch the asserted literal and the last literal
    let (watch_a, watch_b) = {
        let lits = ctx.part(ClausesP).get(clause).lits();
        let watch_b = if lits.len() >= 2 {
            Some(lits[lits.len() - 1])
        } else {
            None
        };
        (lits[0], watch_b)
    };
    ctx.part_mut(ClausesP)
        .get_mut(clause)
        .set_watches(Some(watch_a), watch_b);

    let mut result = assign(ctx.borrow(), watch_a, Reason::Clause(clause));
    if result.is_ok() {
        ctx.part_mut(WatchlistsP).add_watch(watch_a, clause);
        if let Some(watch_b) = watch_b {
            ctx.part_mut(WatchlistsP).add_watch(watch_b, clause);
        }
        result = propagate(ctx.borrow());
    }

    match result {
        Ok(()) => None,
        Err(_) if ctx.part(TrailP).current_level() > 1 => {
            Some(build_asserting_clause(ctx.borrow()))
        }
        Err(_) => {
            ctx.part_mut(EngineStateP).root_conflict = true;
            debug!("unit resolution failed at the root level");
            Some(ClauseId::FALSE_CLAUSE)
        }
    }
}
