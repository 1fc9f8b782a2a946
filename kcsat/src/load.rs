//! Building the engine state from a formula.
use partial_ref::{partial, PartialRef};

use log::{debug, info};

use kcsat_formula::{CnfFormula, Lit};

use crate::clauses::ClauseId;
use crate::context::{
    self, AnalyzeConflictP, AssignmentP, ClausesP, Context, EngineStateP, ImplGraphP, OccurrencesP,
    SubsumptionP, TrailP, VariablesP, WatchlistsP,
};
use crate::decide::assign;
use crate::prop::{propagate, Reason};

/// Load a formula into an empty context and run root-level unit resolution.
///
/// Builds the clause arena, the exact-sized appearance lists and the initial
/// watches (the first two literals of each clause), then asserts every unit
/// original clause at the root level and propagates to closure. A root-level
/// contradiction, including an empty original clause, latches the
/// root-conflict flag.
pub fn load_formula(
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
        mut VariablesP,
        mut WatchlistsP,
    ),
    formula: &CnfFormula,
) {
    context::set_var_count(ctx.borrow(), formula.var_count());

    // Size every appearance list exactly before filling them.
    let mut appearance_counts = vec![0usize; (formula.var_count() + 1) * 2];
    for clause_lits in formula.iter() {
        for &lit in clause_lits {
            appearance_counts[lit.code()] += 1;
        }
    }
    for (code, &count) in appearance_counts.iter().enumerate() {
        if count > 0 {
            ctx.part_mut(OccurrencesP)
                .reserve_appearances(Lit::from_code(code), count);
        }
    }

    let mut units: Vec<(ClauseId, Lit)> = vec![];
    let mut empty_clause = false;

    for clause_lits in formula.iter() {
        let id = ctx.part_mut(ClausesP).add_original(clause_lits.to_vec());
        for &lit in clause_lits {
            ctx.part_mut(OccurrencesP).add_appearance(lit, id);
        }
        match *clause_lits {
            [] => empty_clause = true,
            [first] => {
                ctx.part_mut(ClausesP)
                    .get_mut(id)
                    .set_watches(Some(first), None);
                ctx.part_mut(WatchlistsP).add_watch(first, id);
                units.push((id, first));
            }
            [first, second, ..] => {
                ctx.part_mut(ClausesP)
                    .get_mut(id)
                    .set_watches(Some(first), Some(second));
                ctx.part_mut(WatchlistsP).add_watch(first, id);
                ctx.part_mut(WatchlistsP).add_watch(second, id);
            }
        }
    }

    // Root-level closure: unit original clauses force their literal at
    // level 1, each with itself as the implier.
    let mut passed = !empty_clause;
    if passed {
        for (id, lit) in units {
            if assign(ctx.borrow(), lit, Reason::Clause(id)).is_err() {
                passed = false;
                break;
            }
        }
    }
    if passed {
        passed = propagate(ctx.borrow()).is_ok();
    }
    if !passed {
        ctx.part_mut(EngineStateP).root_conflict = true;
        ctx.part_mut(TrailP).clear_queue();
        debug!("unit resolution failed at the root level");
    }

    info!(
        "loaded formula with {} variables and {} clauses",
        formula.var_count(),
        formula.len()
    );
}
