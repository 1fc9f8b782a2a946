//! Conflict analysis: computes the first unique implication point and builds
//! the asserting clause.
//!
//! The first UIP is the variable closest to the conflict through which every
//! implication path from the current decision to the conflict passes. It is
//! computed as the immediate dominator of the contradiction entry in the
//! current level's implication graph, with a classic common-dominator walk
//! over the trail suffix. The asserting clause negates the UIP and the
//! lower-level literals feeding the implications behind it; its assertion
//! level is the deepest of those lower levels.
use partial_ref::{partial, PartialRef};

use log::debug;

use kcsat_formula::lit::LitIdx;
use kcsat_formula::Var;

use crate::clauses::ClauseId;
use crate::context::{
    AnalyzeConflictP, AssignmentP, ClausesP, Context, ImplGraphP, TrailP, VariablesP,
};
use crate::prop::Reason;

/// Scratch space of the conflict analyzer.
#[derive(Default)]
pub struct AnalyzeConflict {
    /// Set for variables collected into the clause under construction.
    ///
    /// All zero outside of analyzer runs.
    marks: Vec<bool>,
}

impl AnalyzeConflict {
    /// Update structures for a new variable count.
    ///
    /// `count` includes the slot of the contradiction variable.
    pub fn set_var_count(&mut self, count: usize) {
        self.marks.resize(count, false);
    }
}

/// Compute the first UIP of the current conflict.
///
/// Re-initializes `order` and `dominator` for the whole current-level trail
/// suffix, then folds the current-level predecessors of every implied entry
/// into its dominator, in trail order. The contradiction entry is the last
/// of the suffix, so its dominator is the first UIP.
fn compute_uip(mut ctx: partial!(Context, mut ImplGraphP, ClausesP, TrailP, VariablesP)) -> Var {
    let (trail_part, mut ctx) = ctx.split_part(TrailP);
    let trail = trail_part.trail();
    let level = trail_part.current_level();
    let (graph, ctx) = ctx.split_part_mut(ImplGraphP);
    let clauses = ctx.part(ClausesP);

    debug_assert_eq!(
        trail.last().map(|lit| lit.var()),
        Some(ctx.part(VariablesP).contradiction())
    );

    let mut decision_index = trail.len() - 1;
    while graph.reason(trail[decision_index].var()) != Reason::Decision {
        decision_index -= 1;
    }
    let decision = trail[decision_index].var();

    for (index, &entry) in trail.iter().enumerate().skip(decision_index) {
        let node = graph.node_mut(entry.var());
        node.order = index as LitIdx;
        node.dominator = decision;
    }

    for &entry in trail[decision_index + 1..].iter() {
        let var = entry.var();
        let clause = match graph.reason(var) {
            Reason::Clause(clause) => clause,
            Reason::Decision => continue,
        };

        let mut dominator = None;
        for &pred in clauses.get(clause).lits() {
            let pred_var = pred.var();
            if pred_var == var || graph.level(pred_var) != level {
                continue;
            }
            dominator = Some(match dominator {
                None => pred_var,
                Some(dom) => graph.common_dominator(dom, pred_var),
            });
        }
        graph.node_mut(var).dominator = dominator.unwrap_or(decision);
    }

    graph.dominator(ctx.part(VariablesP).contradiction())
}

/// Build the asserting clause for the recorded conflict.
///
/// The clause is allocated in the arena right away, which fixes its id; the
/// caller decides when to install it via `assert_clause`.
pub fn build_asserting_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut ClausesP,
        mut ImplGraphP,
        AssignmentP,
        TrailP,
        VariablesP,
    ),
) -> ClauseId {
    let uip = compute_uip(ctx.borrow());

    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let (trail_part, mut ctx) = ctx.split_part(TrailP);
    let trail = trail_part.trail();
    let level = trail_part.current_level();
    let (graph, mut ctx) = ctx.split_part(ImplGraphP);

    // Mark the lower-level literals feeding the implications between the UIP
    // and the conflict, walking the trail backwards from the contradiction.
    let mut clause_len = 1;
    let mut index = trail.len() - 1;
    while trail[index].var() != uip {
        let var = trail[index].var();
        if graph.common_dominator(uip, graph.dominator(var)) == uip {
            if let Reason::Clause(clause) = graph.reason(var) {
                for &pred in ctx.part(ClausesP).get(clause).lits() {
                    let pred_var = pred.var();
                    if graph.level(pred_var) < level && !analyze.marks[pred_var.index()] {
                        analyze.marks[pred_var.index()] = true;
                        clause_len += 1;
                    }
                }
            }
        }
        index -= 1;
    }

    // Emit the clause: the negated UIP first, then the marked literals in
    // trail order, negated as well.
    let assignment = ctx.part(AssignmentP);
    let mut lits = Vec::with_capacity(clause_len);
    let uip_value = assignment.var_value(uip) == Some(true);
    lits.push(uip.positive() ^ uip_value);

    let mut assertion_level = 1;
    if clause_len > 1 {
        for &entry in trail.iter() {
            let var = entry.var();
            let var_level = graph.level(var);
            if var_level >= level {
                break;
            }
            if analyze.marks[var.index()] {
                analyze.marks[var.index()] = false;
                let value = assignment.var_value(var) == Some(true);
                lits.push(var.positive() ^ value);
                assertion_level = assertion_level.max(var_level);
            }
        }
    }
    debug_assert!(analyze.marks.iter().all(|&mark| !mark));

    let clause = ctx.part_mut(ClausesP).add_learned(lits, assertion_level);
    debug!(
        "learned {:?} asserting at level {}",
        ctx.part(ClausesP).get(clause).lits(),
        assertion_level
    );
    clause
}
