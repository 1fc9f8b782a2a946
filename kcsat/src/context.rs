//! Central engine data structure.
//!
//! This module defines the `Context` struct which holds all data used by the
//! engine. Functions operating on several fields take partial references so
//! the borrow checker can see which parts are touched.
use partial_ref::{part, partial, PartialRef, PartialRefTarget};

use crate::analyze_conflict::AnalyzeConflict;
use crate::clauses::Clauses;
use crate::occur::Occurrences;
use crate::prop::{Assignment, ImplGraph, Trail, Watchlists};
use crate::state::EngineState;
use crate::subsume::SubsumptionLog;
use crate::vars::Variables;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub AnalyzeConflictP: AnalyzeConflict);
    part!(pub AssignmentP: Assignment);
    part!(pub ClausesP: Clauses);
    part!(pub EngineStateP: EngineState);
    part!(pub ImplGraphP: ImplGraph);
    part!(pub OccurrencesP: Occurrences);
    part!(pub SubsumptionP: SubsumptionLog);
    part!(pub TrailP: Trail);
    part!(pub VariablesP: Variables);
    part!(pub WatchlistsP: Watchlists);
}

pub use parts::*;

/// Central engine data structure.
///
/// This struct contains all data kept by the engine. Functions operating on
/// multiple fields use partial references provided by the `partial_ref`
/// crate, which documents the data dependencies without the overhead of
/// passing individual references.
#[derive(PartialRefTarget, Default)]
pub struct Context {
    #[part(AnalyzeConflictP)]
    pub analyze_conflict: AnalyzeConflict,
    #[part(AssignmentP)]
    pub assignment: Assignment,
    #[part(ClausesP)]
    pub clauses: Clauses,
    #[part(EngineStateP)]
    pub engine_state: EngineState,
    #[part(ImplGraphP)]
    pub impl_graph: ImplGraph,
    #[part(OccurrencesP)]
    pub occurrences: Occurrences,
    #[part(SubsumptionP)]
    pub subsumption: SubsumptionLog,
    #[part(TrailP)]
    pub trail: Trail,
    #[part(VariablesP)]
    pub variables: Variables,
    #[part(WatchlistsP)]
    pub watchlists: Watchlists,
}

/// Update structures for a new variable count.
pub fn set_var_count(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut ImplGraphP,
        mut OccurrencesP,
        mut VariablesP,
        mut WatchlistsP,
    ),
    count: usize,
) {
    // one extra slot backs the synthetic contradiction variable
    let slots = count + 1;
    ctx.part_mut(AnalyzeConflictP).set_var_count(slots);
    ctx.part_mut(AssignmentP).set_var_count(slots);
    ctx.part_mut(ImplGraphP).set_var_count(slots);
    ctx.part_mut(OccurrencesP).set_var_count(slots);
    ctx.part_mut(WatchlistsP).set_var_count(slots);
    ctx.part_mut(VariablesP).set_var_count(count);
}
