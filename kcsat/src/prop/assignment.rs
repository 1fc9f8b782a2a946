//! Partial assignment and trail.
use partial_ref::{partial, PartialRef};

use kcsat_formula::lit::LitIdx;
use kcsat_formula::{Lit, Var};

use crate::context::{AssignmentP, Context, ImplGraphP, TrailP};

use super::Reason;

/// Current partial assignment.
#[derive(Default)]
pub struct Assignment {
    assignment: Vec<Option<bool>>,
}

impl Assignment {
    /// Update structures for a new variable count.
    ///
    /// `count` includes the slot of the contradiction variable.
    pub fn set_var_count(&mut self, count: usize) {
        self.assignment.resize(count, None);
    }

    /// Value assigned to a variable.
    pub fn var_value(&self, var: Var) -> Option<bool> {
        self.assignment[var.index()]
    }

    /// Whether a variable is instantiated.
    pub fn is_instantiated(&self, var: Var) -> bool {
        self.assignment[var.index()].is_some()
    }

    /// Value assigned to a literal.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.index()].map(|b| b ^ lit.is_negative())
    }

    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.lit_value(lit) == Some(true)
    }

    pub fn lit_is_false(&self, lit: Lit) -> bool {
        self.lit_value(lit) == Some(false)
    }

    pub fn lit_is_unk(&self, lit: Lit) -> bool {
        self.lit_value(lit).is_none()
    }

    pub fn assign_lit(&mut self, lit: Lit) {
        self.assignment[lit.index()] = lit.is_positive().into()
    }

    pub fn unassign_var(&mut self, var: Var) {
        self.assignment[var.index()] = None;
    }
}

/// Decision and propagation history.
///
/// The trail doubles as the propagation queue: entries past `queue_head` are
/// assigned but their consequences have not been propagated yet. The queue
/// is drained in assignment order, so propagation is FIFO.
#[derive(Default)]
pub struct Trail {
    /// Stack of all assigned literals.
    trail: Vec<Lit>,
    /// Next trail entry to propagate.
    queue_head: usize,
    /// Start of each decision level as a trail index.
    ///
    /// The root level has no entry, so `level = boundaries.len() + 1`.
    boundaries: Vec<LitIdx>,
}

impl Trail {
    /// Assigned literals in assignment order.
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// Current decision level. The root level is 1.
    pub fn current_level(&self) -> usize {
        self.boundaries.len() + 1
    }

    /// Start a new decision level.
    pub fn new_level(&mut self) {
        self.boundaries.push(self.trail.len() as LitIdx);
    }

    /// Drop the current decision level's boundary.
    ///
    /// The caller must have removed the level's trail entries first.
    pub fn retract_level(&mut self) {
        debug_assert!(!self.boundaries.is_empty());
        debug_assert_eq!(self.boundaries.last().cloned(), Some(self.trail.len() as LitIdx));
        self.boundaries.pop();
    }

    /// Next assigned literal to propagate, removed from the queue.
    pub fn pop_queue(&mut self) -> Option<Lit> {
        let head = self.trail.get(self.queue_head).cloned();
        if head.is_some() {
            self.queue_head += 1;
        }
        head
    }

    /// Whether all assignments are propagated.
    pub fn queue_is_empty(&self) -> bool {
        self.queue_head == self.trail.len()
    }

    /// Drop all pending propagations.
    pub fn clear_queue(&mut self) {
        self.queue_head = self.trail.len();
    }

    /// Remove the newest trail entry.
    pub fn pop(&mut self) -> Option<Lit> {
        let lit = self.trail.pop();
        self.queue_head = self.queue_head.min(self.trail.len());
        lit
    }

    fn push(&mut self, lit: Lit) {
        self.trail.push(lit);
    }
}

/// Assign true to a literal and schedule it for propagation.
///
/// Updates the assignment, the trail and the literal's decision record. The
/// literal has to be unassigned when calling this.
pub fn enqueue_assignment(
    mut ctx: partial!(Context, mut AssignmentP, mut ImplGraphP, mut TrailP),
    lit: Lit,
    reason: Reason,
) {
    let assignment = ctx.part_mut(AssignmentP);
    debug_assert!(assignment.lit_value(lit).is_none());

    assignment.assign_lit(lit);

    let (trail, mut ctx) = ctx.split_part_mut(TrailP);
    trail.push(lit);

    let node = ctx.part_mut(ImplGraphP).node_mut(lit.var());
    node.reason = reason;
    node.level = trail.current_level() as LitIdx;
}
