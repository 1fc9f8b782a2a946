//! The implication graph.
use kcsat_formula::lit::LitIdx;
use kcsat_formula::Var;

use crate::clauses::ClauseId;

/// What caused a variable to be assigned.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    /// Assigned by `decide`.
    Decision,
    /// Forced by the clause that became unit.
    Clause(ClauseId),
}

/// Propagation that made a clause empty.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Conflict(pub ClauseId);

/// Decision record of a single variable.
///
/// `level` and `reason` are maintained by the assignment code. `dominator`
/// and `order` are scratch values of the conflict analyzer: they are
/// re-initialized for the whole current-level trail suffix on every analyzer
/// run and are stale at any other time.
#[derive(Copy, Clone)]
pub struct ImplNode {
    pub reason: Reason,
    pub level: LitIdx,
    pub dominator: Var,
    pub order: LitIdx,
}

/// The implication graph.
///
/// A DAG over the instantiated variables: decisions and root-level units are
/// sources, every implied variable has incoming edges from the other
/// literals of its implying clause.
#[derive(Default)]
pub struct ImplGraph {
    /// Contains only valid data for indices of assigned variables.
    pub nodes: Vec<ImplNode>,
}

impl ImplGraph {
    /// Update structures for a new variable count.
    ///
    /// `count` includes the slot of the contradiction variable.
    pub fn set_var_count(&mut self, count: usize) {
        self.nodes.resize(
            count,
            ImplNode {
                reason: Reason::Decision,
                level: 0,
                dominator: Var::from_index(0),
                order: 0,
            },
        );
    }

    /// Get the reason for an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn reason(&self, var: Var) -> Reason {
        self.nodes[var.index()].reason
    }

    /// Get the decision level of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn level(&self, var: Var) -> usize {
        self.nodes[var.index()].level as usize
    }

    pub fn dominator(&self, var: Var) -> Var {
        self.nodes[var.index()].dominator
    }

    pub fn order(&self, var: Var) -> LitIdx {
        self.nodes[var.index()].order
    }

    pub fn node_mut(&mut self, var: Var) -> &mut ImplNode {
        &mut self.nodes[var.index()]
    }

    /// Deepest common dominator of two variables of the current level.
    ///
    /// Walks the dominator chains towards the decision, always advancing the
    /// variable with the larger trail order. Only valid while the analyzer
    /// has `dominator` and `order` initialized for the whole current-level
    /// trail suffix.
    pub fn common_dominator(&self, mut a: Var, mut b: Var) -> Var {
        while a != b {
            while self.order(a) < self.order(b) {
                b = self.dominator(b);
            }
            while self.order(b) < self.order(a) {
                a = self.dominator(a);
            }
        }
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use kcsat_formula::var;

    /// Builds a diamond shaped graph: 1 implies 2 and 3, which imply 4.
    ///
    /// The decision 1 dominates itself and everything else; the computed
    /// dominator of 4 is 1 because its paths fork through 2 and 3.
    fn diamond() -> ImplGraph {
        let mut graph = ImplGraph::default();
        graph.set_var_count(4);
        for index in 0..4 {
            let node = graph.node_mut(Var::from_index(index));
            node.order = index as LitIdx;
            node.dominator = Var::from_index(0);
        }
        graph
    }

    #[test]
    fn common_dominator_walk() {
        let graph = diamond();
        assert_eq!(graph.common_dominator(var!(2), var!(3)), var!(1));
        assert_eq!(graph.common_dominator(var!(4), var!(2)), var!(1));
        assert_eq!(graph.common_dominator(var!(4), var!(4)), var!(4));
        assert_eq!(graph.common_dominator(var!(1), var!(4)), var!(1));
    }
}
