//! CNF formulas.
use std::cmp::max;
use std::fmt;
use std::iter::Extend;

use crate::lit::Lit;

/// A formula in conjunctive normal form.
///
/// Stores all clauses in one literal buffer; per clause only the end offset
/// is kept, so a clause starts where its predecessor ends.
#[derive(Default, Eq)]
pub struct CnfFormula {
    var_count: usize,
    lit_buf: Vec<Lit>,
    clause_ends: Vec<usize>,
}

impl CnfFormula {
    /// Create an empty formula.
    pub fn new() -> CnfFormula {
        CnfFormula::default()
    }

    /// Number of variables in the formula.
    ///
    /// Unmentioned variables below the largest mentioned one are counted, so
    /// per-variable tables can be indexed directly.
    pub fn var_count(&self) -> usize {
        self.var_count
    }

    /// Increase the number of variables in the formula.
    ///
    /// Does nothing if the formula already has at least `count` variables.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_count = max(self.var_count, count)
    }

    /// Number of clauses in the formula.
    pub fn len(&self) -> usize {
        self.clause_ends.len()
    }

    /// Whether the formula has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clause_ends.is_empty()
    }

    /// Append a clause to the formula.
    pub fn add_clause<L>(&mut self, literals: impl IntoIterator<Item = L>)
    where
        Vec<Lit>: Extend<L>,
    {
        let begin = self.lit_buf.len();
        self.lit_buf.extend(literals);

        for &lit in self.lit_buf[begin..].iter() {
            self.var_count = max(lit.index() + 1, self.var_count);
        }

        self.clause_ends.push(self.lit_buf.len());
    }

    /// The literals of the clause with the given position.
    pub fn clause(&self, index: usize) -> &[Lit] {
        let end = self.clause_ends[index];
        let begin = if index == 0 {
            0
        } else {
            self.clause_ends[index - 1]
        };
        &self.lit_buf[begin..end]
    }

    /// Iterator over all clauses.
    pub fn iter(&self) -> impl Iterator<Item = &[Lit]> {
        let lits = &self.lit_buf;
        let mut begin = 0;
        self.clause_ends.iter().map(move |&end| {
            let clause = &lits[begin..end];
            begin = end;
            clause
        })
    }
}

/// Convert any iterable of [`Lit`] iterables into a formula.
impl<F, C, L> From<F> for CnfFormula
where
    F: IntoIterator<Item = C>,
    C: IntoIterator<Item = L>,
    Vec<Lit>: Extend<L>,
{
    fn from(clauses: F) -> CnfFormula {
        let mut formula = CnfFormula::new();
        for clause in clauses {
            formula.add_clause(clause);
        }
        formula
    }
}

impl fmt::Debug for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.var_count(), f)?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for CnfFormula {
    fn eq(&self, other: &CnfFormula) -> bool {
        self.var_count() == other.var_count()
            && self.len() == other.len()
            && self.iter().eq(other.iter())
    }
}

#[cfg(any(test, feature = "proptest-strategies"))]
#[doc(hidden)]
pub mod strategy {
    use super::*;

    use proptest::{collection, collection::SizeRange, prelude::*};

    use crate::lit::strategy::lit;

    pub fn vec_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = Vec<Vec<Lit>>> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();

        vars.prop_ind_flat_map(move |vars| {
            collection::vec(
                collection::vec(lit(0..vars.max(1)), clause_len.clone()),
                clauses.clone(),
            )
        })
    }

    pub fn cnf_formula(
        vars: impl Strategy<Value = usize>,
        clauses: impl Into<SizeRange>,
        clause_len: impl Into<SizeRange>,
    ) -> impl Strategy<Value = CnfFormula> {
        let clauses = clauses.into();
        let clause_len = clause_len.into();

        vars.prop_ind_flat_map(move |vars| {
            collection::vec(
                collection::vec(lit(0..vars.max(1)), clause_len.clone()),
                clauses.clone(),
            )
            .prop_map(move |clause_vec| {
                let mut formula = CnfFormula::from(clause_vec);
                formula.set_var_count(vars);
                formula
            })
        })
    }
}
