//! Random formula generators for engine tests.
use proptest::{collection, prelude::*};

use rand::distributions::Bernoulli;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cnf::CnfFormula;
use crate::lit::Lit;

/// Generate a satisfiable instance.
///
/// Draws a full assignment first and emits only clauses containing at least
/// one literal satisfied by it.
pub fn sat_formula(
    vars: impl Strategy<Value = usize>,
    clause_count: impl Strategy<Value = usize>,
    density: impl Strategy<Value = f64>,
    flip_dist: impl Strategy<Value = f64>,
) -> impl Strategy<Value = CnfFormula> {
    (vars, clause_count, density, flip_dist).prop_flat_map(
        |(vars, clause_count, density, flip_dist)| {
            let density = Bernoulli::new(density).unwrap();
            let flip_dist = Bernoulli::new(flip_dist).unwrap();

            collection::vec(proptest::bool::ANY, vars).prop_perturb(move |polarity, mut rng| {
                let lits = polarity
                    .into_iter()
                    .enumerate()
                    .map(|(index, polarity)| Lit::from_index(index, polarity))
                    .collect::<Vec<_>>();

                let mut clauses: Vec<Vec<Lit>> = vec![];
                for _ in 0..clause_count {
                    let &planted = lits.choose(&mut rng).unwrap();
                    let mut clause = vec![planted];
                    for &lit in lits.iter() {
                        if lit != planted && rng.sample(density) {
                            clause.push(lit ^ rng.sample(flip_dist));
                        }
                    }
                    clause.shuffle(&mut rng);
                    clauses.push(clause);
                }

                clauses.shuffle(&mut rng);
                let mut formula = CnfFormula::from(clauses);
                formula.set_var_count(vars);
                formula
            })
        },
    )
}

/// Generate small hard unsat instances.
///
/// Follows the sgen construction (http://www.cs.qub.ac.uk/~i.spence/sgen/)
/// with randomly drawn partitions.
pub fn sgen_unsat_formula(
    blocks: impl Strategy<Value = usize>,
) -> impl Strategy<Value = CnfFormula> {
    blocks.prop_flat_map(|blocks| {
        collection::vec(proptest::bool::ANY, blocks * 4 + 1).prop_perturb(|polarity, mut rng| {
            let mut lits = polarity
                .into_iter()
                .enumerate()
                .map(|(index, polarity)| Lit::from_index(index, polarity))
                .collect::<Vec<_>>();

            let mut clauses: Vec<Vec<Lit>> = vec![];
            for &invert in [false, true].iter() {
                lits.shuffle(&mut rng);
                for block in lits.chunks_exact(4) {
                    for a in 0..4 {
                        for b in 0..a {
                            for c in 0..b {
                                let mut clause =
                                    vec![block[a] ^ invert, block[b] ^ invert, block[c] ^ invert];
                                clause.shuffle(&mut rng);
                                clauses.push(clause);
                            }
                        }
                    }
                }
                let &last = lits.last().unwrap();
                for b in 0..4 {
                    for c in 0..b {
                        let mut clause = vec![last ^ invert, lits[b] ^ invert, lits[c] ^ invert];
                        clause.shuffle(&mut rng);
                        clauses.push(clause);
                    }
                }
            }

            clauses.shuffle(&mut rng);
            CnfFormula::from(clauses)
        })
    })
}
