//! An incremental CDCL reasoning core for knowledge compilation.
//!
//! This library implements the stateful engine a knowledge compiler drives:
//! it decides literals, runs two-watched-literal unit resolution, analyzes
//! conflicts down to the first unique implication point, learns asserting
//! clauses and undoes decisions chronologically. There is no built-in search
//! strategy; the caller owns the policy and the engine owns the inferences.
//!
//! The main entry point is [`SatState`], built from a
//! [`CnfFormula`](kcsat_formula::CnfFormula) or straight from a DIMACS CNF
//! file.

mod analyze_conflict;
mod clauses;
mod context;
mod decide;
mod engine;
mod learn;
mod load;
mod occur;
mod prop;
mod state;
mod subsume;
mod vars;

pub use clauses::ClauseId;
pub use engine::SatState;

pub use kcsat_formula::{cnf, lit, CnfFormula, Lit, Var};
