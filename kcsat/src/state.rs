//! Miscellaneous engine state.

/// Miscellaneous engine state.
///
/// Anything larger or any group of related state variables should be moved
/// into a separate part of [`Context`](crate::context::Context).
#[derive(Default)]
pub struct EngineState {
    /// Latched when unit resolution fails at the root level.
    ///
    /// Once set, `decide` and `assert_clause` report the false clause without
    /// touching the state: the formula is unsatisfiable by unit resolution
    /// alone.
    pub root_conflict: bool,
}
