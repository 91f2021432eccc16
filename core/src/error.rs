use thiserror::Error;

/// Error type for plot-info builds.
///
/// Missing pressures, zero durations and lookups outside the series are not
/// errors; they short-circuit to zero or empty results.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotError {
    #[error("could not allocate {requested} plot entries")]
    Allocation { requested: u64 },

    #[error("dive has no dive computer")]
    NoDiveComputer,
}
