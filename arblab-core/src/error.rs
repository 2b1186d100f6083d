//! Engine error types.

use crate::domain::InstrumentKey;
use chrono::NaiveDate;
use thiserror::Error;

/// Fatal conditions raised while building the oracle or running a simulation.
///
/// Every variant carries enough context (date, key) to locate the bad input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimError {
    #[error("price not found for {key} on {date}")]
    MissingPrice { date: NaiveDate, key: InstrumentKey },

    #[error("{count} prices for {key} on {date}; resolve duplicates before building the oracle")]
    DuplicatePriceRecord {
        date: NaiveDate,
        key: InstrumentKey,
        count: usize,
    },

    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    #[error("simulation already completed")]
    SimulationFinished,

    #[error("simulation was aborted by an earlier error")]
    SimulationAborted,
}
