//! Nightly benchmark bookkeeping: records per-configuration pytest timings into CSV history
//! tables, renders chart-backed HTML reports, and provides the small shell helpers the nightly
//! scripts use around them.

#[macro_use]
extern crate lazy_static;

#[cfg(test)]
#[macro_use]
extern crate approx;

pub mod error;
pub mod history;
pub mod metadata;
pub mod optshim;
pub mod plot;
pub mod record;
pub mod report;
pub mod results;
pub mod series;
pub mod workers;

pub use error::{Error, Result};
