//! Stream utilities for record consumers.

mod meter;

pub use meter::{ActorTotals, Meter, MeterExt, MeterFrame};
