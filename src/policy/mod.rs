//! Stateless policy evaluation: report in, anomalies and an overall verdict out.

pub mod checks;
pub mod aggregator;

pub use checks::evaluate;
pub use aggregator::{aggregate, Assessment};
