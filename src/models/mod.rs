pub mod report;
pub mod anomaly;
pub mod analysis;
pub mod incident;
pub mod metrics;

pub use report::*;
pub use anomaly::*;
pub use analysis::*;
pub use incident::*;
pub use metrics::*;
