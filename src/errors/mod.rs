pub mod types;
pub mod classification;

pub use types::GuardianError;
pub use classification::ErrorClassification;
