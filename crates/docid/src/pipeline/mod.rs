pub mod error;
pub mod result;
pub mod runner;
pub mod strategy;

pub use error::IdentifyError;
pub use result::IdentificationResult;
pub use runner::IdentificationPipeline;
pub use strategy::{CandidatePolicy, DetectionStrategy, PayloadValidator};
