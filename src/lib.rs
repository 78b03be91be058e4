pub mod analysis;
pub mod capital;
pub mod config;
pub mod error;
pub mod events;
pub mod severity;
pub mod simulation;
pub mod transfer;
pub mod types;

pub use error::{AnalysisError, Error, Result, SamplingError};
