pub mod browser;
pub mod core;
pub mod detect;
pub mod features;

// --- Primary core exports ---
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::AnalysisError;
pub use crate::core::AppState;
pub use detect::{AnalysisOutcome, Detector, DetectorConfig, SanitizedUrl};
