pub mod dictionary;
pub mod normalizer;
pub mod resolver;

pub use dictionary::{match_canonical, scan_text, CanonicalAllergen};
pub use normalizer::normalize;
pub use resolver::{analyze, resolve, ConflictSet, ProductAnalysis, ScanOutcome};
