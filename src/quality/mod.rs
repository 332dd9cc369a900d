pub mod checks;
pub mod detect;
pub mod interactive;
pub mod key;
pub mod repair;
pub mod report;

pub use detect::{detect_duplicates, DetectOptions, DuplicateGroup, Occurrence};
pub use key::comparison_key;
pub use repair::{AlternativeSource, RepairEngine, RepairError, RepairState};
pub use report::{run_quality_check, QualityOptions, QualityReport};
