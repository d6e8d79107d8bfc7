pub mod driver;
pub mod report;
pub mod stages;

pub use driver::{plan, process, run, Failure, RunSummary, SkipReason, SliceFile};
pub use report::Reporter;
pub use stages::Stage;
