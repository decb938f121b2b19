mod correlation;
mod deformation;
mod types;

pub use correlation::{
    analyze_stack_files, run_correlation, run_correlation_reported, CorrelationReport,
    StackAnalysis,
};
pub use deformation::{
    run_deformation, run_deformation_reported, DeformationReport, SliceFailure, StackSummary,
};
pub use types::{PipelineStage, ProgressReporter};
