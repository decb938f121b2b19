use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{error, info};

use crate::config::DeformationConfig;
use crate::error::{DefmapError, Result};
use crate::io::frames::{group_by_slice, FrameSource};
use crate::io::sink::OutputSink;
use crate::stack::{build_slice_stack, StackId};

use super::types::{NoOpReporter, PipelineStage, ProgressReporter};

/// Shape of a persisted stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackSummary {
    pub id: StackId,
    pub len: usize,
    pub height: usize,
    pub width: usize,
}

/// A slice that could not be processed; other slices are unaffected.
#[derive(Debug)]
pub struct SliceFailure {
    pub slice: u32,
    pub error: DefmapError,
}

#[derive(Debug, Default)]
pub struct DeformationReport {
    pub completed: Vec<StackSummary>,
    pub failed: Vec<SliceFailure>,
}

impl DeformationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Build and persist one deformation stack per slice found in `source`.
pub fn run_deformation(
    source: &dyn FrameSource,
    config: &DeformationConfig,
    sink: &dyn OutputSink,
) -> Result<DeformationReport> {
    run_deformation_reported(source, config, sink, Arc::new(NoOpReporter))
}

/// Build and persist one deformation stack per slice, reporting progress.
///
/// Slices are computed in parallel. The time sequence of the lowest slice
/// is the reference for all slices. A slice is persisted only after every
/// one of its frame pairs succeeded; fatal input errors are collected per
/// slice in the report instead of aborting the run.
pub fn run_deformation_reported(
    source: &dyn FrameSource,
    config: &DeformationConfig,
    sink: &dyn OutputSink,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<DeformationReport> {
    config.validate()?;

    let groups = group_by_slice(&source.keys()?);
    let Some(times) = groups.values().next().cloned() else {
        return Err(DefmapError::NoFrames);
    };
    let slices: Vec<u32> = groups.keys().copied().collect();
    info!(
        slices = ?slices,
        time_points = times.len(),
        metric = %config.metric,
        "Frames indexed"
    );

    let total_pairs = times.len().saturating_sub(1) * slices.len();
    reporter.begin_stage(PipelineStage::ComputingDeformation, Some(total_pairs));
    let done = AtomicUsize::new(0);

    let results: Vec<_> = slices
        .par_iter()
        .map(|&slice| {
            info!(slice, "Computing deformation stack");
            let stack = build_slice_stack(source, slice, &times, config, |_| {
                let completed = done.fetch_add(1, Ordering::Relaxed) + 1;
                reporter.advance(completed);
            });
            (slice, stack)
        })
        .collect();
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::PersistingStacks, Some(results.len()));
    let mut report = DeformationReport::default();
    for (i, (slice, result)) in results.into_iter().enumerate() {
        let persisted = result.and_then(|stack| {
            sink.write_stack(&stack)?;
            Ok(StackSummary {
                id: stack.id,
                len: stack.len(),
                height: stack.height(),
                width: stack.width(),
            })
        });
        match persisted {
            Ok(summary) => report.completed.push(summary),
            Err(error) => {
                error!(slice, error = %error, "Slice failed");
                report.failed.push(SliceFailure { slice, error });
            }
        }
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    info!(
        completed = report.completed.len(),
        failed = report.failed.len(),
        "Deformation run finished"
    );
    Ok(report)
}
