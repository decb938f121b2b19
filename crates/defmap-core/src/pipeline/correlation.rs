use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::{CorrelationConfig, MetricKind};
use crate::detection::DetectionRecord;
use crate::error::Result;
use crate::io::naming::{stack_tag, StackNaming};
use crate::io::sink::OutputSink;
use crate::sampling::{sample_detections, SampleTable};
use crate::stack::{DeformationStack, StackId};
use crate::stats::{correlate_lags, lag_profiles, CorrelationSummary, LagProfiles, StatisticsTable};

use super::types::{NoOpReporter, PipelineStage, ProgressReporter};

/// Everything computed for one stack.
#[derive(Clone, Debug)]
pub struct CorrelationReport {
    pub tag: String,
    pub samples: SampleTable,
    pub statistics: StatisticsTable,
    pub profiles: LagProfiles,
    pub summary: CorrelationSummary,
}

/// Outcome of analysing one stack file.
#[derive(Debug)]
pub struct StackAnalysis {
    pub path: PathBuf,
    pub tag: String,
    pub outcome: Result<CorrelationReport>,
}

/// Sample `stack` around `detections`, correlate per lag, and write the
/// sample, statistics and profile tables under `tag`.
pub fn run_correlation(
    stack: &DeformationStack,
    detections: &[DetectionRecord],
    config: &CorrelationConfig,
    tag: &str,
    sink: &dyn OutputSink,
) -> Result<CorrelationReport> {
    run_correlation_reported(stack, detections, config, tag, sink, Arc::new(NoOpReporter))
}

/// Same as [`run_correlation`], reporting progress.
pub fn run_correlation_reported(
    stack: &DeformationStack,
    detections: &[DetectionRecord],
    config: &CorrelationConfig,
    tag: &str,
    sink: &dyn OutputSink,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<CorrelationReport> {
    config.validate()?;
    info!(
        tag,
        frames = stack.len(),
        height = stack.height(),
        width = stack.width(),
        detections = detections.len(),
        "Correlating stack with detections"
    );

    reporter.begin_stage(PipelineStage::Sampling, Some(config.scales.len()));
    let samples = sample_detections(stack, detections, config);
    reporter.finish_stage();
    if samples.is_empty() {
        warn!(tag, "No samples were retained; all lags are undefined");
    }

    reporter.begin_stage(PipelineStage::Correlating, Some(config.lags.len()));
    let statistics = correlate_lags(&samples, &config.lags);
    let profiles = lag_profiles(&samples, &config.scales);
    let summary = CorrelationSummary::new(&samples, &statistics);
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Writing, Some(3));
    sink.write_samples(tag, &samples)?;
    reporter.advance(1);
    sink.write_statistics(tag, &statistics)?;
    reporter.advance(2);
    sink.write_profiles(tag, &profiles)?;
    reporter.advance(3);
    reporter.finish_stage();

    info!(
        tag,
        events = summary.event_count,
        samples = summary.sample_count,
        min_p = ?summary.min_p,
        significant_lags = ?summary.significant_lags,
        "Correlation finished"
    );

    Ok(CorrelationReport {
        tag: tag.to_string(),
        samples,
        statistics,
        profiles,
        summary,
    })
}

/// Analyse several persisted stacks against the same detections.
///
/// Each stack is processed independently; a stack that fails to load or
/// write is reported in its [`StackAnalysis`] without stopping the rest.
pub fn analyze_stack_files(
    paths: &[PathBuf],
    detections: &[DetectionRecord],
    config: &CorrelationConfig,
    sink: &dyn OutputSink,
    naming: &dyn StackNaming,
) -> Vec<StackAnalysis> {
    paths
        .iter()
        .map(|path| {
            let tag = stack_tag(path);
            let outcome = DeformationStack::load(path, stack_id(path, naming))
                .and_then(|stack| run_correlation(&stack, detections, config, &tag, sink));
            if let Err(ref e) = outcome {
                error!(path = %path.display(), error = %e, "Stack analysis failed");
            }
            StackAnalysis {
                path: path.clone(),
                tag,
                outcome,
            }
        })
        .collect()
}

/// Identity from the file name, or a best guess for foreign names.
fn stack_id(path: &Path, naming: &dyn StackNaming) -> StackId {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some((slice, metric)) = naming.parse(&name) {
        return StackId { slice, metric };
    }

    let metric = if name.to_ascii_lowercase().contains("div") {
        MetricKind::Divergence
    } else {
        MetricKind::Magnitude
    };
    let slice = stack_tag(path)
        .strip_prefix('Z')
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0);
    StackId { slice, metric }
}
