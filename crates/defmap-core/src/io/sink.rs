//! Destinations for pipeline artifacts.
//!
//! Computation produces typed in-memory values; an [`OutputSink`] decides
//! where they end up.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::info;

use crate::error::Result;
use crate::sampling::SampleTable;
use crate::stack::{DeformationStack, StackId};
use crate::stats::{LagProfile, LagProfiles, StatisticsTable};

use super::naming::{DefmapStackNaming, StackNaming};

/// One method per artifact type. `tag` labels the analysed stack (e.g. `Z2`).
pub trait OutputSink: Send + Sync {
    fn write_stack(&self, stack: &DeformationStack) -> Result<()>;

    fn write_samples(&self, tag: &str, samples: &SampleTable) -> Result<()>;

    fn write_statistics(&self, tag: &str, statistics: &StatisticsTable) -> Result<()>;

    fn write_profiles(&self, tag: &str, profiles: &LagProfiles) -> Result<()>;
}

/// Writes `.npy` stacks and CSV tables into one directory.
pub struct DirectorySink {
    dir: PathBuf,
    naming: Box<dyn StackNaming>,
}

impl DirectorySink {
    /// Create the directory if needed.
    pub fn new(dir: &Path) -> Result<Self> {
        Self::with_naming(dir, Box::new(DefmapStackNaming))
    }

    pub fn with_naming(dir: &Path, naming: Box<dyn StackNaming>) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            naming,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stack_path(&self, id: StackId) -> PathBuf {
        self.dir.join(self.naming.file_name(id.slice, id.metric))
    }

    pub fn samples_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("lag_corr_table_{tag}_all.csv"))
    }

    pub fn statistics_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("lag_corr_stats_{tag}_all.csv"))
    }

    pub fn profiles_path(&self, tag: &str) -> PathBuf {
        self.dir.join(format!("lag_profile_{tag}_all.csv"))
    }
}

impl OutputSink for DirectorySink {
    fn write_stack(&self, stack: &DeformationStack) -> Result<()> {
        let path = self.stack_path(stack.id);
        stack.save(&path)?;
        info!(
            slice = stack.id.slice,
            metric = stack.id.metric.tag(),
            frames = stack.len(),
            height = stack.height(),
            width = stack.width(),
            path = %path.display(),
            "Deformation stack saved"
        );
        Ok(())
    }

    fn write_samples(&self, tag: &str, samples: &SampleTable) -> Result<()> {
        let path = self.samples_path(tag);
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "frame,lag,conf,value,scale")?;
        for s in &samples.rows {
            writeln!(
                w,
                "{},{},{},{},{}",
                s.frame, s.lag, s.confidence, s.value, s.scale
            )?;
        }
        w.flush()?;
        info!(rows = samples.len(), path = %path.display(), "Sample table saved");
        Ok(())
    }

    fn write_statistics(&self, tag: &str, statistics: &StatisticsTable) -> Result<()> {
        let path = self.statistics_path(tag);
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "lag,r,p,method,n,significant")?;
        for row in &statistics.rows {
            writeln!(
                w,
                "{},{},{},{},{},{}",
                row.lag,
                optional(row.r),
                optional(row.p),
                row.method,
                row.n,
                row.is_significant()
            )?;
        }
        w.flush()?;
        info!(path = %path.display(), "Statistics table saved");
        Ok(())
    }

    fn write_profiles(&self, tag: &str, profiles: &LagProfiles) -> Result<()> {
        let path = self.profiles_path(tag);
        let mut w = BufWriter::new(File::create(&path)?);
        writeln!(w, "scale,lag,mean,sem,count")?;
        for profile in profiles.per_scale.iter().chain([&profiles.pooled]) {
            write_profile(&mut w, profile)?;
        }
        w.flush()?;
        info!(path = %path.display(), "Lag profiles saved");
        Ok(())
    }
}

fn write_profile(w: &mut impl Write, profile: &LagProfile) -> Result<()> {
    let scale = profile
        .scale
        .map_or_else(|| "all".to_string(), |s| s.to_string());
    for point in &profile.points {
        writeln!(
            w,
            "{},{},{},{},{}",
            scale,
            point.lag,
            point.mean,
            optional(point.sem),
            point.count
        )?;
    }
    Ok(())
}

/// Empty cell for undefined values.
fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Everything written to a [`MemorySink`], in write order.
#[derive(Clone, Debug, Default)]
pub struct SinkContents {
    pub stacks: Vec<DeformationStack>,
    pub samples: Vec<(String, SampleTable)>,
    pub statistics: Vec<(String, StatisticsTable)>,
    pub profiles: Vec<(String, LagProfiles)>,
}

/// Keeps artifacts in memory; used by tests and embedding callers.
#[derive(Debug, Default)]
pub struct MemorySink {
    contents: Mutex<SinkContents>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> MutexGuard<'_, SinkContents> {
        self.contents.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn into_contents(self) -> SinkContents {
        self.contents
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl OutputSink for MemorySink {
    fn write_stack(&self, stack: &DeformationStack) -> Result<()> {
        self.contents().stacks.push(stack.clone());
        Ok(())
    }

    fn write_samples(&self, tag: &str, samples: &SampleTable) -> Result<()> {
        self.contents()
            .samples
            .push((tag.to_string(), samples.clone()));
        Ok(())
    }

    fn write_statistics(&self, tag: &str, statistics: &StatisticsTable) -> Result<()> {
        self.contents()
            .statistics
            .push((tag.to_string(), statistics.clone()));
        Ok(())
    }

    fn write_profiles(&self, tag: &str, profiles: &LagProfiles) -> Result<()> {
        self.contents()
            .profiles
            .push((tag.to_string(), profiles.clone()));
        Ok(())
    }
}
