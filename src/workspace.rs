//! Results directory layout for baseline and evaluation runs

use crate::error::Result;
use crate::questions::Question;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const BASELINE_SUMMARY_FILE: &str = "questions_baseline_summary.tsv";
pub const DATASET_PREFIX: &str = "question_";
pub const DATASET_EXTENSION: &str = "tsv";
pub const SUMMARY_PREFIX: &str = "questions_summary_";

/// Manages the results directory
#[derive(Debug, Clone)]
pub struct ResultsWorkspace {
    /// Results root (performance reports live here)
    pub root: PathBuf,
    /// baseline/ directory holding reference datasets
    pub baseline_dir: PathBuf,
    /// runs/ directory holding evaluation summaries and per-model results
    pub runs_dir: PathBuf,
}

impl ResultsWorkspace {
    /// Workspace paths under `root`, without touching the filesystem
    pub fn from_root(root: PathBuf) -> Self {
        let baseline_dir = root.join("baseline");
        let runs_dir = root.join("runs");

        Self {
            root,
            baseline_dir,
            runs_dir,
        }
    }

    /// Create the directory layout if needed
    pub fn create(root: PathBuf) -> Result<Self> {
        let workspace = Self::from_root(root);

        fs::create_dir_all(&workspace.baseline_dir)?;
        fs::create_dir_all(&workspace.runs_dir)?;

        log::debug!("Using results workspace at: {}", workspace.root.display());
        Ok(workspace)
    }

    /// Path of the baseline dataset for a question
    pub fn baseline_dataset_path(&self, question: &Question) -> PathBuf {
        self.baseline_dir
            .join(format!("{}.{}", question.dataset_name(), DATASET_EXTENSION))
    }

    pub fn baseline_summary_path(&self) -> PathBuf {
        self.baseline_dir.join(BASELINE_SUMMARY_FILE)
    }

    /// Path of the evaluation summary for a run started at `stamp`
    pub fn summary_path(&self, prefix: &str, stamp: &str) -> PathBuf {
        self.runs_dir
            .join(format!("{}{}_{}.{}", SUMMARY_PREFIX, prefix, stamp, DATASET_EXTENSION))
    }

    /// Path of the per-model results YAML
    pub fn model_results_path(&self, prefix: &str, model_name: &str) -> PathBuf {
        self.runs_dir
            .join(format!("{}_{}.yaml", prefix, sanitize_file_component(model_name)))
    }

    /// Path of the performance report, optionally scoped to a data source
    pub fn report_path(&self, source: Option<&str>) -> PathBuf {
        match source {
            Some(source) => self.root.join(format!("performance_report_{}.txt", source)),
            None => self.root.join("performance_report.txt"),
        }
    }

    /// Baseline dataset files, sorted by name
    pub fn list_baseline_datasets(&self) -> Result<Vec<PathBuf>> {
        list_files(&self.baseline_dir, |name| {
            name.starts_with(DATASET_PREFIX) && has_extension(name, DATASET_EXTENSION)
        })
    }

    /// Evaluation summaries whose name starts with `prefix` and, when
    /// given, contains `source`
    pub fn list_summaries(&self, prefix: &str, source: Option<&str>) -> Result<Vec<PathBuf>> {
        list_files(&self.runs_dir, |name| {
            name.starts_with(prefix)
                && has_extension(name, DATASET_EXTENSION)
                && source.map_or(true, |s| name.contains(s))
        })
    }

    /// Remove baseline datasets and the baseline summary.
    /// Returns the number of files removed.
    pub fn remove_baseline_datasets(&self) -> Result<usize> {
        if !self.baseline_dir.exists() {
            log::info!(
                "Baseline directory {} does not exist, nothing to remove",
                self.baseline_dir.display()
            );
            return Ok(0);
        }

        let mut removed = 0;
        for path in self.list_baseline_datasets()? {
            log::info!("Removing baseline dataset {}", path.display());
            fs::remove_file(&path)?;
            removed += 1;
        }

        let summary = self.baseline_summary_path();
        if summary.exists() {
            log::info!("Removing baseline summary {}", summary.display());
            fs::remove_file(summary)?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Get workspace statistics
    pub fn stats(&self) -> Result<WorkspaceStats> {
        let mut stats = WorkspaceStats {
            baseline_datasets: self.list_baseline_datasets()?.len(),
            ..WorkspaceStats::default()
        };

        if self.runs_dir.exists() {
            for entry in WalkDir::new(&self.runs_dir).min_depth(1).max_depth(1) {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if name.starts_with(SUMMARY_PREFIX) {
                    stats.summaries += 1;
                } else if has_extension(&name, "yaml") {
                    stats.model_results += 1;
                }
                stats.total_size += entry.metadata()?.len();
            }
        }

        Ok(stats)
    }
}

/// Statistics about the results workspace
#[derive(Debug, Default, serde::Serialize)]
pub struct WorkspaceStats {
    pub baseline_datasets: usize,
    pub summaries: usize,
    pub model_results: usize,
    pub total_size: u64,
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case(extension))
}

fn list_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !dir.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() && keep(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Model names may contain path separators (e.g. `meta/llama-3`)
fn sanitize_file_component(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect()
}
