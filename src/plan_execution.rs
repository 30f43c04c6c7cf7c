use crate::aggregation::{DateRange, FilteredView, DEFAULT_TOP_NATURES};
use crate::cache::{DatasetCache, DEFAULT_CAPACITY};
use crate::classifier::{ClassifierConfig, KeywordClassifier};
use crate::data_loader::DEFAULT_SEPARATOR;
use crate::pipeline::{LoadOutcome, LoadPipeline};
use crate::plan::{ExportFileType, ExportProfileItem, Plan, ReportConfig};
use crate::schema::ColumnAliases;
use chrono::NaiveDate;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use tracing::{debug, error, info};

use anyhow::{anyhow, Context, Result};

/// Pipeline and cache shared by successive runs of one plan
struct PlanContext {
    pipeline: LoadPipeline,
    cache: DatasetCache,
}

impl PlanContext {
    fn new(plan: &Plan, plan_dir: &Path) -> Result<Self> {
        let classifier = KeywordClassifier::new(&plan.classification)
            .context("Invalid keyword in classification rules")?;
        let pipeline = LoadPipeline::new(plan.schema.clone(), classifier)
            .with_separator(plan.import.separator()?)
            .with_diagnostic_log(Some(plan_dir.join(plan.import.diagnostic_log())));
        Ok(Self {
            pipeline,
            cache: DatasetCache::new(Some(DEFAULT_CAPACITY)),
        })
    }

    /// Loads the input file, through the cache
    fn load(&mut self, input: &Path, skip_rows: usize) -> Result<LoadOutcome> {
        let content = std::fs::read(input)
            .with_context(|| format!("Failed to read input file {}", input.display()))?;
        let file_name = input.to_string_lossy();
        let pipeline = &self.pipeline;
        let outcome = self
            .cache
            .get_or_insert_with(&file_name, &content, skip_rows, || {
                pipeline.load(&file_name, &content, skip_rows)
            })?;
        let stats = self.cache.stats();
        debug!("Dataset cache: {} hits, {} misses", stats.hits, stats.misses);
        Ok(outcome)
    }
}

fn plan_dir(plan_file_path: &Path) -> Result<&Path> {
    plan_file_path
        .parent()
        .ok_or_else(|| anyhow!("Plan file has no parent directory"))
}

/// Report window from the configured bounds, completed with the dataset bounds
fn report_range(report: &ReportConfig, bounds: (NaiveDate, NaiveDate)) -> DateRange {
    DateRange::new(
        report.start.unwrap_or(bounds.0),
        report.end.unwrap_or(bounds.1),
    )
}

/// Template paths are relative to the plan file, like the other plan paths
fn resolve_exporter(exporter: &ExportFileType, plan_dir: &Path) -> ExportFileType {
    match exporter {
        ExportFileType::Custom(params) => {
            let mut params = params.clone();
            params.template = plan_dir.join(&params.template).to_string_lossy().to_string();
            if let Some(partials) = params.partials.as_mut() {
                for partial in partials.values_mut() {
                    *partial = plan_dir.join(&*partial).to_string_lossy().to_string();
                }
            }
            ExportFileType::Custom(params)
        }
        other => other.clone(),
    }
}

/// Exports the filtered records to the file named by the profile
fn export_view(
    view: &FilteredView,
    plan: &Plan,
    profile: &ExportProfileItem,
    plan_dir: &Path,
) -> Result<()> {
    let target: PathBuf = plan_dir.join(&profile.filename);
    info!(
        "Starting export to file: {} using exporter {:?}",
        target.display(),
        profile.exporter
    );

    let exporter = resolve_exporter(&profile.exporter, plan_dir);
    let output = crate::export::render(
        view,
        &exporter,
        plan.meta.as_ref(),
        plan.report.top_natures(),
    )?;
    crate::common::write_string_to_file(&target.to_string_lossy(), &output)?;
    Ok(())
}

/// Executes a single run of the plan
fn run_plan(plan: &Plan, plan_file_path: &Path, context: &mut PlanContext) -> Result<()> {
    let plan_dir = plan_dir(plan_file_path)?;
    let input = plan_dir.join(&plan.import.filename);
    info!("Importing file: {}", input.display());

    let outcome = context.load(&input, plan.import.skip_rows())?;
    let dataset = outcome.dataset;
    let bounds = dataset
        .date_bounds()
        .ok_or_else(|| anyhow!("Loaded dataset is empty"))?;
    let range = report_range(&plan.report, bounds);
    let view = FilteredView::new(&dataset, range);

    info!(
        "Report window {} to {}: {} of {} records",
        range.start,
        range.end,
        view.len(),
        dataset.len()
    );

    for profile in &plan.export.profiles {
        if let Err(e) = export_view(&view, plan, profile, plan_dir) {
            error!("Failed to export file {}: {}", profile.filename, e);
        }
    }

    Ok(())
}

/// Main function to execute a plan, with optional file watching
pub fn execute_plan(plan: String, watch: bool) -> Result<()> {
    info!("Executing plan {}", plan);

    let plan_file_path = Path::new(&plan);
    let path_content = std::fs::read_to_string(plan_file_path)
        .with_context(|| format!("Failed to read plan {}", plan_file_path.display()))?;
    let plan: Plan = serde_yaml::from_str(&path_content)?;

    debug!("Executing plan: {:?}", plan);
    let mut context = PlanContext::new(&plan, plan_dir(plan_file_path)?)?;
    run_plan(&plan, plan_file_path, &mut context)?;

    if watch {
        watch_for_changes(&plan, plan_file_path, &mut context)?;
    }

    Ok(())
}

/// Re-runs the plan each time the input file is modified
fn watch_for_changes(plan: &Plan, plan_file_path: &Path, context: &mut PlanContext) -> Result<()> {
    info!("Watching for changes");
    let path = plan_dir(plan_file_path)?.join(&plan.import.filename);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
    watcher.watch(&path, RecursiveMode::NonRecursive)?;

    loop {
        match rx.recv() {
            Ok(event) => {
                if let Ok(event) = event {
                    if let EventKind::Modify(_) = event.kind {
                        debug!("File modified {:?}", event.paths);
                        info!("Change detected, re-executing plan");
                        if let Err(e) = run_plan(plan, plan_file_path, context) {
                            error!("Plan run failed: {:#}", e);
                        }
                    }
                }
            }
            Err(e) => {
                error!("Watch error: {:?}", e);
                return Err(e.into());
            }
        }
    }
}

/// One-shot analysis of a single file, outside of any plan
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub skip_rows: usize,
    pub separator: u8,
    pub diagnostic_log: Option<PathBuf>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub top_natures: usize,
    pub exporter: ExportFileType,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            skip_rows: crate::data_loader::DEFAULT_SKIP_ROWS,
            separator: DEFAULT_SEPARATOR,
            diagnostic_log: Some(PathBuf::from(crate::pipeline::DEFAULT_DIAGNOSTIC_LOG)),
            from: None,
            to: None,
            top_natures: DEFAULT_TOP_NATURES,
            exporter: ExportFileType::ReportJson,
        }
    }
}

/// Loads `file` with the built-in rules and renders it with `options.exporter`
pub fn analyze_file(file: &Path, options: &AnalyzeOptions) -> Result<String> {
    let classifier = KeywordClassifier::new(&ClassifierConfig::default())?;
    let pipeline = LoadPipeline::new(ColumnAliases::default(), classifier)
        .with_separator(options.separator)
        .with_diagnostic_log(options.diagnostic_log.clone());

    let outcome = pipeline.load_file(file, options.skip_rows)?;
    let dataset = outcome.dataset;
    let bounds = dataset
        .date_bounds()
        .ok_or_else(|| anyhow!("Loaded dataset is empty"))?;
    let report = ReportConfig {
        start: options.from,
        end: options.to,
        top_natures: Some(options.top_natures),
    };
    let view = FilteredView::new(&dataset, report_range(&report, bounds));
    let output = crate::export::render(&view, &options.exporter, None, options.top_natures)?;
    Ok(output)
}
