//! Encoder comparison driver.
//!
//! A run is configured by a [`CompareConfig`] and the [`Toolchain`] resolved
//! for it. Stages run in a fixed order (info, batch, files, metrics), each
//! writing one CSV table to the report stream:
//!
//! ```text
//! info     Component,Version
//! batch    Batch conversion,Time (ns)
//! files    File,Tool,Time (ns),Size (Bytes)
//! metrics  File,Tool,FLIP (Mean),PSNR,RMSE (%),SSIM
//! ```
//!
//! Encoded files are written to `<output>/<tool>/<stem>.dds`. The metrics
//! stage reads them from there, so it needs a previous `batch` or `files`
//! run for the same tools.

use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::metrics::{self, MetricRow};
use crate::probe;
use crate::report::{
    BATCH_HEADER, BatchRow, FILES_HEADER, FileRow, INFO_HEADER, InfoRow, METRICS_HEADER,
    TableWriter,
};
use crate::runner::{self, RunOptions};
use crate::toolchain::{FLIP, MAGICK, Toolchain};

/// Which tables to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stages {
    /// System and tool versions.
    pub info: bool,
    /// Time to encode the whole input set per tool.
    pub batch: bool,
    /// Time and size per file and tool.
    pub files: bool,
    /// Quality metrics of previously encoded files.
    pub metrics: bool,
}

/// Configuration of one comparison run.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Directory containing the source PNGs.
    pub input_dir: PathBuf,
    /// Directory receiving one subdirectory per tool.
    pub output_dir: PathBuf,
    /// Encoders taking part, in report order.
    pub backends: Vec<Backend>,
    pub stages: Stages,
    pub options: RunOptions,
}

impl CompareConfig {
    /// Create a configuration with no encoders and no stages selected.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            backends: Vec::new(),
            stages: Stages::default(),
            options: RunOptions::default(),
        }
    }

    /// Select encoders. Duplicates are dropped and registry order is kept.
    #[must_use]
    pub fn with_backends(mut self, backends: impl IntoIterator<Item = Backend>) -> Self {
        let mut backends: Vec<Backend> = backends.into_iter().collect();
        backends.sort();
        backends.dedup();
        self.backends = backends;
        self
    }

    /// Select stages.
    #[must_use]
    pub fn with_stages(mut self, stages: Stages) -> Self {
        self.stages = stages;
        self
    }

    /// Set runner options.
    #[must_use]
    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Whether the decode and metric tools must be available.
    #[must_use]
    pub fn needs_metric_tools(&self) -> bool {
        self.stages.info || self.stages.metrics
    }

    /// Check the input and output paths.
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(Error::InvalidInput(self.input_dir.clone()));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(Error::NotADirectory(self.output_dir.clone()));
        }
        Ok(())
    }

    /// Output subdirectory of one tool.
    #[must_use]
    pub fn tool_output_dir(&self, backend: Backend) -> PathBuf {
        self.output_dir.join(backend.name())
    }
}

/// Resolve every executable the run needs, then check its paths. Either
/// failure aborts before any stage starts.
pub fn prepare(config: &CompareConfig, search_path: Option<&OsStr>) -> Result<Toolchain> {
    let toolchain = Toolchain::resolve(&config.backends, config.needs_metric_tools(), search_path)?;
    config.validate()?;
    Ok(toolchain)
}

/// PNG files directly inside `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_png_extension(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

pub(crate) fn has_png_extension(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Run every selected stage, writing tables to `out`.
pub fn run<W: Write>(config: &CompareConfig, toolchain: &Toolchain, out: &mut W) -> Result<()> {
    if config.stages.info {
        info_stage(toolchain, &mut *out)?;
    }

    if !(config.stages.batch || config.stages.files || config.stages.metrics) {
        return Ok(());
    }

    let inputs = discover_inputs(&config.input_dir)?;
    info!(count = inputs.len(), dir = %config.input_dir.display(), "found input files");

    if config.stages.batch {
        batch_stage(config, toolchain, &inputs, &mut *out)?;
    }
    if config.stages.files {
        files_stage(config, toolchain, &inputs, &mut *out)?;
    }
    if config.stages.metrics {
        metrics_stage(config, toolchain, &inputs, &mut *out)?;
    }
    Ok(())
}

fn missing_metric_tool(name: &str) -> Error {
    Error::MissingExecutable {
        tool: name.to_string(),
        executable: name.to_string(),
    }
}

fn info_stage<W: Write>(toolchain: &Toolchain, out: W) -> Result<()> {
    info!("collecting system information");
    let tools = toolchain
        .metric_tools()
        .ok_or_else(|| missing_metric_tool(FLIP))?;
    let mut table = TableWriter::new(out, &INFO_HEADER)?;
    let mut row = |component: &str, version: String| {
        table.write_row(&InfoRow {
            component: component.to_string(),
            version,
        })
    };

    row("cpu", probe::cpu_name())?;
    row("gpu", probe::gpu_name())?;
    for (backend, program) in toolchain.encoders() {
        row(backend.name(), backend.version(program)?)?;
    }
    row(FLIP, probe::flip_version(&tools.flip)?)?;
    row(MAGICK, probe::magick_version(&tools.magick)?)?;
    Ok(())
}

fn batch_stage<W: Write>(
    config: &CompareConfig,
    toolchain: &Toolchain,
    inputs: &[PathBuf],
    out: W,
) -> Result<()> {
    let mut table = TableWriter::new(out, &BATCH_HEADER)?;
    for (backend, program) in toolchain.encoders() {
        info!(tool = backend.name(), "batch encode");
        let output_dir = config.tool_output_dir(*backend);
        std::fs::create_dir_all(&output_dir)?;

        let run = runner::run_batch(
            *backend,
            program,
            inputs,
            &config.input_dir,
            &output_dir,
            &config.options,
        )?;
        table.write_row(&BatchRow {
            tool: backend.name(),
            elapsed: run.elapsed,
        })?;
    }
    Ok(())
}

fn files_stage<W: Write>(
    config: &CompareConfig,
    toolchain: &Toolchain,
    inputs: &[PathBuf],
    out: W,
) -> Result<()> {
    let mut table = TableWriter::new(out, &FILES_HEADER)?;
    for (backend, program) in toolchain.encoders() {
        info!(tool = backend.name(), "per-file encode");
        let output_dir = config.tool_output_dir(*backend);
        std::fs::create_dir_all(&output_dir)?;

        for input in inputs {
            let run = runner::run_file(
                *backend,
                program,
                input,
                &output_dir,
                config.options.exit_policy,
            )?;
            table.write_row(&FileRow {
                file: input.display().to_string(),
                tool: backend.name(),
                elapsed: run.elapsed,
                size: run.size,
            })?;
        }
    }
    Ok(())
}

fn metrics_stage<W: Write>(
    config: &CompareConfig,
    toolchain: &Toolchain,
    inputs: &[PathBuf],
    out: W,
) -> Result<()> {
    let tools = toolchain
        .metric_tools()
        .ok_or_else(|| missing_metric_tool(crate::toolchain::NVDECOMPRESS))?;
    let mut table = TableWriter::new(out, &METRICS_HEADER)?;
    for (backend, _) in toolchain.encoders() {
        info!(tool = backend.name(), "computing metrics");
        let output_dir = config.tool_output_dir(*backend);
        for input in inputs {
            let encoded = runner::output_file_path(input, &output_dir, "dds");
            let scores = metrics::evaluate(tools, input, &encoded)?;
            table.write_row(&MetricRow::new(
                input.display().to_string(),
                backend.name(),
                scores,
            ))?;
        }
    }
    Ok(())
}
