//! Encoder comparison command.

use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Context, Result};
use dds_eval::{Backend, CompareConfig, ExitPolicy, RunOptions, Stages, compare};
use tracing::warn;

/// Parsed `compare` arguments.
pub struct Args {
    pub input: PathBuf,
    pub output: PathBuf,
    pub bc7enc: bool,
    pub nvtt: bool,
    pub png2dds: bool,
    pub texconv: bool,
    pub info: bool,
    pub batch: bool,
    pub files: bool,
    pub metrics: bool,
    pub max_processes: Option<NonZeroUsize>,
    pub check_exit_codes: bool,
}

impl Args {
    fn backends(&self) -> Vec<Backend> {
        [
            (self.bc7enc, Backend::Bc7enc),
            (self.nvtt, Backend::Nvtt),
            (self.png2dds, Backend::Png2dds),
            (self.texconv, Backend::Texconv),
        ]
        .into_iter()
        .filter_map(|(selected, backend)| selected.then_some(backend))
        .collect()
    }

    fn into_config(self) -> CompareConfig {
        let backends = self.backends();
        let stages = Stages {
            info: self.info,
            batch: self.batch,
            files: self.files,
            metrics: self.metrics,
        };
        let options = RunOptions {
            exit_policy: if self.check_exit_codes {
                ExitPolicy::Require
            } else {
                ExitPolicy::Ignore
            },
            max_processes: self.max_processes,
        };
        CompareConfig::new(self.input, self.output)
            .with_backends(backends)
            .with_stages(stages)
            .with_options(options)
    }
}

pub fn run(args: Args) -> Result<()> {
    let config = args.into_config();
    if config.backends.is_empty() {
        warn!("no encoder selected; tables will be empty");
    }
    if config.stages == Stages::default() {
        warn!("no stage selected (--info, --batch, --files, --metrics); nothing to do");
    }

    let search_path = std::env::var_os("PATH");
    let toolchain = compare::prepare(&config, search_path.as_deref())?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    compare::run(&config, &toolchain, &mut out)
        .with_context(|| format!("Comparison of {} failed", config.input_dir.display()))?;
    out.flush()?;
    Ok(())
}
