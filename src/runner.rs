//! Timed encoder invocations.
//!
//! [`run_batch`] measures the wall time needed to encode a whole input set.
//! Batch-capable encoders get the input directory in a single call; the rest
//! get one process per file, all started before any is awaited, so the
//! figure reflects parallel throughput rather than serial cost.
//!
//! [`run_file`] encodes one file at a time and reports the time and the size
//! of the produced `.dds`.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::process::{self, ExitPolicy, Outcome};

/// Knobs shared by the runners.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// What to do with unsuccessful exits.
    pub exit_policy: ExitPolicy,
    /// Upper bound on concurrently running encoder processes in batch mode.
    /// `None` starts every process at once.
    pub max_processes: Option<NonZeroUsize>,
}

/// Result of encoding a whole input set.
#[derive(Debug, Clone)]
pub struct BatchRun {
    /// Time from the first spawn to the last exit.
    pub elapsed: Duration,
    /// One outcome per spawned process, in spawn order.
    pub outcomes: Vec<Outcome>,
}

/// Result of encoding one file.
#[derive(Debug, Clone, Copy)]
pub struct FileRun {
    pub elapsed: Duration,
    /// Size in bytes of the produced `.dds`.
    pub size: u64,
    pub outcome: Outcome,
}

/// `<output_dir>/<input stem>.<extension>`
#[must_use]
pub fn output_file_path(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(extension);
    output_dir.join(name)
}

/// Encode every file in `inputs` (which all live in `input_dir`) into
/// `output_dir`, timing the operation as a whole.
pub fn run_batch(
    backend: Backend,
    program: &Path,
    inputs: &[PathBuf],
    input_dir: &Path,
    output_dir: &Path,
    options: &RunOptions,
) -> Result<BatchRun> {
    let start = Instant::now();
    let outcomes = if backend.spec().batch_capable {
        vec![backend.encode_command(program, input_dir, output_dir).run_quiet()?]
    } else {
        fan_out(backend, program, inputs, output_dir, options.max_processes)?
    };
    let elapsed = start.elapsed();
    debug!(tool = backend.name(), processes = outcomes.len(), ?elapsed, "batch finished");

    if backend.spec().batch_capable {
        options.exit_policy.check(outcomes[0], backend.name(), input_dir)?;
    } else {
        for (outcome, input) in outcomes.iter().zip(inputs) {
            options.exit_policy.check(*outcome, backend.name(), input)?;
        }
    }

    Ok(BatchRun { elapsed, outcomes })
}

fn fan_out(
    backend: Backend,
    program: &Path,
    inputs: &[PathBuf],
    output_dir: &Path,
    limit: Option<NonZeroUsize>,
) -> Result<Vec<Outcome>> {
    let mut running: VecDeque<Child> = VecDeque::with_capacity(inputs.len());
    let mut outcomes = Vec::with_capacity(inputs.len());

    let result = spawn_and_wait(
        backend,
        program,
        inputs,
        output_dir,
        limit,
        &mut running,
        &mut outcomes,
    );
    if let Err(err) = result {
        // Children already started still run to completion before the error
        // is reported.
        reap(running);
        return Err(err);
    }
    Ok(outcomes)
}

fn spawn_and_wait(
    backend: Backend,
    program: &Path,
    inputs: &[PathBuf],
    output_dir: &Path,
    limit: Option<NonZeroUsize>,
    running: &mut VecDeque<Child>,
    outcomes: &mut Vec<Outcome>,
) -> Result<()> {
    for input in inputs {
        if let Some(limit) = limit {
            while running.len() >= limit.get() {
                if let Some(mut child) = running.pop_front() {
                    outcomes.push(process::wait(&mut child)?);
                }
            }
        }
        let target = output_file_path(input, output_dir, "dds");
        running.push_back(backend.encode_command(program, input, &target).spawn_quiet()?);
    }

    while let Some(mut child) = running.pop_front() {
        outcomes.push(process::wait(&mut child)?);
    }
    Ok(())
}

fn reap(running: VecDeque<Child>) {
    for mut child in running {
        if let Err(e) = child.wait() {
            warn!(pid = child.id(), "failed to wait for encoder: {e}");
        }
    }
}

/// Encode a single file and measure it.
pub fn run_file(
    backend: Backend,
    program: &Path,
    input: &Path,
    output_dir: &Path,
    policy: ExitPolicy,
) -> Result<FileRun> {
    let target = output_file_path(input, output_dir, "dds");
    let output = if backend.spec().explicit_output_file {
        target.as_path()
    } else {
        output_dir
    };
    let command = backend.encode_command(program, input, output);

    let start = Instant::now();
    let outcome = command.run_quiet()?;
    let elapsed = start.elapsed();

    policy.check(outcome, backend.name(), input)?;

    let size = match std::fs::metadata(&target) {
        Ok(metadata) => metadata.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::MissingOutput(target));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(FileRun {
        elapsed,
        size,
        outcome,
    })
}
