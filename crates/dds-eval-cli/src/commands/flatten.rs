//! Flatten command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

pub fn run(input: PathBuf, output: PathBuf) -> Result<()> {
    let summary = dds_eval::flatten(&input, &output)
        .with_context(|| format!("Failed to flatten {}", input.display()))?;

    info!(skipped = summary.skipped, "non-PNG files skipped");
    println!(
        "Copied {} files to {} ({} renamed)",
        summary.copied.len(),
        output.display(),
        summary.renamed()
    );
    Ok(())
}
