//! Collect PNG files from a directory tree into a single folder.
//!
//! Files are gathered deepest directory first, sorted by name within each
//! directory, and copied under their own name. When a name is already taken
//! in the output folder a numeric suffix is appended (`tile.png`,
//! `tile_1.png`, `tile_2.png`, ...). Nothing in the output is overwritten.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compare::has_png_extension;
use crate::error::{Error, Result};

/// What a flatten run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenSummary {
    /// `(source, destination)` for every copied file, in copy order.
    pub copied: Vec<(PathBuf, PathBuf)>,
    /// Files that were passed over because they are not PNGs.
    pub skipped: usize,
}

impl FlattenSummary {
    /// Number of files copied because their final name had to be changed.
    #[must_use]
    pub fn renamed(&self) -> usize {
        self.copied
            .iter()
            .filter(|(src, dst)| src.file_name() != dst.file_name())
            .count()
    }
}

/// Copy every PNG below `input` into `output`.
pub fn flatten(input: &Path, output: &Path) -> Result<FlattenSummary> {
    if !input.is_dir() {
        return Err(Error::InvalidInput(input.to_path_buf()));
    }
    if output.exists() && !output.is_dir() {
        return Err(Error::NotADirectory(output.to_path_buf()));
    }
    fs::create_dir_all(output)?;

    // The full list is taken before copying so an output directory nested
    // inside the input is never walked.
    let mut files = Vec::new();
    collect_files(input, &mut files)?;

    let mut summary = FlattenSummary::default();
    for source in files {
        if !has_png_extension(&source) {
            summary.skipped += 1;
            continue;
        }
        let target = free_target(output, &source)?;
        debug!(source = %source.display(), target = %target.display(), "copying");
        fs::copy(&source, &target)?;
        summary.copied.push((source, target));
    }
    Ok(summary)
}

/// Post-order walk: subdirectories first, then the files of `dir`.
///
/// Symlinks to directories are not descended into. Symlinks to files are
/// collected like regular files.
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.path(), entry.file_type()?));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut plain = Vec::new();
    for (path, file_type) in entries {
        if file_type.is_dir() {
            collect_files(&path, files)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            plain.push(path);
        } else {
            debug!(path = %path.display(), "not following");
        }
    }
    files.extend(plain);
    Ok(())
}

/// First unused name for `source` inside `output`.
fn free_target(output: &Path, source: &Path) -> Result<PathBuf> {
    let name = source
        .file_name()
        .ok_or_else(|| Error::InvalidInput(source.to_path_buf()))?;
    let mut target = output.join(name);
    if !target.exists() {
        return Ok(target);
    }

    let stem = source.file_stem().unwrap_or(name).to_string_lossy();
    let extension = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut index = 0u32;
    while target.exists() {
        index += 1;
        target = output.join(format!("{stem}_{index}{extension}"));
    }
    Ok(target)
}
