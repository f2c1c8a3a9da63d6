//! Release download command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use dds_eval::{FetchRequest, ReleaseTool};

pub fn run(tool: ReleaseTool, dest: PathBuf, token: Option<String>) -> Result<()> {
    let request = FetchRequest::new(tool, dest).with_token(token);
    let installed =
        dds_eval::fetch(&request).with_context(|| format!("Failed to fetch {tool}"))?;
    println!("Installed {} to {}", tool, installed.display());
    Ok(())
}
