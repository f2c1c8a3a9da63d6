//! Host and tool identification for the info table.

use std::path::Path;

use tracing::debug;

use crate::backend::{between, rest_of_line};
use crate::error::{Error, Result};
use crate::process::CommandLine;
use crate::toolchain::{FLIP, MAGICK};

/// Reported when a component cannot be identified.
pub const UNKNOWN: &str = "Unknown";

/// CPU brand string of the first logical processor.
pub fn cpu_name() -> String {
    let mut system = sysinfo::System::new();
    system.refresh_cpu_all();
    system
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Name of the first NVIDIA GPU as listed by `nvidia-smi -L`.
///
/// Hosts without `nvidia-smi`, or where it lists no device, report
/// [`UNKNOWN`].
pub fn gpu_name() -> String {
    match CommandLine::new("nvidia-smi").arg("-L").capture_stdout() {
        Ok(output) => parse_gpu_name(&output).unwrap_or_else(|| UNKNOWN.to_string()),
        Err(e) => {
            debug!("nvidia-smi unavailable: {e}");
            UNKNOWN.to_string()
        }
    }
}

/// `GPU 0: NVIDIA GeForce RTX 3080 (UUID: ...)` → `NVIDIA GeForce RTX 3080`
pub fn parse_gpu_name(output: &str) -> Option<String> {
    between(output, ": ", " (").map(|name| name.trim().to_string())
}

/// Version of NVIDIA FLIP.
pub fn flip_version(program: &Path) -> Result<String> {
    parse_flip_version(&CommandLine::new(program).capture_stdout()?)
}

/// FLIP prints `... FLIP <version>.` followed by a newline.
pub fn parse_flip_version(banner: &str) -> Result<String> {
    between(banner, "FLIP ", ".\n")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::tool_output(FLIP, "no version in banner"))
}

/// Version of ImageMagick.
pub fn magick_version(program: &Path) -> Result<String> {
    parse_magick_version(&CommandLine::new(program).arg("-version").capture_stdout()?)
}

/// `Version: ImageMagick 7.1.1-29 Q16-HDRI ...` → `7.1.1-29`
pub fn parse_magick_version(banner: &str) -> Result<String> {
    rest_of_line(banner, "ImageMagick ")
        .and_then(|rest| rest.split_whitespace().next())
        .map(str::to_string)
        .ok_or_else(|| Error::tool_output(MAGICK, "no version in banner"))
}
