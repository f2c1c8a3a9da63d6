//! Encoder backend registry.
//!
//! Each DDS encoder under comparison is a [`Backend`] variant. The static
//! [`BackendSpec`] table records how the executable is driven: whether it can
//! take a whole directory in one call, whether it wants an explicit output
//! file or an output directory, and the fixed parameters placed before the
//! input and output paths.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::process::CommandLine;

/// Static description of an encoder executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSpec {
    /// Identifier used for CLI flags, report rows and output subdirectories.
    pub name: &'static str,
    /// Executable name looked up on the search path.
    pub executable: &'static str,
    /// One invocation handles a whole input directory.
    pub batch_capable: bool,
    /// The output argument is a file path rather than a directory.
    pub explicit_output_file: bool,
    /// Parameters passed verbatim before the input and output arguments.
    pub fixed_arguments: &'static [&'static str],
}

const BC7ENC: BackendSpec = BackendSpec {
    name: "bc7enc",
    executable: "bc7enc",
    batch_capable: false,
    explicit_output_file: true,
    fixed_arguments: &["-q", "-g", "-u6"],
};

const NVTT: BackendSpec = BackendSpec {
    name: "nvtt",
    executable: "nvbatchcompress",
    batch_capable: true,
    explicit_output_file: true,
    fixed_arguments: &["-fast", "-bc7", "-silent"],
};

const PNG2DDS: BackendSpec = BackendSpec {
    name: "png2dds",
    executable: "png2dds",
    batch_capable: true,
    explicit_output_file: false,
    fixed_arguments: &["-o"],
};

const TEXCONV: BackendSpec = BackendSpec {
    name: "texconv",
    executable: "texconv",
    batch_capable: true,
    explicit_output_file: false,
    fixed_arguments: &["-y", "-f", "BC7_UNORM", "-bc", "x"],
};

/// A DDS encoder known to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// bc7enc from bc7enc_rdo.
    Bc7enc,
    /// nvbatchcompress from NVIDIA Texture Tools.
    Nvtt,
    /// png2dds.
    Png2dds,
    /// texconv from DirectXTex.
    Texconv,
}

impl Backend {
    /// Every registered backend, in report order.
    pub const ALL: [Self; 4] = [Self::Bc7enc, Self::Nvtt, Self::Png2dds, Self::Texconv];

    /// Registry entry for this backend.
    #[must_use]
    pub fn spec(self) -> &'static BackendSpec {
        match self {
            Self::Bc7enc => &BC7ENC,
            Self::Nvtt => &NVTT,
            Self::Png2dds => &PNG2DDS,
            Self::Texconv => &TEXCONV,
        }
    }

    /// Backend identifier.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Executable name.
    #[must_use]
    pub fn executable(self) -> &'static str {
        self.spec().executable
    }

    /// Build the encode command for one input (file or directory).
    ///
    /// `output` is either the target `.dds` path or an output directory,
    /// depending on [`BackendSpec::explicit_output_file`] and the caller.
    #[must_use]
    pub fn encode_command(self, program: &Path, input: &Path, output: &Path) -> CommandLine {
        let cmd = CommandLine::new(program).args(self.spec().fixed_arguments);
        match self {
            Self::Texconv => {
                let cmd = if input.is_dir() {
                    cmd.arg("-r").arg(input.join("*.png"))
                } else {
                    cmd.arg(input)
                };
                cmd.arg("-o").arg(output)
            }
            Self::Bc7enc | Self::Nvtt | Self::Png2dds => cmd.arg(input).arg(output),
        }
    }

    /// Command that makes the tool print its banner.
    #[must_use]
    pub fn version_command(self, program: &Path) -> CommandLine {
        let cmd = CommandLine::new(program);
        match self {
            Self::Png2dds => cmd.arg("--help"),
            Self::Bc7enc | Self::Nvtt | Self::Texconv => cmd,
        }
    }

    /// Extract the version from a banner printed by this backend.
    pub fn parse_version(self, banner: &str) -> Result<String> {
        let name = self.name();
        let version = match self {
            Self::Bc7enc => between(banner, "bc7enc ", " - "),
            Self::Nvtt => banner
                .split_once(" - ")
                .and_then(|(head, _)| head.split_once("Tools "))
                .map(|(_, version)| version),
            Self::Png2dds => rest_of_line(banner, "png2dds "),
            Self::Texconv => rest_of_line(banner, "Version "),
        };
        version
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::tool_output(name, "no version in banner"))
    }

    /// Run the executable and parse its version.
    pub fn version(self, program: &Path) -> Result<String> {
        let banner = self.version_command(program).capture_stdout()?;
        self.parse_version(&banner)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.name() == s)
            .ok_or_else(|| format!("unknown encoder: {s}"))
    }
}

/// Text between the first `start` marker and the following `end` marker.
pub(crate) fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let (_, rest) = text.split_once(start)?;
    let (value, _) = rest.split_once(end)?;
    Some(value)
}

/// Text after `start` up to the end of that line.
pub(crate) fn rest_of_line<'a>(text: &'a str, start: &str) -> Option<&'a str> {
    let (_, rest) = text.split_once(start)?;
    Some(rest.split_once('\n').map_or(rest, |(line, _)| line))
}
