//! Quality metrics for encoded textures.
//!
//! Encoded `.dds` files are decoded back to PNG with `nvdecompress` and then
//! compared against the source image by external tools:
//!
//! - **FLIP (Mean)**: NVIDIA FLIP mean error (lower is better)
//! - **PSNR**: peak signal-to-noise ratio from ImageMagick (higher is better)
//! - **RMSE (%)**: normalized root mean squared error from ImageMagick
//! - **SSIM**: structural similarity from ImageMagick
//!
//! Every value is read from the tool's text output. Output that does not
//! match the expected layout is an error; nothing is guessed.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::backend::between;
use crate::error::{Error, Result};
use crate::process::CommandLine;
use crate::toolchain::{FLIP, MAGICK, MetricTools};

/// Statistical metric computed by `magick compare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMetric {
    Psnr,
    Rmse,
    Ssim,
}

impl CompareMetric {
    /// Name passed to `-metric`.
    #[must_use]
    pub fn as_arg(self) -> &'static str {
        match self {
            Self::Psnr => "PSNR",
            Self::Rmse => "RMSE",
            Self::Ssim => "SSIM",
        }
    }
}

impl fmt::Display for CompareMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// Scores for one decoded texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricScores {
    pub flip_mean: f64,
    pub psnr: f64,
    /// RMSE normalized to `0..=1`.
    pub rmse: f64,
    pub ssim: f64,
}

/// `File,Tool,FLIP (Mean),PSNR,RMSE (%),SSIM` row.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRow {
    pub file: String,
    pub tool: &'static str,
    pub flip_mean: f64,
    pub psnr: f64,
    pub rmse: f64,
    pub ssim: f64,
}

impl MetricRow {
    #[must_use]
    pub fn new(file: String, tool: &'static str, scores: MetricScores) -> Self {
        Self {
            file,
            tool,
            flip_mean: scores.flip_mean,
            psnr: scores.psnr,
            rmse: scores.rmse,
            ssim: scores.ssim,
        }
    }
}

/// Decode `encoded`, then score it against `reference`.
///
/// The decoded PNG is written next to the encoded file with the same stem.
pub fn evaluate(tools: &MetricTools, reference: &Path, encoded: &Path) -> Result<MetricScores> {
    let decoded = encoded.with_extension("png");
    decode_png(&tools.nvdecompress, encoded, &decoded)?;

    Ok(MetricScores {
        flip_mean: flip_mean(&tools.flip, reference, &decoded)?,
        psnr: compare(&tools.magick, CompareMetric::Psnr, reference, &decoded)?,
        rmse: compare(&tools.magick, CompareMetric::Rmse, reference, &decoded)?,
        ssim: compare(&tools.magick, CompareMetric::Ssim, reference, &decoded)?,
    })
}

/// Convert a DDS file to PNG.
pub fn decode_png(nvdecompress: &Path, dds: &Path, png: &Path) -> Result<()> {
    if !dds.is_file() {
        return Err(Error::MissingOutput(dds.to_path_buf()));
    }
    CommandLine::new(nvdecompress)
        .args(["-format", "png"])
        .arg(dds)
        .arg(png)
        .run_quiet()?;
    if !png.is_file() {
        return Err(Error::MissingOutput(png.to_path_buf()));
    }
    Ok(())
}

/// Run FLIP and return the mean error.
pub fn flip_mean(flip: &Path, reference: &Path, test: &Path) -> Result<f64> {
    let output = CommandLine::new(flip)
        .args(["-nexm", "-nerm", "-r"])
        .arg(reference)
        .arg("-t")
        .arg(test)
        .capture_stdout()?;
    parse_flip_mean(&output)
}

/// The mean is the last word of the fifth line of FLIP's report.
pub fn parse_flip_mean(output: &str) -> Result<f64> {
    let line = output
        .lines()
        .nth(4)
        .ok_or_else(|| Error::tool_output(FLIP, "report has fewer than five lines"))?;
    let (_, value) = line
        .trim_end()
        .rsplit_once(' ')
        .ok_or_else(|| Error::tool_output(FLIP, format!("no mean in line {line:?}")))?;
    parse_number(FLIP, value)
}

/// Run `magick compare` for one metric.
pub fn compare(magick: &Path, metric: CompareMetric, reference: &Path, test: &Path) -> Result<f64> {
    let output = CommandLine::new(magick)
        .args(["compare", "-metric", metric.as_arg()])
        .arg(reference)
        .arg(test)
        .arg("NULL:")
        .capture_stderr()?;
    parse_compare(metric, &output)
}

/// Read a `magick compare` result. RMSE is reported as `absolute (normalized)`
/// and the normalized value is used; the other metrics use the first token.
pub fn parse_compare(metric: CompareMetric, output: &str) -> Result<f64> {
    let value = match metric {
        CompareMetric::Rmse => between(output, " (", ")"),
        CompareMetric::Psnr | CompareMetric::Ssim => output.split_whitespace().next(),
    };
    let value = value.ok_or_else(|| {
        Error::tool_output(MAGICK, format!("no {metric} value in {:?}", output.trim()))
    })?;
    parse_number(MAGICK, value)
}

fn parse_number(tool: &str, value: &str) -> Result<f64> {
    let value = value.trim();
    value
        .parse::<f64>()
        .map_err(|_| Error::tool_output(tool, format!("{value:?} is not a number")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLIP_REPORT: &str = "Invoking LDR-FLIP\n     Pixels per degree: 67\n\nFLIP between reference image <ref.png> and test image <test.png>:\n     Mean: 0.041237\n     Weighted median: 0.031\n";

    #[test]
    fn test_parse_flip_mean() {
        assert_eq!(parse_flip_mean(FLIP_REPORT).unwrap(), 0.041237);
    }

    #[test]
    fn test_parse_flip_short_report() {
        let err = parse_flip_mean("Invoking LDR-FLIP\n").unwrap_err();
        assert!(matches!(err, Error::ToolOutput { .. }));
    }

    #[test]
    fn test_parse_compare_rmse_uses_normalized_value() {
        let rmse = parse_compare(CompareMetric::Rmse, "1234.56 (0.0188382)").unwrap();
        assert_eq!(rmse, 0.0188382);
    }

    #[test]
    fn test_parse_compare_psnr_and_ssim() {
        assert_eq!(parse_compare(CompareMetric::Psnr, "41.2047").unwrap(), 41.2047);
        assert_eq!(parse_compare(CompareMetric::Ssim, "0.987654\n").unwrap(), 0.987654);
        assert!(parse_compare(CompareMetric::Psnr, "inf").unwrap().is_infinite());
    }

    #[test]
    fn test_parse_compare_rejects_errors() {
        let err = parse_compare(
            CompareMetric::Rmse,
            "compare: unable to open image 'missing.png'",
        )
        .unwrap_err();
        assert!(err.to_string().contains("magick"));

        let err = parse_compare(CompareMetric::Ssim, "compare: image widths or heights differ")
            .unwrap_err();
        assert!(matches!(err, Error::ToolOutput { .. }));
    }

    #[test]
    fn test_decode_requires_encoded_file() {
        let dir = tempfile::tempdir().unwrap();
        let dds = dir.path().join("absent.dds");
        let err = decode_png(Path::new("nvdecompress"), &dds, &dir.path().join("absent.png"))
            .unwrap_err();
        assert!(matches!(err, Error::MissingOutput(p) if p == dds));
    }

    #[cfg(unix)]
    #[test]
    fn test_evaluate_with_fake_tools() {
        use crate::testutil::install_script;

        let bin = tempfile::tempdir().unwrap();
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let tools = MetricTools {
            nvdecompress: install_script(bin.path(), "nvdecompress", "cp \"$3\" \"$4\"\n"),
            flip: install_script(
                bin.path(),
                "flip",
                &format!("cat <<'EOF'\n{}EOF\n", FLIP_REPORT),
            ),
            magick: install_script(
                bin.path(),
                "magick",
                "case \"$3\" in\n  PSNR) printf '38.5' >&2 ;;\n  RMSE) printf '655.35 (0.01)' >&2 ;;\n  SSIM) printf '0.99' >&2 ;;\nesac\nexit 1\n",
            ),
        };
        let reference = input.path().join("a.png");
        std::fs::write(&reference, b"png").unwrap();
        let encoded = output.path().join("a.dds");
        std::fs::write(&encoded, b"dds").unwrap();

        let scores = evaluate(&tools, &reference, &encoded).unwrap();
        assert_eq!(
            scores,
            MetricScores {
                flip_mean: 0.041237,
                psnr: 38.5,
                rmse: 0.01,
                ssim: 0.99,
            }
        );
        assert!(output.path().join("a.png").is_file());
    }
}
