//! Fetch prebuilt build tools from GitHub releases.
//!
//! Two tools are supported: the ISPC compiler, unpacked from the latest
//! release and renamed to a fixed `ispc/` directory, and Ninja, which is
//! only fetched on Windows and unpacked into a fresh `ninja/` directory.

mod archive;
pub mod github;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::info;

pub use github::{GITHUB_API, Release, ReleaseAsset};

use crate::error::{Error, Result};

/// Host description used to pick a release asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Value in the style of [`std::env::consts::OS`].
    pub os: String,
    /// Value in the style of [`std::env::consts::ARCH`].
    pub arch: String,
}

impl Platform {
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was built for.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn unsupported(&self, hint: &str) -> Error {
        Error::UnsupportedPlatform {
            os: self.os.clone(),
            arch: self.arch.clone(),
            hint: hint.to_string(),
        }
    }
}

/// Container format of a release asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Zip => ".zip",
            ArchiveKind::TarGz => ".tar.gz",
        }
    }
}

/// Where the archive contents end up below the destination directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// The archive holds one top-level directory with this name, which is
    /// renamed to the tool's install name after extraction.
    RenameTopLevel(String),
    /// The archive holds loose files, extracted into a fresh directory
    /// named after the tool.
    FreshDirectory,
}

/// Which asset to download and how to lay it out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPlan {
    pub name: String,
    pub kind: ArchiveKind,
    pub layout: Layout,
}

/// Tools published as GitHub releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTool {
    Ispc,
    Ninja,
}

impl ReleaseTool {
    /// `OWNER/NAME` of the GitHub repository.
    #[must_use]
    pub fn repo(self) -> &'static str {
        match self {
            ReleaseTool::Ispc => "ispc/ispc",
            ReleaseTool::Ninja => "ninja-build/ninja",
        }
    }

    /// Directory name the tool is installed under.
    #[must_use]
    pub fn install_name(self) -> &'static str {
        match self {
            ReleaseTool::Ispc => "ispc",
            ReleaseTool::Ninja => "ninja",
        }
    }

    /// Fails early on hosts the tool has no asset for.
    pub fn check_platform(self, platform: &Platform) -> Result<()> {
        match (self, platform.os.as_str()) {
            (ReleaseTool::Ispc, "macos" | "linux" | "windows")
            | (ReleaseTool::Ninja, "windows") => Ok(()),
            (ReleaseTool::Ispc, _) => Err(platform.unsupported("no prebuilt ISPC for this system")),
            (ReleaseTool::Ninja, _) => Err(platform.unsupported(
                "install ninja with the system package manager (brew install ninja, apt install ninja-build, ...)",
            )),
        }
    }

    /// Asset to fetch for `platform` from the release tagged `tag`.
    pub fn asset_plan(self, platform: &Platform, tag: &str) -> Result<AssetPlan> {
        self.check_platform(platform)?;
        let (name, kind) = match (self, platform.os.as_str()) {
            (ReleaseTool::Ispc, "macos") => {
                (format!("ispc-{tag}-macOS.universal.tar.gz"), ArchiveKind::TarGz)
            }
            (ReleaseTool::Ispc, "linux") => {
                (format!("ispc-{tag}-linux-oneapi.tar.gz"), ArchiveKind::TarGz)
            }
            (ReleaseTool::Ispc, _) => (format!("ispc-{tag}-windows.zip"), ArchiveKind::Zip),
            (ReleaseTool::Ninja, _) => ("ninja-win.zip".to_string(), ArchiveKind::Zip),
        };
        let layout = match self {
            ReleaseTool::Ispc => Layout::RenameTopLevel(extracted_dir_name(&name, kind)),
            ReleaseTool::Ninja => Layout::FreshDirectory,
        };
        Ok(AssetPlan { name, kind, layout })
    }
}

/// `ispc-v1.2.3-linux-oneapi.tar.gz` unpacks to `ispc-v1.2.3-linux`.
fn extracted_dir_name(asset: &str, kind: ArchiveKind) -> String {
    asset
        .strip_suffix(kind.extension())
        .unwrap_or(asset)
        .replace("-oneapi", "")
}

impl fmt::Display for ReleaseTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.install_name())
    }
}

impl FromStr for ReleaseTool {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ispc" => Ok(ReleaseTool::Ispc),
            "ninja" => Ok(ReleaseTool::Ninja),
            other => Err(format!("unknown tool `{other}` (expected ispc or ninja)")),
        }
    }
}

/// Everything a fetch needs.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub tool: ReleaseTool,
    pub platform: Platform,
    /// Directory the tool directory is created in.
    pub dest: PathBuf,
    pub api_base: String,
    /// Optional GitHub token for authenticated API calls.
    pub token: Option<String>,
}

impl FetchRequest {
    /// Request for the current platform against the public API.
    #[must_use]
    pub fn new(tool: ReleaseTool, dest: impl Into<PathBuf>) -> Self {
        Self {
            tool,
            platform: Platform::current(),
            dest: dest.into(),
            api_base: GITHUB_API.to_string(),
            token: None,
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

/// Download and unpack the latest release of the requested tool.
///
/// Returns the directory the tool was installed into. A previous install
/// at that location is replaced.
pub fn fetch(request: &FetchRequest) -> Result<PathBuf> {
    let tool = request.tool;
    tool.check_platform(&request.platform)?;

    info!("Getting latest release of {}...", tool.repo());
    let release = github::latest_release(&request.api_base, tool.repo(), request.token.as_deref())?;
    info!(tag = %release.tag_name, "found release");

    let plan = tool.asset_plan(&request.platform, &release.tag_name)?;
    let asset = release.find_asset(&plan.name).ok_or_else(|| {
        Error::Release(format!(
            "Failed to find valid {} release for {} {} (expected asset {})",
            tool.repo(),
            request.platform.os,
            request.platform.arch,
            plan.name
        ))
    })?;

    fs::create_dir_all(&request.dest)?;
    let install_dir = request.dest.join(tool.install_name());
    info!("Downloading {}...", asset.name);
    match &plan.layout {
        Layout::RenameTopLevel(extracted) => {
            archive::download_and_extract(&asset.browser_download_url, plan.kind, &request.dest)?;
            let extracted = request.dest.join(extracted);
            if !extracted.is_dir() {
                return Err(Error::Archive(format!(
                    "{} did not contain {}",
                    asset.name,
                    extracted.display()
                )));
            }
            remove_existing(&install_dir)?;
            fs::rename(&extracted, &install_dir)?;
        }
        Layout::FreshDirectory => {
            remove_existing(&install_dir)?;
            fs::create_dir_all(&install_dir)?;
            archive::download_and_extract(&asset.browser_download_url, plan.kind, &install_dir)?;
        }
    }
    info!("Installed {} {} to {}", tool, release.tag_name, install_dir.display());
    Ok(install_dir)
}

fn remove_existing(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::archive::tests::{tar_gz_bytes, zip_bytes};
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn linux() -> Platform {
        Platform::new("linux", "x86_64")
    }

    fn windows() -> Platform {
        Platform::new("windows", "x86_64")
    }

    /// Serve each route once, then stop. Returns the base URL.
    fn serve(routes: impl FnOnce(&str) -> Vec<(String, Vec<u8>)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let routes = routes(&base);
        thread::spawn(move || {
            for stream in listener.incoming().take(routes.len()) {
                let mut stream = stream.unwrap();
                let mut buf = [0u8; 4096];
                let n = stream.read(&mut buf).unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(route, _)| *route == path)
                    .map_or(("404 Not Found", Vec::new()), |(_, body)| ("200 OK", body.clone()));
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(head.as_bytes()).unwrap();
                stream.write_all(&body).unwrap();
            }
        });
        base
    }

    fn release_json(base: &str, tag: &str, asset: &str) -> Vec<u8> {
        format!(
            r#"{{"tag_name":"{tag}","assets":[{{"name":"{asset}","browser_download_url":"{base}/download/{asset}"}}]}}"#
        )
        .into_bytes()
    }

    #[test]
    fn test_ispc_asset_names() {
        let mac = ReleaseTool::Ispc
            .asset_plan(&Platform::new("macos", "aarch64"), "v1.24.0")
            .unwrap();
        assert_eq!(mac.name, "ispc-v1.24.0-macOS.universal.tar.gz");
        assert_eq!(mac.kind, ArchiveKind::TarGz);
        assert_eq!(
            mac.layout,
            Layout::RenameTopLevel("ispc-v1.24.0-macOS.universal".into())
        );

        let linux = ReleaseTool::Ispc.asset_plan(&linux(), "v1.24.0").unwrap();
        assert_eq!(linux.name, "ispc-v1.24.0-linux-oneapi.tar.gz");
        assert_eq!(linux.layout, Layout::RenameTopLevel("ispc-v1.24.0-linux".into()));

        let win = ReleaseTool::Ispc.asset_plan(&windows(), "v1.24.0").unwrap();
        assert_eq!(win.name, "ispc-v1.24.0-windows.zip");
        assert_eq!(win.kind, ArchiveKind::Zip);
        assert_eq!(win.layout, Layout::RenameTopLevel("ispc-v1.24.0-windows".into()));
    }

    #[test]
    fn test_ninja_is_windows_only() {
        let plan = ReleaseTool::Ninja.asset_plan(&windows(), "v1.12.1").unwrap();
        assert_eq!(plan.name, "ninja-win.zip");
        assert_eq!(plan.layout, Layout::FreshDirectory);

        let err = ReleaseTool::Ninja.check_platform(&linux()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform { .. }));
        assert!(err.to_string().contains("package manager"));
    }

    #[test]
    fn test_unknown_os_is_unsupported() {
        let err = ReleaseTool::Ispc
            .asset_plan(&Platform::new("freebsd", "x86_64"), "v1.0.0")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform { .. }));
    }

    #[test]
    fn test_tool_from_str() {
        assert_eq!("ISPC".parse::<ReleaseTool>().unwrap(), ReleaseTool::Ispc);
        assert_eq!("ninja".parse::<ReleaseTool>().unwrap(), ReleaseTool::Ninja);
        assert!("cmake".parse::<ReleaseTool>().is_err());
    }

    #[test]
    fn test_fetch_ispc_replaces_previous_install() {
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(dest.path().join("ispc/stale")).unwrap();
        let asset = "ispc-v1.2.3-linux-oneapi.tar.gz";
        let base = serve(|base| {
            vec![
                (
                    "/repos/ispc/ispc/releases/latest".to_string(),
                    release_json(base, "v1.2.3", asset),
                ),
                (
                    format!("/download/{asset}"),
                    tar_gz_bytes(&[("ispc-v1.2.3-linux/bin/ispc", b"ELF")]),
                ),
            ]
        });

        let request = FetchRequest::new(ReleaseTool::Ispc, dest.path())
            .with_platform(linux())
            .with_api_base(base);
        let installed = fetch(&request).unwrap();

        assert_eq!(installed, dest.path().join("ispc"));
        assert_eq!(fs::read(installed.join("bin/ispc")).unwrap(), b"ELF");
        assert!(!installed.join("stale").exists());
        assert!(!dest.path().join("ispc-v1.2.3-linux").exists());
    }

    #[test]
    fn test_fetch_ninja_into_fresh_directory() {
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(dest.path().join("ninja")).unwrap();
        fs::write(dest.path().join("ninja/old.exe"), b"old").unwrap();
        let base = serve(|base| {
            vec![
                (
                    "/repos/ninja-build/ninja/releases/latest".to_string(),
                    release_json(base, "v1.12.1", "ninja-win.zip"),
                ),
                (
                    "/download/ninja-win.zip".to_string(),
                    zip_bytes(&[("ninja.exe", b"MZ")]),
                ),
            ]
        });

        let request = FetchRequest::new(ReleaseTool::Ninja, dest.path())
            .with_platform(windows())
            .with_api_base(base);
        let installed = fetch(&request).unwrap();

        assert_eq!(fs::read(installed.join("ninja.exe")).unwrap(), b"MZ");
        assert!(!installed.join("old.exe").exists());
    }

    #[test]
    fn test_fetch_without_matching_asset() {
        let dest = tempfile::tempdir().unwrap();
        let base = serve(|base| {
            vec![(
                "/repos/ispc/ispc/releases/latest".to_string(),
                release_json(base, "v1.2.3", "ispc-v1.2.3-windows.zip"),
            )]
        });

        let request = FetchRequest::new(ReleaseTool::Ispc, dest.path())
            .with_platform(linux())
            .with_api_base(base);
        let err = fetch(&request).unwrap_err();
        assert!(matches!(err, Error::Release(_)));
        assert!(!dest.path().join("ispc").exists());
    }

    #[test]
    fn test_fetch_http_error() {
        let dest = tempfile::tempdir().unwrap();
        let base = serve(|_| vec![("/unused".to_string(), Vec::new())]);
        let request = FetchRequest::new(ReleaseTool::Ispc, dest.path())
            .with_platform(linux())
            .with_api_base(base);
        assert!(matches!(fetch(&request), Err(Error::Http(_))));
    }
}
