use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Public GitHub REST endpoint.
pub const GITHUB_API: &str = "https://api.github.com";

pub(super) const USER_AGENT: &str = concat!("dds-eval/", env!("CARGO_PKG_VERSION"));

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
}

/// The subset of the release payload the downloader uses.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Asset with exactly this file name.
    #[must_use]
    pub fn find_asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }
}

/// Shared HTTP agent with fixed timeouts.
pub(super) fn agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(|| {
        ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build()
    })
}

/// Metadata of the latest release of `repo` (`OWNER/NAME`).
pub fn latest_release(api_base: &str, repo: &str, token: Option<&str>) -> Result<Release> {
    let url = format!("{}/repos/{repo}/releases/latest", api_base.trim_end_matches('/'));
    let mut request = agent()
        .get(&url)
        .set("User-Agent", USER_AGENT)
        .set("Accept", "application/vnd.github+json");
    if let Some(token) = token {
        request = request.set("Authorization", &format!("Bearer {token}"));
    }
    let response = request
        .call()
        .map_err(|err| Error::Http(format!("{url}: {err}")))?;
    Ok(serde_json::from_reader(response.into_reader())?)
}
