//! Version manifest model and version resolution.

use log::info;
use serde::Deserialize;

use crate::error::RepackError;
use crate::io::{Fetch, fetch_json};
use anyhow::Result;

/// Default location of the launcher version manifest.
pub const MANIFEST_URL: &str = "https://launchermeta.mojang.com/mc/game/version_manifest.json";

/// Version index published for the launcher.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionManifest {
    pub latest: LatestVersions,
    pub versions: Vec<VersionEntry>,
}

/// Literal tags behind the `release` and `snapshot` aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct LatestVersions {
    pub release: String,
    pub snapshot: String,
}

/// One manifest row: a version tag and the URL of its metadata document.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub id: String,
    pub url: String,
}

/// Per-version metadata; only the client download matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionDetails {
    pub downloads: Downloads,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Downloads {
    pub client: Download,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Download {
    pub url: String,
}

impl VersionManifest {
    /// Fetch and decode the manifest
    pub async fn fetch<F: Fetch + ?Sized>(fetcher: &F, url: &str) -> Result<Self> {
        info!("Fetching version manifest from {}", url);
        fetch_json(fetcher, url).await
    }

    /// Map an alias to its literal tag; literal tags pass through unchanged
    pub fn literal<'a>(&'a self, version: &'a str) -> &'a str {
        match version {
            "release" => &self.latest.release,
            "snapshot" => &self.latest.snapshot,
            _ => version,
        }
    }

    /// Find the manifest row for a version identifier or alias
    pub fn resolve(&self, version: &str) -> Result<&VersionEntry> {
        let tag = self.literal(version);
        self.versions
            .iter()
            .find(|v| v.id == tag)
            .ok_or_else(|| {
                RepackError::VersionNotFound {
                    version: version.to_string(),
                }
                .into()
            })
    }
}

/// Download the client jar for a resolved manifest row.
///
/// Two round trips: the metadata document, then the jar itself.
pub async fn fetch_client_archive<F: Fetch + ?Sized>(
    fetcher: &F,
    entry: &VersionEntry,
) -> Result<Vec<u8>> {
    let details: VersionDetails = fetch_json(fetcher, &entry.url).await?;
    info!("Downloading client archive for {}", entry.id);
    fetcher.fetch(&details.downloads.client.url).await
}
