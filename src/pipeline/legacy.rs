//! Legacy worldgen export for versions whose client jar lacks it.
//!
//! Older client jars do not ship template pools or structure definitions,
//! so those come from a community export pinned to one commit per version.

use log::info;
use std::path::Path;

use super::stage::{StageReport, stage_archive};
use super::variant::AllowList;
use crate::error::RepackError;
use crate::io::Fetch;
use anyhow::Result;

/// Pinned export commit per supported version.
pub const LEGACY_WORLDGEN_REVISIONS: &[(&str, &str)] = &[
    ("1.16.5", "80fb4b8418ff3ff5724f4a0438bb422f58960bd9"),
    ("1.17.1", "7c54f55409f395a0aa517729669b20d570969f30"),
    ("1.18.2", "d766a7028865fc210bef3ddcffb54886cdaf4860"),
    ("1.19.2", "5d5e803876418f53c436ff62cc7e6dd602506cac"),
];

/// Where the export's entries are merged, relative to the version's staging tree.
pub const LEGACY_STAGING_SUBDIR: &str = "data/minecraft";

const LEGACY_PREFIXES: &[&str] = &[
    "worldgen/template_pool/",
    "worldgen/configured_structure_feature/",
    "worldgen/structure/",
];

/// Download URL of the pinned export for `version`
pub fn legacy_worldgen_url(version: &str) -> Result<String> {
    LEGACY_WORLDGEN_REVISIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, rev)| {
            format!("https://github.com/slicedlime/examples/raw/{rev}/vanilla_worldgen.zip")
        })
        .ok_or_else(|| {
            RepackError::UnsupportedVersion {
                version: version.to_string(),
            }
            .into()
        })
}

pub fn legacy_allow_list() -> AllowList {
    AllowList::new(LEGACY_PREFIXES.iter().copied())
}

/// Fetch the pinned export and merge it into `version_root/data/minecraft`.
///
/// Fails before any request when no export is pinned for `version`.
pub async fn stage_legacy_worldgen<F: Fetch + ?Sized>(
    fetcher: &F,
    version: &str,
    version_root: &Path,
) -> Result<StageReport> {
    let url = legacy_worldgen_url(version)?;
    info!("-> Extracting legacy worldgen archive for {}", version);

    let archive = fetcher.fetch(&url).await?;
    stage_archive(
        archive,
        &legacy_allow_list(),
        &version_root.join(LEGACY_STAGING_SUBDIR),
    )
    .await
}
