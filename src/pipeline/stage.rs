//! Prefix-filtered extraction of an in-memory archive into a staging tree.

use log::debug;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::variant::AllowList;
use crate::error::RepackError;
use crate::io::MemoryReader;
use crate::zip::ZipExtractor;
use anyhow::{Context, Result};

/// What a staging pass wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Files written, relocated ones included
    pub staged: usize,
    /// Files that came through a relocation
    pub relocated: usize,
    /// Hits per allow-listed prefix, in allow-list order
    pub prefix_hits: Vec<(String, usize)>,
}

impl StageReport {
    /// Prefixes that matched no entry at all
    pub fn unmatched_prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefix_hits
            .iter()
            .filter(|(_, hits)| *hits == 0)
            .map(|(prefix, _)| prefix.as_str())
    }

    /// Fold in a pass that was staged under `subdir` of the same root.
    ///
    /// Each hit of `other` counts for every prefix here that covers
    /// `subdir/<other prefix>`.
    pub fn absorb(&mut self, other: &StageReport, subdir: &str) {
        self.staged += other.staged;
        self.relocated += other.relocated;

        for (prefix, hits) in &other.prefix_hits {
            let full = format!("{}/{}", subdir.trim_end_matches('/'), prefix);
            for (own, own_hits) in self.prefix_hits.iter_mut() {
                if full.starts_with(own.as_str()) {
                    *own_hits += hits;
                }
            }
        }
    }
}

/// Extract every non-directory entry kept by `allow` into `dest`.
///
/// Kept entries land at `dest/<path>`, relocated ones at `dest/<rewritten path>`.
pub async fn stage_archive(archive: Vec<u8>, allow: &AllowList, dest: &Path) -> Result<StageReport> {
    let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(archive)));
    let entries = extractor.entries().await?;

    let mut report = StageReport {
        prefix_hits: allow.prefixes.iter().map(|p| (p.clone(), 0)).collect(),
        ..StageReport::default()
    };

    for entry in entries.iter().filter(|e| !e.is_directory) {
        let Some(target) = allow.target(&entry.file_name) else {
            continue;
        };

        match allow.matching_prefix(&entry.file_name) {
            Some(prefix) => {
                if let Some(hit) = report.prefix_hits.iter_mut().find(|(p, _)| p == prefix) {
                    hit.1 += 1;
                }
            }
            None => report.relocated += 1,
        }

        let output_path = staged_path(dest, &target)?;
        debug!("  staging: {}", target);
        extractor
            .extract_to_file(entry, &output_path)
            .await
            .with_context(|| format!("staging {} to {}", entry.file_name, output_path.display()))?;
        report.staged += 1;
    }

    Ok(report)
}

/// Join an archive path onto `dest`, refusing anything that could escape it.
fn staged_path(dest: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let safe = !name.contains('\\')
        && relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

    if !safe {
        return Err(RepackError::UnsafeEntryPath {
            path: name.to_string(),
        }
        .into());
    }

    Ok(dest.join(relative))
}
