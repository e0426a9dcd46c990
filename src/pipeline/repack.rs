//! Re-zips a staging subtree into a deliverable archive.

use log::{debug, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::zip::ZipWriter;
use anyhow::{Context, Result, bail};

/// One archive to produce from a staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepackJob {
    /// Version directory inside the staging root
    pub staging_root: PathBuf,
    /// Subtree of `staging_root` to pack, e.g. `data`
    pub subtree: String,
    /// Leading characters dropped from each entry's root-relative path
    pub trim: usize,
    pub output: PathBuf,
}

impl RepackJob {
    /// Pack `subtree` with its own name trimmed from entry paths
    pub fn for_subtree(staging_root: &Path, subtree: &str, output: PathBuf) -> Self {
        Self {
            staging_root: staging_root.to_path_buf(),
            subtree: subtree.to_string(),
            trim: subtree.len(),
            output,
        }
    }

    /// Write the archive, replacing any previous file. Returns the entry count.
    pub fn run(&self) -> Result<usize> {
        let source = self.staging_root.join(&self.subtree);

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating output directory {}", parent.display()))?;
            }
        }

        let file = File::create(&self.output)
            .with_context(|| format!("creating {}", self.output.display()))?;
        let mut writer = ZipWriter::new(BufWriter::new(file));

        if source.is_dir() {
            for entry in WalkDir::new(&source).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry_name(&self.staging_root, entry.path(), self.trim)?;
                let data = fs::read(entry.path())
                    .with_context(|| format!("reading {}", entry.path().display()))?;
                debug!("  adding: {}", name);
                writer.add_file(&name, &data)?;
            }
        }

        if writer.is_empty() {
            warn!("{} is empty: nothing staged under {}", self.output.display(), source.display());
        }

        let count = writer.len();
        writer.finish()?;
        Ok(count)
    }

    /// [`run`](Self::run) on the blocking pool
    pub async fn run_blocking(self) -> Result<usize> {
        tokio::task::spawn_blocking(move || self.run()).await?
    }
}

/// Archive entry name for `file`: its `/`-joined path below `staging_root`
/// with `trim` leading characters and a following `/` removed.
pub fn entry_name(staging_root: &Path, file: &Path, trim: usize) -> Result<String> {
    let relative = file.strip_prefix(staging_root).with_context(|| {
        format!("{} is outside {}", file.display(), staging_root.display())
    })?;

    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    let Some(trimmed) = joined.get(trim..) else {
        bail!("cannot trim {} characters from {}", trim, joined);
    };
    let name = trimmed.strip_prefix('/').unwrap_or(trimmed);
    if name.is_empty() {
        bail!("empty entry name for {}", file.display());
    }

    Ok(name.to_string())
}
