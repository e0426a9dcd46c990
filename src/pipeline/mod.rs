//! The repack driver.
//!
//! For every row of a [`RunTable`], strictly in order:
//!
//! 1. resolve the version through the manifest and download its client jar
//! 2. stage the allow-listed entries under `<staging>/<version>/`
//! 3. merge the pinned legacy worldgen export when the row asks for it
//! 4. zip each staged subtree into `<output>/<kind>_<label>.zip`
//!
//! The staging root is removed before anything else happens. The first
//! error aborts the run and leaves the staging tree as it was; the next run
//! starts by deleting it.

mod legacy;
mod repack;
mod stage;
mod table;
mod variant;

pub use legacy::{
    LEGACY_STAGING_SUBDIR, LEGACY_WORLDGEN_REVISIONS, legacy_worldgen_url, stage_legacy_worldgen,
};
pub use repack::{RepackJob, entry_name};
pub use stage::{StageReport, stage_archive};
pub use table::{RunSpec, RunTable, default_label};
pub use variant::{AllowList, PackKind, Relocation, UPDATE_1_21_WORLDGEN, Variant};

use log::{debug, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::RepackError;
use crate::io::Fetch;
use crate::manifest::{MANIFEST_URL, VersionManifest, fetch_client_archive};
use anyhow::{Context, Result};

/// Default staging root; wiped at the start of every run.
pub const DEFAULT_STAGING_ROOT: &str = "/tmp/minecraft";

/// Default directory for the produced archives.
pub const DEFAULT_OUTPUT_DIR: &str = "public/zips";

/// Locations and policies for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub manifest_url: String,
    pub staging_root: PathBuf,
    pub output_dir: PathBuf,
    /// Treat an allow-listed prefix that matched nothing as an error
    pub strict: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            manifest_url: MANIFEST_URL.to_string(),
            staging_root: PathBuf::from(DEFAULT_STAGING_ROOT),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            strict: false,
        }
    }
}

/// Sequential repack driver over a [`Fetch`] implementation.
pub struct Pipeline<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    settings: Settings,
}

impl<'a, F: Fetch + ?Sized> Pipeline<'a, F> {
    pub fn new(fetcher: &'a F, settings: Settings) -> Self {
        Self { fetcher, settings }
    }

    /// Execute every row of `table` and return the archives written, in order.
    pub async fn run(&self, table: &RunTable) -> Result<Vec<PathBuf>> {
        // Unpinned legacy rows are a table error; catch them before any download.
        for run in table.runs.iter().filter(|r| r.legacy_worldgen) {
            legacy_worldgen_url(&run.version)?;
        }

        remove_dir_if_present(&self.settings.staging_root).await?;

        let manifest = VersionManifest::fetch(self.fetcher, &self.settings.manifest_url).await?;

        let mut outputs = Vec::new();
        for run in &table.runs {
            let version_root = self.stage_version(&manifest, run).await?;
            outputs.extend(self.package_version(run, &version_root).await?);
        }

        info!("Wrote {} archive(s)", outputs.len());
        Ok(outputs)
    }

    /// Populate `<staging>/<version>` from the client jar (and legacy export).
    pub async fn stage_version(&self, manifest: &VersionManifest, run: &RunSpec) -> Result<PathBuf> {
        let entry = manifest.resolve(&run.version)?;
        info!(
            "Extracting Minecraft Jar Version {} ({} pipeline)",
            entry.id, run.variant
        );

        let version_root = self.settings.staging_root.join(&run.version);
        remove_dir_if_present(&version_root).await?;

        let jar = fetch_client_archive(self.fetcher, entry).await?;
        let mut report = stage_archive(jar, &run.variant.allow_list(), &version_root).await?;
        info!(
            "   staged {} file(s), {} relocated",
            report.staged, report.relocated
        );

        if run.legacy_worldgen {
            let legacy = stage_legacy_worldgen(self.fetcher, &run.version, &version_root).await?;
            info!("   merged {} legacy worldgen file(s)", legacy.staged);
            for prefix in legacy.unmatched_prefixes() {
                debug!("{}: legacy export has nothing under {}", run.version, prefix);
            }
            report.absorb(&legacy, LEGACY_STAGING_SUBDIR);
        }

        self.check_report(&report, run)?;
        Ok(version_root)
    }

    /// Zip every pack the row's variant produces.
    pub async fn package_version(&self, run: &RunSpec, version_root: &Path) -> Result<Vec<PathBuf>> {
        let mut outputs = Vec::new();

        for pack in run.variant.packs() {
            let output = self.settings.output_dir.join(pack.archive_name(&run.label));
            let count = RepackJob::for_subtree(version_root, pack.subtree(), output.clone())
                .run_blocking()
                .await?;
            info!("Created {} ({} entries)", output.display(), count);
            outputs.push(output);
        }

        Ok(outputs)
    }

    fn check_report(&self, report: &StageReport, run: &RunSpec) -> Result<()> {
        for prefix in report.unmatched_prefixes() {
            if self.settings.strict {
                return Err(RepackError::EmptyPrefix {
                    prefix: prefix.to_string(),
                    version: run.version.clone(),
                }
                .into());
            }
            warn!("{}: prefix {} matched no entries", run.version, prefix);
        }
        Ok(())
    }
}

async fn remove_dir_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
    }
}
