//! The run table: which versions to repack and under which label.
//!
//! Adding a version is a data change. The built-in tables can be replaced by
//! a TOML file of `[[run]]` rows:
//!
//! ```toml
//! [[run]]
//! version = "1.16.5"
//! variant = "current"
//! legacy_worldgen = true
//! label = "1_16"
//! ```

use serde::Deserialize;
use std::path::Path;

use super::variant::Variant;
use anyhow::{Context, Result, bail};

/// One row of the run table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    /// Version identifier or alias, also the staging directory name
    pub version: String,
    pub variant: Variant,
    /// Merge the pinned legacy worldgen archive into the staging tree
    pub legacy_worldgen: bool,
    /// Human-facing label used in output archive names
    pub label: String,
}

impl RunSpec {
    pub fn new(version: &str, variant: Variant, label: &str) -> Self {
        Self {
            version: version.to_string(),
            variant,
            legacy_worldgen: false,
            label: label.to_string(),
        }
    }

    pub fn with_legacy_worldgen(mut self) -> Self {
        self.legacy_worldgen = true;
        self
    }
}

/// Label derived from a version identifier: `1.20.4` becomes `1_20_4`.
pub fn default_label(version: &str) -> String {
    version.replace('.', "_")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunRow {
    version: String,
    variant: Option<Variant>,
    #[serde(default)]
    legacy_worldgen: bool,
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    #[serde(default)]
    run: Vec<RunRow>,
}

/// Ordered list of runs executed by the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTable {
    pub runs: Vec<RunSpec>,
}

impl RunTable {
    /// Built-in table for a pipeline variant
    pub fn builtin(variant: Variant) -> Self {
        let runs = match variant {
            Variant::WorldgenOnly => vec![
                RunSpec::new("1.16.5", variant, "1_16").with_legacy_worldgen(),
                RunSpec::new("1.17.1", variant, "1_17").with_legacy_worldgen(),
            ],
            Variant::DataAndAssets => vec![
                RunSpec::new("1.16.5", variant, "1_16").with_legacy_worldgen(),
                RunSpec::new("1.17.1", variant, "1_17").with_legacy_worldgen(),
                RunSpec::new("1.18.2", variant, "1_18").with_legacy_worldgen(),
                RunSpec::new("1.19.2", variant, "1_19").with_legacy_worldgen(),
                RunSpec::new("snapshot", variant, "snapshot"),
            ],
            Variant::Current => vec![
                RunSpec::new("1.16.5", variant, "1_16").with_legacy_worldgen(),
                RunSpec::new("1.17.1", variant, "1_17").with_legacy_worldgen(),
                RunSpec::new("1.18.2", variant, "1_18").with_legacy_worldgen(),
                RunSpec::new("1.19.2", variant, "1_19").with_legacy_worldgen(),
                RunSpec::new("1.20.2", variant, "1_20"),
                RunSpec::new("1.20.4", variant, "1_20_4"),
                RunSpec::new("24w11a", variant, "24w11a"),
            ],
        };
        Self { runs }
    }

    /// Parse a TOML table; rows without a variant use `default_variant`
    pub fn from_toml(text: &str, default_variant: Variant) -> Result<Self> {
        let file: TableFile = toml::from_str(text)?;
        let mut runs = Vec::with_capacity(file.run.len());

        for row in file.run {
            if matches!(row.version.as_str(), "" | "." | "..") || row.version.contains(['/', '\\']) {
                bail!("invalid version {:?} in run table", row.version);
            }
            let label = row.label.unwrap_or_else(|| default_label(&row.version));
            if label.is_empty() || label.contains(['/', '\\']) {
                bail!("invalid output label {:?} for {}", label, row.version);
            }
            runs.push(RunSpec {
                variant: row.variant.unwrap_or(default_variant),
                legacy_worldgen: row.legacy_worldgen,
                version: row.version,
                label,
            });
        }

        Ok(Self { runs })
    }

    pub fn load(path: &Path, default_variant: Variant) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading run table {}", path.display()))?;
        Self::from_toml(&text, default_variant)
            .with_context(|| format!("parsing run table {}", path.display()))
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
