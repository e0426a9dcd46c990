//! Allow-lists for each generation of the repack pipeline.

use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;

/// Prefix rewrite applied to entries that moved inside the jar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub from: String,
    pub to: String,
}

impl Relocation {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Rewritten path, if `path` lies under `from`
    pub fn apply(&self, path: &str) -> Option<String> {
        path.strip_prefix(&self.from)
            .map(|suffix| format!("{}{}", self.to, suffix))
    }
}

/// Ordered set of kept path prefixes plus relocations.
///
/// Matching is a case-sensitive `starts_with`; there are no glob semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    pub prefixes: Vec<String>,
    pub relocations: Vec<Relocation>,
}

impl AllowList {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            relocations: Vec::new(),
        }
    }

    pub fn with_relocation(mut self, relocation: Relocation) -> Self {
        self.relocations.push(relocation);
        self
    }

    /// Where `path` should be staged, relative to the staging directory.
    ///
    /// Plain prefixes keep the path as is and are checked before relocations.
    pub fn target(&self, path: &str) -> Option<String> {
        if self.matching_prefix(path).is_some() {
            return Some(path.to_string());
        }
        self.relocations.iter().find_map(|r| r.apply(path))
    }

    /// First allow-listed prefix that `path` starts with
    pub fn matching_prefix(&self, path: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|p| path.starts_with(p.as_str()))
            .map(String::as_str)
    }
}

/// Which output archive a subtree of the staging directory feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackKind {
    Data,
    Assets,
}

impl PackKind {
    /// Top-level staging directory, also the segment trimmed from entry names
    pub fn subtree(self) -> &'static str {
        match self {
            PackKind::Data => "data",
            PackKind::Assets => "assets",
        }
    }

    /// Output archive file name for a version label
    pub fn archive_name(self, label: &str) -> String {
        format!("{}_{}.zip", self.subtree(), label)
    }
}

/// Generation of the pipeline, each with its own allow-lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Worldgen definitions only
    WorldgenOnly,
    /// Structures and worldgen, plus block states, models and textures
    DataAndAssets,
    /// Structures and worldgen with the 1.21 datapack relocation
    Current,
}

const WORLDGEN: &str = "data/minecraft/worldgen/";

const EARLY_STRUCTURES: &[&str] = &[
    "data/minecraft/structures/pillager_outpost/",
    "data/minecraft/structures/village/",
    "data/minecraft/structures/bastion/",
];

const LATER_STRUCTURES: &[&str] = &[
    "data/minecraft/structures/ancient_city/",
    "data/minecraft/structures/trail_ruins/",
    "data/minecraft/structures/trial_chambers/",
];

const BLOCK_ASSETS: &[&str] = &[
    "assets/minecraft/blockstates/",
    "assets/minecraft/models/block/",
    "assets/minecraft/textures/block/",
];

/// Experimental 1.21 worldgen shipped as a built-in datapack.
pub const UPDATE_1_21_WORLDGEN: &str = "data/minecraft/datapacks/update_1_21/data/minecraft/worldgen/";

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::WorldgenOnly => "worldgen-only",
            Variant::DataAndAssets => "data-and-assets",
            Variant::Current => "current",
        }
    }

    /// Output archives this variant produces, in write order
    pub fn packs(self) -> &'static [PackKind] {
        match self {
            Variant::DataAndAssets => &[PackKind::Data, PackKind::Assets],
            Variant::WorldgenOnly | Variant::Current => &[PackKind::Data],
        }
    }

    /// Allow-list applied to the client jar
    pub fn allow_list(self) -> AllowList {
        match self {
            Variant::WorldgenOnly => AllowList::new([WORLDGEN]),
            Variant::DataAndAssets => AllowList::new(
                EARLY_STRUCTURES
                    .iter()
                    .chain(&[WORLDGEN])
                    .chain(BLOCK_ASSETS)
                    .copied(),
            ),
            Variant::Current => AllowList::new(
                EARLY_STRUCTURES
                    .iter()
                    .chain(LATER_STRUCTURES)
                    .chain(&[WORLDGEN])
                    .copied(),
            )
            .with_relocation(Relocation::new(UPDATE_1_21_WORLDGEN, WORLDGEN)),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
