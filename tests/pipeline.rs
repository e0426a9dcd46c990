//! End-to-end runs of the repack driver against an in-memory "network".

use anyhow::Result;
use async_trait::async_trait;
use rstest::{fixture, rstest};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use mcrepack::pipeline::{RunSpec, RunTable, Settings, Variant, legacy_worldgen_url};
use mcrepack::{Fetch, MemoryReader, Pipeline, RepackError, ZipExtractor, ZipWriter};

const MANIFEST: &str = "https://meta.test/version_manifest.json";

/// Serves canned bodies and records every requested URL.
#[derive(Default)]
struct StaticFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    fn serve(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// Publish a version: metadata document plus client jar.
    fn version(self, id: &str, jar: Vec<u8>) -> Self {
        let meta = format!("https://meta.test/{id}.json");
        let jar_url = format!("https://jars.test/{id}/client.jar");
        let details = format!(r#"{{"id": "{id}", "downloads": {{"client": {{"url": "{jar_url}"}}}}}}"#);
        self.serve(&meta, details.into_bytes()).serve(&jar_url, jar)
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.bodies.get(url).cloned().ok_or_else(|| {
            RepackError::Http {
                url: url.to_string(),
                status: 404,
            }
            .into()
        })
    }
}

fn manifest(release: &str, snapshot: &str, ids: &[&str]) -> Vec<u8> {
    let versions: Vec<_> = ids
        .iter()
        .map(|id| format!(r#"{{"id": "{id}", "type": "release", "url": "https://meta.test/{id}.json"}}"#))
        .collect();
    format!(
        r#"{{"latest": {{"release": "{release}", "snapshot": "{snapshot}"}}, "versions": [{}]}}"#,
        versions.join(",")
    )
    .into_bytes()
}

fn zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Vec::new());
    for (name, body) in files {
        writer.add_file(name, body.as_bytes()).unwrap();
    }
    writer.finish().unwrap()
}

async fn entries(path: &Path) -> Vec<(String, String)> {
    let bytes = fs::read(path).unwrap();
    let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(bytes)));
    let mut out = Vec::new();
    for entry in extractor.entries().await.unwrap() {
        let data = extractor.extract_to_memory(&entry).await.unwrap();
        out.push((entry.file_name, String::from_utf8(data).unwrap()));
    }
    out
}

fn staged(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().into_owned();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

struct Workspace {
    _dir: TempDir,
    settings: Settings,
}

impl Workspace {
    fn staging(&self) -> &Path {
        &self.settings.staging_root
    }

    fn output(&self, name: &str) -> PathBuf {
        self.settings.output_dir.join(name)
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        manifest_url: MANIFEST.to_string(),
        staging_root: dir.path().join("staging"),
        output_dir: dir.path().join("public/zips"),
        strict: false,
    };
    Workspace { _dir: dir, settings }
}

fn release_jar() -> Vec<u8> {
    zip(&[
        ("data/minecraft/worldgen/biome/desert.json", "{\"desert\":true}"),
        ("data/minecraft/worldgen/biome/desert.json/", ""),
        ("assets/minecraft/sounds.json", "{}"),
    ])
}

#[rstest]
#[tokio::test]
async fn release_alias_produces_single_entry_data_zip(workspace: Workspace) {
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["24w11a", "1.20.4"]))
        .version("1.20.4", release_jar());
    let table = RunTable {
        runs: vec![RunSpec::new("release", Variant::Current, "1_20_4")],
    };

    let written = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap();

    assert_eq!(written, [workspace.output("data_1_20_4.zip")]);
    assert_eq!(
        entries(&written[0]).await,
        [(
            "minecraft/worldgen/biome/desert.json".to_string(),
            "{\"desert\":true}".to_string()
        )]
    );
    assert!(workspace.staging().join("release/data/minecraft/worldgen/biome/desert.json").is_file());
}

#[rstest]
#[tokio::test]
async fn unknown_version_never_downloads_an_archive(workspace: Workspace) {
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["1.20.4"]))
        .version("1.20.4", release_jar());
    let table = RunTable {
        runs: vec![RunSpec::new("1.12.2", Variant::Current, "1_12")],
    };

    let err = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RepackError>(),
        Some(RepackError::VersionNotFound { version }) if version == "1.12.2"
    ));
    assert_eq!(fetcher.requests(), [MANIFEST]);
}

#[rstest]
#[tokio::test]
async fn unpinned_legacy_version_fails_before_any_request(workspace: Workspace) {
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["1.20.4"]))
        .version("1.20.4", release_jar());
    let table = RunTable {
        runs: vec![RunSpec::new("1.20.4", Variant::Current, "1_20_4").with_legacy_worldgen()],
    };

    let err = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RepackError>(),
        Some(RepackError::UnsupportedVersion { .. })
    ));
    assert!(fetcher.requests().is_empty());
}

#[rstest]
#[tokio::test]
async fn legacy_worldgen_merges_into_the_data_pack(workspace: Workspace) {
    let jar = zip(&[
        ("data/minecraft/worldgen/biome/plains.json", "plains"),
        ("data/minecraft/structures/village/plains/town_centers/fountain.nbt", "nbt"),
    ]);
    let export = zip(&[
        ("worldgen/template_pool/village/plains/town_centers.json", "pool"),
        ("worldgen/configured_structure_feature/village_plains.json", "csf"),
        ("worldgen/noise_settings/overworld.json", "ignored"),
    ]);
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.16.5", "1.16.5", &["1.16.5"]))
        .version("1.16.5", jar)
        .serve(&legacy_worldgen_url("1.16.5").unwrap(), export);
    let table = RunTable {
        runs: vec![RunSpec::new("1.16.5", Variant::Current, "1_16").with_legacy_worldgen()],
    };

    let written = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap();

    let names: Vec<_> = entries(&written[0]).await.into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        names,
        [
            "minecraft/structures/village/plains/town_centers/fountain.nbt",
            "minecraft/worldgen/biome/plains.json",
            "minecraft/worldgen/configured_structure_feature/village_plains.json",
            "minecraft/worldgen/template_pool/village/plains/town_centers.json",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn data_and_assets_variant_writes_both_archives(workspace: Workspace) {
    let jar = zip(&[
        ("data/minecraft/worldgen/biome/plains.json", "plains"),
        ("assets/minecraft/blockstates/stone.json", "stone"),
        ("assets/minecraft/textures/block/stone.png", "png"),
        ("assets/minecraft/textures/item/apple.png", "apple"),
    ]);
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["24w11a"]))
        .version("24w11a", jar);
    let table = RunTable {
        runs: vec![RunSpec::new("snapshot", Variant::DataAndAssets, "snapshot")],
    };

    let written = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        written,
        [
            workspace.output("data_snapshot.zip"),
            workspace.output("assets_snapshot.zip"),
        ]
    );
    let assets: Vec<_> = entries(&written[1]).await.into_iter().map(|(n, _)| n).collect();
    assert_eq!(
        assets,
        [
            "minecraft/blockstates/stone.json",
            "minecraft/textures/block/stone.png",
        ]
    );
}

#[rstest]
#[tokio::test]
async fn relocated_worldgen_is_packed_at_its_usual_path(workspace: Workspace) {
    let jar = zip(&[(
        "data/minecraft/datapacks/update_1_21/data/minecraft/worldgen/structure/trial_chambers.json",
        "trial",
    )]);
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("24w11a", "24w11a", &["24w11a"]))
        .version("24w11a", jar);
    let table = RunTable {
        runs: vec![RunSpec::new("24w11a", Variant::Current, "24w11a")],
    };

    let written = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        entries(&written[0]).await,
        [(
            "minecraft/worldgen/structure/trial_chambers.json".to_string(),
            "trial".to_string()
        )]
    );
}

#[rstest]
#[tokio::test]
async fn rerunning_resets_staging(workspace: Workspace) {
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["1.20.4"]))
        .version("1.20.4", release_jar());
    let table = RunTable {
        runs: vec![RunSpec::new("1.20.4", Variant::WorldgenOnly, "1_20_4")],
    };
    let pipeline = Pipeline::new(&fetcher, workspace.settings.clone());

    pipeline.run(&table).await.unwrap();
    let first = staged(workspace.staging());
    let first_zip = fs::read(workspace.output("data_1_20_4.zip")).unwrap();

    let stray = workspace.staging().join("1.20.4/data/minecraft/worldgen/stray.json");
    fs::write(&stray, "left over").unwrap();
    fs::create_dir_all(workspace.staging().join("1.19.2")).unwrap();

    pipeline.run(&table).await.unwrap();

    assert_eq!(staged(workspace.staging()), first);
    assert!(!stray.exists());
    assert!(!workspace.staging().join("1.19.2").exists());
    assert_eq!(fs::read(workspace.output("data_1_20_4.zip")).unwrap(), first_zip);
}

#[rstest]
#[tokio::test]
async fn strict_mode_rejects_empty_prefixes(mut workspace: Workspace) {
    workspace.settings.strict = true;
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["1.20.4"]))
        .version("1.20.4", release_jar());
    let table = RunTable {
        runs: vec![RunSpec::new("1.20.4", Variant::Current, "1_20_4")],
    };

    let err = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RepackError>(),
        Some(RepackError::EmptyPrefix { prefix, .. })
            if prefix == "data/minecraft/structures/pillager_outpost/"
    ));
    assert!(!workspace.output("data_1_20_4.zip").exists());
}

#[rstest]
#[tokio::test]
async fn strict_mode_counts_legacy_worldgen_toward_the_jar_prefixes(mut workspace: Workspace) {
    workspace.settings.strict = true;
    let jar = zip(&[("data/minecraft/loot_tables/chests/village.json", "{}")]);
    let export = zip(&[("worldgen/template_pool/bastion/starts.json", "pool")]);
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.17.1", "1.17.1", &["1.17.1"]))
        .version("1.17.1", jar)
        .serve(&legacy_worldgen_url("1.17.1").unwrap(), export);
    let table = RunTable {
        runs: vec![RunSpec::new("1.17.1", Variant::WorldgenOnly, "1_17").with_legacy_worldgen()],
    };

    let written = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap();

    assert_eq!(
        entries(&written[0]).await,
        [(
            "minecraft/worldgen/template_pool/bastion/starts.json".to_string(),
            "pool".to_string()
        )]
    );
}

#[rstest]
#[tokio::test]
async fn download_failure_aborts_remaining_versions(workspace: Workspace) {
    let fetcher = StaticFetcher::default()
        .serve(MANIFEST, manifest("1.20.4", "24w11a", &["1.20.2", "1.20.4", "24w11a"]))
        .version("1.20.2", release_jar())
        .version("24w11a", release_jar());
    let table = RunTable {
        runs: vec![
            RunSpec::new("1.20.2", Variant::WorldgenOnly, "1_20"),
            RunSpec::new("1.20.4", Variant::WorldgenOnly, "1_20_4"),
            RunSpec::new("24w11a", Variant::WorldgenOnly, "24w11a"),
        ],
    };

    let err = Pipeline::new(&fetcher, workspace.settings.clone())
        .run(&table)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<RepackError>(),
        Some(RepackError::Http { status: 404, .. })
    ));
    assert!(workspace.output("data_1_20.zip").exists());
    assert!(!workspace.output("data_1_20_4.zip").exists());
    assert!(!workspace.output("data_24w11a.zip").exists());
}
