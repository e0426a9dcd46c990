use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use crate::manifest::MANIFEST_URL;
use crate::pipeline::{DEFAULT_OUTPUT_DIR, DEFAULT_STAGING_ROOT, RunTable, Settings, Variant};
use anyhow::Result;

#[derive(Parser, Debug)]
#[command(name = "mcrepack")]
#[command(version)]
#[command(about = "Repackage filtered Minecraft client data into per-version zips", long_about = None)]
#[command(after_help = "Examples:\n  \
  mcrepack                              rebuild public/zips with the current pipeline\n  \
  mcrepack --variant data-and-assets    also produce assets_<label>.zip files\n  \
  mcrepack --table runs.toml --strict   custom run table, fail on empty prefixes")]
pub struct Cli {
    /// Built-in run table to use
    #[arg(long, value_enum, default_value_t = Variant::Current)]
    pub variant: Variant,

    /// TOML run table replacing the built-in one
    #[arg(long, value_name = "FILE")]
    pub table: Option<PathBuf>,

    /// Staging directory, deleted at the start of every run
    #[arg(long, value_name = "DIR", default_value = DEFAULT_STAGING_ROOT)]
    pub staging_dir: PathBuf,

    /// Directory receiving the output archives
    #[arg(short = 'd', long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Version manifest URL
    #[arg(long, value_name = "URL", default_value = MANIFEST_URL)]
    pub manifest_url: String,

    /// Fail when an allow-listed prefix matches no entries, counting files
    /// merged from a legacy worldgen export
    #[arg(long)]
    pub strict: bool,

    /// Log every staged and packed file
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            manifest_url: self.manifest_url.clone(),
            staging_root: self.staging_dir.clone(),
            output_dir: self.output_dir.clone(),
            strict: self.strict,
        }
    }

    pub fn run_table(&self) -> Result<RunTable> {
        match &self.table {
            Some(path) => RunTable::load(path, self.variant),
            None => Ok(RunTable::builtin(self.variant)),
        }
    }

    /// Default log filter; `RUST_LOG` still takes precedence
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Warn
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_reproduce_the_builtin_run() {
        let cli = Cli::try_parse_from(["mcrepack"]).unwrap();
        assert_eq!(cli.settings(), Settings::default());
        assert_eq!(cli.run_table().unwrap(), RunTable::builtin(Variant::Current));
        assert_eq!(cli.log_level(), LevelFilter::Info);
    }

    #[test]
    fn flags_override_settings() {
        let cli = Cli::try_parse_from([
            "mcrepack",
            "--variant",
            "worldgen-only",
            "--staging-dir",
            "/var/tmp/stage",
            "-d",
            "out",
            "--strict",
            "-q",
        ])
        .unwrap();

        let settings = cli.settings();
        assert_eq!(settings.staging_root, PathBuf::from("/var/tmp/stage"));
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert!(settings.strict);
        assert_eq!(cli.variant, Variant::WorldgenOnly);
        assert_eq!(cli.log_level(), LevelFilter::Warn);
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["mcrepack", "-q", "-v"]).is_err());
    }
}
