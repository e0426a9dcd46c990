//! # mcrepack
//!
//! Repackages the parts of Minecraft client jars that a structure viewer
//! needs (worldgen definitions, structure templates, block assets) into
//! small per-version zip files.
//!
//! The whole job is fetch, filter by path prefix, re-zip:
//!
//! - [`manifest`]: version manifest model and alias resolution
//! - [`io`]: the [`Fetch`] seam over HTTP and in-memory random access
//! - [`zip`]: central-directory parsing, extraction and a DEFLATE writer
//! - [`pipeline`]: allow-lists, the run table, staging and the driver
//!
//! ## Example
//!
//! ```no_run
//! use mcrepack::{HttpFetcher, Pipeline, RunTable, Settings, Variant};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let fetcher = HttpFetcher::new()?;
//!     let pipeline = Pipeline::new(&fetcher, Settings::default());
//!     let written = pipeline.run(&RunTable::builtin(Variant::Current)).await?;
//!     for path in written {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod manifest;
pub mod pipeline;
pub mod zip;

pub use cli::Cli;
pub use error::RepackError;
pub use io::{Fetch, HttpFetcher, MemoryReader, ReadAt};
pub use manifest::VersionManifest;
pub use pipeline::{Pipeline, RunSpec, RunTable, Settings, Variant};
pub use zip::{ZipExtractor, ZipFileEntry, ZipWriter};
