//! Error taxonomy for the repack pipeline.
//!
//! Every layer returns [`anyhow::Result`]; the variants below are raised for
//! the failures a caller may want to tell apart and can be recovered with
//! `err.downcast_ref::<RepackError>()`.

use thiserror::Error;

/// Failures that abort a repack run.
#[derive(Debug, Error)]
pub enum RepackError {
    /// The version (or alias) is not listed in the version manifest.
    #[error("version {version} not found in the version manifest")]
    VersionNotFound {
        /// The requested version identifier.
        version: String,
    },

    /// No legacy worldgen archive is pinned for this version.
    #[error("no legacy worldgen archive is pinned for version {version}")]
    UnsupportedVersion {
        /// The requested version identifier.
        version: String,
    },

    /// The server answered with a non-success status.
    #[error("GET {url} failed with status {status}")]
    Http {
        /// The requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// An allow-listed prefix matched nothing while running in strict mode.
    #[error("prefix {prefix} matched no entries for version {version}")]
    EmptyPrefix {
        /// The allow-listed prefix.
        prefix: String,
        /// The version being staged.
        version: String,
    },

    /// An archive entry name would land outside the staging directory.
    #[error("refusing to stage entry with unsafe path: {path}")]
    UnsafeEntryPath {
        /// The entry name as stored in the archive.
        path: String,
    },

    /// The output archive exceeds what the writer supports (no ZIP64).
    #[error("archive too large: {reason}")]
    ArchiveTooLarge {
        /// What limit was hit.
        reason: String,
    },
}
