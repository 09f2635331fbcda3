//! Error types for pack-core

use thiserror::Error;

use crate::assemble::PackFormat;

/// Errors that can occur while resolving, modeling, or assembling a pack
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cannot find version {version} of {id} for {mc_version}/{loader}")]
    VersionNotFound {
        id: String,
        version: String,
        mc_version: String,
        loader: String,
    },

    #[error("no version of {id} is compatible with {mc_version}/{loader}")]
    NoCompatibleVersion {
        id: String,
        mc_version: String,
        loader: String,
    },

    #[error("registry returned no files for {id}@{version}")]
    EmptyVersionFiles { id: String, version: String },

    #[error("malformed content reference '{0}': expected 'id' or 'id@version'")]
    MalformedReference(String),

    #[error("pack declares no minecraft version")]
    MissingGameVersion,

    #[error("unsupported mod loader '{0}'")]
    UnsupportedLoader(String),

    #[error("unknown modpack format '{0}'")]
    UnknownFormat(String),

    #[error("{0} output is not implemented")]
    NotImplemented(PackFormat),

    #[error("path '{0}' escapes the pack root")]
    PathEscape(String),

    #[error("external file '{0}' has no download URL")]
    MissingDownloadUrl(String),

    #[error("hash mismatch for {url}: expected {expected}, got {actual}")]
    HashMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
