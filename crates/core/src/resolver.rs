//! Content resolver: turns `id@version` references into pinned downloads
//!
//! Queries the registry's version-listing endpoint, filtered server-side by
//! loader and game version, and picks either the exact requested version or
//! (when no version was requested) the newest compatible one.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::CoreError;
use crate::pack::FileHashes;
use crate::Result;

/// Default registry endpoint.
const MODRINTH_API: &str = "https://api.modrinth.com/v2";

/// A parsed content reference.
///
/// `"sodium@0.5.8"` pins a version; a bare `"sodium"` requests the latest
/// compatible one. A dangling `@` on either side is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub id: String,
    pub version: Option<String>,
}

impl FromStr for ContentRef {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('@') {
            None if !s.is_empty() => Ok(Self {
                id: s.to_string(),
                version: None,
            }),
            Some((id, version)) if !id.is_empty() && !version.is_empty() => Ok(Self {
                id: id.to_string(),
                version: Some(version.to_string()),
            }),
            _ => Err(CoreError::MalformedReference(s.to_string())),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.id, version),
            None => write!(f, "{}", self.id),
        }
    }
}

/// A pinned, hash-described download for one registry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    pub url: String,
    pub hashes: FileHashes,
    pub file_size: u64,
}

/// Outcome of resolving a content reference.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// An exact version was requested and found.
    Pinned {
        version: String,
        download: DownloadDescriptor,
    },
    /// No version was requested; the newest compatible one is reported
    /// without producing a download.
    LatestCompatible { version: String },
}

#[derive(Debug, Deserialize)]
struct RegistryVersion {
    version_number: String,
    loaders: Vec<String>,
    game_versions: Vec<String>,
    files: Vec<RegistryFile>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    url: String,
    size: u64,
    hashes: FileHashes,
}

/// Client for the content registry's version listing API.
#[derive(Debug, Clone)]
pub struct ModrinthClient {
    http: reqwest::Client,
    base_url: String,
}

impl ModrinthClient {
    pub fn new() -> Self {
        Self::with_base_url(MODRINTH_API)
    }

    /// Point the client at a different registry endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Resolve a content reference for the given game version and loader.
    ///
    /// With a pinned version this returns the matching download or fails with
    /// [`CoreError::VersionNotFound`]. Without one it only reports the newest
    /// compatible version; nothing is downloadable from that result.
    pub async fn resolve(
        &self,
        reference: &ContentRef,
        mc_version: &str,
        loader: &str,
    ) -> Result<Resolution> {
        let url = format!(
            "{}/project/{}/version?loaders={}&game_versions={}",
            self.base_url, reference.id, loader, mc_version
        );
        debug!("Querying registry: {}", url);

        let versions: Vec<RegistryVersion> = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let compatible = |v: &RegistryVersion| {
            v.loaders.iter().any(|l| l == loader)
                && v.game_versions.iter().any(|g| g == mc_version)
        };

        let Some(wanted) = reference.version.as_deref() else {
            // Registry ordering is newest-first, so the first compatible
            // entry is the latest one.
            let latest = versions.iter().find(|v| compatible(v)).ok_or_else(|| {
                CoreError::NoCompatibleVersion {
                    id: reference.id.clone(),
                    mc_version: mc_version.to_string(),
                    loader: loader.to_string(),
                }
            })?;
            return Ok(Resolution::LatestCompatible {
                version: latest.version_number.clone(),
            });
        };

        let version = versions
            .iter()
            .find(|v| v.version_number == wanted && compatible(v))
            .ok_or_else(|| CoreError::VersionNotFound {
                id: reference.id.clone(),
                version: wanted.to_string(),
                mc_version: mc_version.to_string(),
                loader: loader.to_string(),
            })?;

        // Only the first file of a version is used; multi-file versions are
        // not supported.
        let file = version
            .files
            .first()
            .ok_or_else(|| CoreError::EmptyVersionFiles {
                id: reference.id.clone(),
                version: wanted.to_string(),
            })?;

        Ok(Resolution::Pinned {
            version: wanted.to_string(),
            download: DownloadDescriptor {
                url: file.url.clone(),
                hashes: file.hashes.clone(),
                file_size: file.size,
            },
        })
    }
}

impl Default for ModrinthClient {
    fn default() -> Self {
        Self::new()
    }
}
