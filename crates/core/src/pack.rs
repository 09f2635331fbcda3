//! The build model: the canonical in-memory representation of a modpack
//!
//! One [`Modpack`] is created per build, mutated by every host function the
//! script interpreter exposes (across the whole include tree), and handed
//! read-only to exactly one format assembler.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;
use crate::Result;

/// Dependency id of the base game runtime.
pub const MINECRAFT_ID: &str = "minecraft";

/// Whether a pack entry applies to a given side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Unsupported,
    Optional,
}

/// Side applicability of an external file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    pub client: Requirement,
    pub server: Requirement,
}

impl Env {
    /// Required on both sides (mods).
    pub fn both_required() -> Self {
        Self {
            client: Requirement::Required,
            server: Requirement::Required,
        }
    }

    /// Required on the client, unsupported on the server (shader packs).
    pub fn client_only() -> Self {
        Self {
            client: Requirement::Required,
            server: Requirement::Unsupported,
        }
    }
}

/// Content hashes the registry reports for a downloadable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHashes {
    pub sha1: String,
    pub sha256: String,
}

/// A runtime or loader the pack depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub version: String,
}

/// Content fetched from the network at assembly time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalFile {
    /// Relative path below the pack's data directory.
    pub path: String,
    pub hashes: FileHashes,
    pub downloads: Vec<String>,
    pub file_size: u64,
    pub env: Env,
}

/// Content supplied inline by the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFile {
    /// Relative path below the pack's data directory.
    pub path: String,
    pub content: String,
}

/// The modpack under construction.
///
/// Scalar metadata fields default to empty and follow last-write-wins.
/// `dependencies` must contain a `minecraft` entry before any mod or shader
/// is resolved; at most one further entry names the mod loader.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modpack {
    pub name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub url: String,
    pub icon: String,
    pub dependencies: Vec<Dependency>,
    pub external_files: Vec<ExternalFile>,
    pub files: Vec<InlineFile>,
    /// Reserved for per-side placement; no script directive populates these yet.
    pub server_files: Vec<InlineFile>,
    pub client_files: Vec<InlineFile>,
}

impl Modpack {
    pub fn new() -> Self {
        Self::default()
    }

    /// The minecraft version the pack targets, if declared.
    pub fn mc_version(&self) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|dep| dep.id == MINECRAFT_ID)
            .map(|dep| dep.version.as_str())
    }

    /// The mod loader dependency, if declared.
    pub fn loader(&self) -> Option<&Dependency> {
        self.dependencies.iter().find(|dep| dep.id != MINECRAFT_ID)
    }
}

/// True if `path` is relative and cannot climb out of the pack root.
pub fn is_clean_relative_path(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Join a model-relative path onto `root`, rejecting traversal outside it.
pub fn safe_join(root: &Path, rel: &str) -> Result<PathBuf> {
    if !is_clean_relative_path(rel) {
        return Err(CoreError::PathEscape(rel.to_string()));
    }
    Ok(root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mc_version_finds_minecraft_entry() {
        let mut pack = Modpack::new();
        assert_eq!(pack.mc_version(), None);

        pack.dependencies.push(Dependency {
            id: "fabric".to_string(),
            version: "0.15.11".to_string(),
        });
        pack.dependencies.push(Dependency {
            id: MINECRAFT_ID.to_string(),
            version: "1.20.1".to_string(),
        });

        assert_eq!(pack.mc_version(), Some("1.20.1"));
        assert_eq!(pack.loader().map(|d| d.id.as_str()), Some("fabric"));
    }

    #[test]
    fn loader_is_first_non_minecraft_dependency() {
        let mut pack = Modpack::new();
        pack.dependencies.push(Dependency {
            id: MINECRAFT_ID.to_string(),
            version: "1.20.1".to_string(),
        });
        assert!(pack.loader().is_none());

        pack.dependencies.push(Dependency {
            id: "forge".to_string(),
            version: "47.2.0".to_string(),
        });
        assert_eq!(pack.loader().map(|d| d.id.as_str()), Some("forge"));
    }

    #[test]
    fn clean_relative_paths() {
        assert!(is_clean_relative_path("mods/sodium-0.5.8.jar"));
        assert!(is_clean_relative_path("config/x.json"));
        assert!(is_clean_relative_path("./options.txt"));

        assert!(!is_clean_relative_path(""));
        assert!(!is_clean_relative_path("/etc/passwd"));
        assert!(!is_clean_relative_path("../escape"));
        assert!(!is_clean_relative_path("mods/../../escape"));
    }

    #[test]
    fn safe_join_rejects_escapes() {
        let root = Path::new("/tmp/out");
        assert_eq!(
            safe_join(root, "mods/a.jar").unwrap(),
            root.join("mods/a.jar")
        );
        assert!(matches!(
            safe_join(root, "../a.jar"),
            Err(CoreError::PathEscape(_))
        ));
    }

    #[test]
    fn requirement_serializes_lowercase() {
        let env = Env::client_only();
        let json = serde_json::to_string(&env).unwrap();
        assert_eq!(json, r#"{"client":"required","server":"unsupported"}"#);
    }

    #[test]
    fn external_file_serializes_camel_case_size() {
        let file = ExternalFile {
            path: "mods/a.jar".to_string(),
            hashes: FileHashes {
                sha1: "a1".to_string(),
                sha256: "b2".to_string(),
            },
            downloads: vec!["https://cdn.example/a.jar".to_string()],
            file_size: 42,
            env: Env::both_required(),
        };
        let json = serde_json::to_string(&file).unwrap();
        assert!(json.contains(r#""fileSize":42"#));
    }
}
