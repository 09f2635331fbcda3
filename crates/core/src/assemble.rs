//! Format assemblers: project a build model onto a launcher's on-disk layout

use futures::future::try_join_all;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

use crate::error::CoreError;
use crate::fetch::fetch_external;
use crate::pack::{safe_join, Dependency, Modpack, MINECRAFT_ID};
use crate::Result;

/// Subdirectory of a launcher instance that holds game data.
const DATA_DIR: &str = ".minecraft";

/// Supported output package formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackFormat {
    /// MultiMC / Prism launcher instance directory.
    Mmc,
    /// Modrinth `.mrpack` package.
    Modrinth,
    /// CurseForge pack.
    CurseForge,
}

impl FromStr for PackFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mmc" => Ok(Self::Mmc),
            "modrinth" => Ok(Self::Modrinth),
            "curseforge" => Ok(Self::CurseForge),
            other => Err(CoreError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for PackFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mmc => "mmc",
            Self::Modrinth => "modrinth",
            Self::CurseForge => "curseforge",
        };
        write!(f, "{}", name)
    }
}

/// Assemble the pack into `output_dir` in the requested format.
///
/// Exactly one assembler runs per invocation. Assembly is not transactional:
/// a failure partway through leaves a partially written output directory.
pub async fn assemble(pack: &Modpack, output_dir: &Path, format: PackFormat) -> Result<()> {
    match format {
        PackFormat::Mmc => assemble_mmc(pack, output_dir).await,
        PackFormat::Modrinth | PackFormat::CurseForge => Err(CoreError::NotImplemented(format)),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MmcManifest {
    format_version: u32,
    components: Vec<Component>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Component {
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_requires: Option<Vec<ComponentRequire>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    important: Option<bool>,
    uid: String,
    version: String,
}

#[derive(Serialize)]
struct ComponentRequire {
    uid: String,
}

fn minecraft_component(version: &str) -> Component {
    Component {
        cached_name: Some("Minecraft".to_string()),
        cached_version: Some(version.to_string()),
        cached_requires: None,
        important: Some(true),
        uid: "net.minecraft".to_string(),
        version: version.to_string(),
    }
}

fn loader_component(dep: &Dependency) -> Result<Component> {
    match dep.id.as_str() {
        "forge" => Ok(Component {
            cached_name: None,
            cached_version: None,
            cached_requires: None,
            important: None,
            uid: "net.minecraftforge".to_string(),
            version: dep.version.clone(),
        }),
        "fabric" => Ok(Component {
            cached_name: Some("Fabric Loader".to_string()),
            cached_version: Some(dep.version.clone()),
            cached_requires: Some(vec![ComponentRequire {
                uid: "net.fabricmc.intermediary".to_string(),
            }]),
            important: None,
            uid: "net.fabricmc.fabric-loader".to_string(),
            version: dep.version.clone(),
        }),
        other => Err(CoreError::UnsupportedLoader(other.to_string())),
    }
}

/// Write the pack as a MultiMC/Prism instance directory.
async fn assemble_mmc(pack: &Modpack, output_dir: &Path) -> Result<()> {
    info!("Assembling MultiMC instance in {}", output_dir.display());

    // The component manifest needs the runtime version, so fail before
    // creating anything if it is missing.
    let mc_version = pack.mc_version().ok_or(CoreError::MissingGameVersion)?;

    let mut components = vec![minecraft_component(mc_version)];
    for dep in pack.dependencies.iter().filter(|d| d.id != MINECRAFT_ID) {
        components.push(loader_component(dep)?);
    }
    let manifest = MmcManifest {
        format_version: 1,
        components,
    };

    let data_dir = output_dir.join(DATA_DIR);
    fs::create_dir_all(&data_dir).await?;

    let instance_cfg = format!(
        "[General]\nConfigVersion=1.2\niconKey=default\nname={}\nInstanceType=OneSix\n",
        pack.name
    );
    fs::write(output_dir.join("instance.cfg"), instance_cfg).await?;

    fs::write(
        output_dir.join("mmc-pack.json"),
        serde_json::to_string_pretty(&manifest)?,
    )
    .await?;

    for file in &pack.files {
        let dest = safe_join(&data_dir, &file.path)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&dest, &file.content).await?;
    }

    // Every download must have finished and been written before assembly
    // reports success.
    let http = reqwest::Client::new();
    try_join_all(
        pack.external_files
            .iter()
            .map(|file| fetch_external(&http, file, &data_dir)),
    )
    .await?;

    info!(
        "Assembled {} inline file(s) and {} download(s)",
        pack.files.len(),
        pack.external_files.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::{Env, ExternalFile, FileHashes, InlineFile};
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    fn base_pack() -> Modpack {
        let mut pack = Modpack::new();
        pack.name = "Test Pack".to_string();
        pack.dependencies.push(Dependency {
            id: MINECRAFT_ID.to_string(),
            version: "1.20.1".to_string(),
        });
        pack.dependencies.push(Dependency {
            id: "fabric".to_string(),
            version: "0.15.11".to_string(),
        });
        pack
    }

    #[test]
    fn format_parsing_round_trips() {
        for name in ["mmc", "modrinth", "curseforge"] {
            let format: PackFormat = name.parse().unwrap();
            assert_eq!(format.to_string(), name);
        }
        assert!(matches!(
            "zip".parse::<PackFormat>(),
            Err(CoreError::UnknownFormat(_))
        ));
    }

    #[tokio::test]
    async fn unimplemented_formats_produce_no_output() {
        let pack = base_pack();
        for format in [PackFormat::Modrinth, PackFormat::CurseForge] {
            let dir = TempDir::new().unwrap();
            let out = dir.path().join("out");
            let err = assemble(&pack, &out, format).await.unwrap_err();
            assert!(matches!(err, CoreError::NotImplemented(f) if f == format));
            assert!(!out.exists());
        }
    }

    #[tokio::test]
    async fn mmc_writes_instance_cfg_and_manifest() {
        let pack = base_pack();
        let dir = TempDir::new().unwrap();

        assemble(&pack, dir.path(), PackFormat::Mmc).await.unwrap();

        let cfg = std::fs::read_to_string(dir.path().join("instance.cfg")).unwrap();
        assert_eq!(
            cfg,
            "[General]\nConfigVersion=1.2\niconKey=default\nname=Test Pack\nInstanceType=OneSix\n"
        );

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("mmc-pack.json")).unwrap())
                .unwrap();
        assert_eq!(manifest["formatVersion"], 1);

        let components = manifest["components"].as_array().unwrap();
        assert_eq!(components.len(), 2);
        assert_eq!(components[0]["uid"], "net.minecraft");
        assert_eq!(components[0]["version"], "1.20.1");
        assert_eq!(components[0]["important"], true);
        assert_eq!(components[1]["uid"], "net.fabricmc.fabric-loader");
        assert_eq!(components[1]["cachedName"], "Fabric Loader");
        assert_eq!(
            components[1]["cachedRequires"][0]["uid"],
            "net.fabricmc.intermediary"
        );
    }

    #[tokio::test]
    async fn mmc_forge_component_is_bare() {
        let mut pack = base_pack();
        pack.dependencies[1] = Dependency {
            id: "forge".to_string(),
            version: "47.2.0".to_string(),
        };
        let dir = TempDir::new().unwrap();

        assemble(&pack, dir.path(), PackFormat::Mmc).await.unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("mmc-pack.json")).unwrap())
                .unwrap();
        let forge = &manifest["components"][1];
        assert_eq!(forge["uid"], "net.minecraftforge");
        assert_eq!(forge["version"], "47.2.0");
        assert!(forge.get("cachedName").is_none());
    }

    #[tokio::test]
    async fn inline_files_round_trip_byte_identical() {
        let mut pack = base_pack();
        pack.files.push(InlineFile {
            path: "config/x.json".to_string(),
            content: "{}".to_string(),
        });
        let dir = TempDir::new().unwrap();

        assemble(&pack, dir.path(), PackFormat::Mmc).await.unwrap();

        let written = std::fs::read(dir.path().join(".minecraft/config/x.json")).unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn missing_minecraft_dependency_fails_before_writing() {
        let mut pack = base_pack();
        pack.dependencies.retain(|d| d.id != MINECRAFT_ID);
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let err = assemble(&pack, &out, PackFormat::Mmc).await.unwrap_err();
        assert!(matches!(err, CoreError::MissingGameVersion));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn unknown_loader_fails() {
        let mut pack = base_pack();
        pack.dependencies[1].id = "quilt".to_string();
        let dir = TempDir::new().unwrap();

        let err = assemble(&pack, dir.path(), PackFormat::Mmc).await.unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedLoader(id) if id == "quilt"));
    }

    #[tokio::test]
    async fn external_files_are_downloaded_before_completion() {
        let body = b"jar bytes";
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cdn/sodium.jar")
            .with_status(200)
            .with_body(body.as_slice())
            .create_async()
            .await;

        let sha256 = {
            let mut hasher = Sha256::new();
            hasher.update(body);
            hex::encode(hasher.finalize())
        };

        let mut pack = base_pack();
        pack.external_files.push(ExternalFile {
            path: "mods/sodium-0.5.8.jar".to_string(),
            hashes: FileHashes {
                sha1: "unchecked".to_string(),
                sha256,
            },
            downloads: vec![format!("{}/cdn/sodium.jar", server.url())],
            file_size: body.len() as u64,
            env: Env::both_required(),
        });
        let dir = TempDir::new().unwrap();

        assemble(&pack, dir.path(), PackFormat::Mmc).await.unwrap();

        let written = std::fs::read(dir.path().join(".minecraft/mods/sodium-0.5.8.jar")).unwrap();
        assert_eq!(written, body);
    }
}
