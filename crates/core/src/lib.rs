//! pack-core: core logic for packlua
//!
//! This crate provides the three non-script stages of the pipeline:
//! - The build model ([`Modpack`]) shared by every script invocation
//! - The content resolver ([`ModrinthClient`]) that turns `id@version`
//!   references into pinned, hash-described downloads
//! - The format assemblers ([`assemble`]) that project a finished model onto
//!   a launcher's on-disk layout

mod assemble;
mod error;
mod fetch;
mod pack;
mod resolver;

pub use assemble::{assemble, PackFormat};
pub use error::CoreError;
pub use fetch::fetch_external;
pub use pack::{
    is_clean_relative_path, safe_join, Dependency, Env, ExternalFile, FileHashes, InlineFile,
    Modpack, Requirement, MINECRAFT_ID,
};
pub use resolver::{ContentRef, DownloadDescriptor, ModrinthClient, Resolution};

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
