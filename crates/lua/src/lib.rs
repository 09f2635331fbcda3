//! pack-lua: the Lua script back-end for packlua
//!
//! Pack scripts are plain Lua executed against a fixed set of host-provided
//! globals: metadata setters, dependency declarations, inline file
//! declarations, registry-backed `mod`/`shader` resolution, and recursive
//! `include`. Every script in the include tree mutates one shared
//! [`pack_core::Modpack`].

mod error;
mod globals;
mod runtime;

pub use error::{Result, ScriptError};
pub use runtime::Runtime;
