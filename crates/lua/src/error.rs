//! Error types for pack-lua

use thiserror::Error;

/// Errors that can occur while running a pack script
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Lua runtime error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("core error: {0}")]
    Core(#[from] pack_core::CoreError),

    #[error("pack script not found: {0}")]
    ScriptNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
