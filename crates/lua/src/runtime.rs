//! Pack script execution

use std::cell::RefCell;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use mlua::Lua;
use tracing::debug;

use pack_core::{ModrinthClient, Modpack};

use crate::error::{Result, ScriptError};
use crate::globals::{self, SharedPack};

/// Executes pack scripts against a shared build model.
///
/// Every script (including each transitively included one) runs in a fresh
/// Lua state, but all of them mutate the same [`Modpack`]. Scripts are driven
/// asynchronously so the network-bound host functions suspend in place;
/// statements still complete strictly in document order.
pub struct Runtime {
    resolver: Arc<ModrinthClient>,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_resolver(ModrinthClient::new())
    }

    /// Use a specific registry client, e.g. one pointed at a test server.
    pub fn with_resolver(resolver: ModrinthClient) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    /// Run a pack script (and its whole include tree) and return the
    /// populated build model.
    pub async fn run_file(&self, path: &Path) -> Result<Modpack> {
        let pack: SharedPack = Rc::new(RefCell::new(Modpack::new()));
        run_script(
            path.to_path_buf(),
            Rc::clone(&pack),
            Arc::clone(&self.resolver),
        )
        .await?;
        let pack = pack.borrow().clone();
        Ok(pack)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute one script file against the shared model.
///
/// Boxed because `include` recurses back into this function through the Lua
/// host bindings.
pub(crate) fn run_script(
    path: PathBuf,
    pack: SharedPack,
    resolver: Arc<ModrinthClient>,
) -> Pin<Box<dyn Future<Output = Result<()>>>> {
    Box::pin(async move {
        let source = std::fs::read_to_string(&path)
            .map_err(|_| ScriptError::ScriptNotFound(path.display().to_string()))?;

        debug!("Running script {}", path.display());

        let script_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let lua = Lua::new();
        globals::register_globals(&lua, &pack, &resolver, script_dir)?;

        lua.load(&source)
            .set_name(path.to_string_lossy())
            .exec_async()
            .await?;

        Ok(())
    })
}
