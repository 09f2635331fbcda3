//! Host functions exposed to pack scripts
//!
//! Each function is a Lua global bound to the shared build model. The
//! network-bound ones (`mod`, `shader`, `include`) are async host functions:
//! the script suspends at the call and resumes once the operation completes,
//! so statement order is also completion order.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use mlua::{Lua, LuaSerdeExt, Result as LuaResult, Table, Value};
use tracing::info;

use pack_core::{
    is_clean_relative_path, ContentRef, Dependency, Env, ExternalFile, InlineFile, ModrinthClient,
    Modpack, Resolution, MINECRAFT_ID,
};

use crate::runtime::run_script;

/// Loader identity used when filtering shader pack versions in the registry.
/// Shader packs are loader-agnostic but registry-filtered by this shim.
const SHADER_LOADER: &str = "iris";

/// The build model shared by every script in the include tree.
pub(crate) type SharedPack = Rc<RefCell<Modpack>>;

/// Register all host functions on a fresh Lua state.
///
/// `script_dir` is the directory of the script this state will execute;
/// `include` resolves its argument against it.
pub(crate) fn register_globals(
    lua: &Lua,
    pack: &SharedPack,
    resolver: &Arc<ModrinthClient>,
    script_dir: PathBuf,
) -> LuaResult<()> {
    register_metadata_setters(lua, pack)?;
    register_dependency_functions(lua, pack)?;
    register_file_functions(lua, pack)?;
    register_content_functions(lua, pack, resolver)?;
    register_include(lua, pack, resolver, script_dir)?;
    register_json(lua)?;
    Ok(())
}

fn register_metadata_setters(lua: &Lua, pack: &SharedPack) -> LuaResult<()> {
    let setters: [(&str, fn(&mut Modpack, String)); 6] = [
        ("name", |p, v| p.name = v),
        ("description", |p, v| p.description = v),
        ("version", |p, v| p.version = v),
        ("author", |p, v| p.author = v),
        ("url", |p, v| p.url = v),
        ("icon", |p, v| p.icon = v),
    ];

    for (field, set) in setters {
        let pack = Rc::clone(pack);
        let setter = lua.create_function(move |_, value: String| {
            set(&mut pack.borrow_mut(), value);
            Ok(())
        })?;
        lua.globals().set(field, setter)?;
    }

    Ok(())
}

fn register_dependency_functions(lua: &Lua, pack: &SharedPack) -> LuaResult<()> {
    let globals = lua.globals();

    let minecraft_pack = Rc::clone(pack);
    let minecraft_fn = lua.create_function(move |_, version: String| {
        minecraft_pack.borrow_mut().dependencies.push(Dependency {
            id: MINECRAFT_ID.to_string(),
            version,
        });
        Ok(())
    })?;
    globals.set("minecraft", minecraft_fn)?;

    let loader_pack = Rc::clone(pack);
    let modloader_fn = lua.create_function(move |_, spec: String| {
        let reference: ContentRef = spec.parse().map_err(mlua::Error::external)?;
        let version = reference.version.ok_or_else(|| {
            mlua::Error::runtime(format!("modloader '{}' must be pinned as id@version", spec))
        })?;
        loader_pack.borrow_mut().dependencies.push(Dependency {
            id: reference.id,
            version,
        });
        Ok(())
    })?;
    globals.set("modloader", modloader_fn)?;

    Ok(())
}

fn register_file_functions(lua: &Lua, pack: &SharedPack) -> LuaResult<()> {
    let globals = lua.globals();

    let file_pack = Rc::clone(pack);
    let file_fn = lua.create_function(move |_, spec: Table| {
        let decl = parse_file_decl(&spec)?;
        info!("Adding file {}", decl.path);
        file_pack.borrow_mut().files.push(decl);
        Ok(())
    })?;
    globals.set("file", file_fn)?;

    let config_pack = Rc::clone(pack);
    let config_fn = lua.create_function(move |_, spec: Table| {
        let mut decl = parse_file_decl(&spec)?;
        decl.path = format!("config/{}", decl.path);
        info!("Adding config {}", decl.path);
        config_pack.borrow_mut().files.push(decl);
        Ok(())
    })?;
    globals.set("config", config_fn)?;

    Ok(())
}

fn parse_file_decl(spec: &Table) -> LuaResult<InlineFile> {
    let path: String = spec
        .get("path")
        .map_err(|_| mlua::Error::runtime("file{} requires a 'path' field"))?;
    let content: String = spec
        .get("content")
        .map_err(|_| mlua::Error::runtime("file{} requires a 'content' field"))?;

    if !is_clean_relative_path(&path) {
        return Err(mlua::Error::runtime(format!(
            "path '{}' escapes the pack root",
            path
        )));
    }

    Ok(InlineFile { path, content })
}

#[derive(Clone, Copy)]
enum ContentKind {
    Mod,
    Shader,
}

impl ContentKind {
    fn label(self) -> &'static str {
        match self {
            Self::Mod => "mod",
            Self::Shader => "shader",
        }
    }

    fn dir(self) -> &'static str {
        match self {
            Self::Mod => "mods",
            Self::Shader => "shaderpacks",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Mod => "jar",
            Self::Shader => "zip",
        }
    }

    fn env(self) -> Env {
        match self {
            Self::Mod => Env::both_required(),
            Self::Shader => Env::client_only(),
        }
    }
}

fn register_content_functions(
    lua: &Lua,
    pack: &SharedPack,
    resolver: &Arc<ModrinthClient>,
) -> LuaResult<()> {
    let globals = lua.globals();

    let mod_pack = Rc::clone(pack);
    let mod_resolver = Arc::clone(resolver);
    let mod_fn = lua.create_async_function(move |_, spec: String| {
        let pack = Rc::clone(&mod_pack);
        let resolver = Arc::clone(&mod_resolver);
        async move { add_remote_content(&pack, &resolver, &spec, ContentKind::Mod).await }
    })?;
    globals.set("mod", mod_fn)?;

    let shader_pack = Rc::clone(pack);
    let shader_resolver = Arc::clone(resolver);
    let shader_fn = lua.create_async_function(move |_, spec: String| {
        let pack = Rc::clone(&shader_pack);
        let resolver = Arc::clone(&shader_resolver);
        async move { add_remote_content(&pack, &resolver, &spec, ContentKind::Shader).await }
    })?;
    globals.set("shader", shader_fn)?;

    Ok(())
}

/// Resolve a mod/shader reference and append the resulting external file.
///
/// An unpinned reference only reports the latest compatible version; nothing
/// is appended in that case.
async fn add_remote_content(
    pack: &SharedPack,
    resolver: &ModrinthClient,
    spec: &str,
    kind: ContentKind,
) -> LuaResult<()> {
    let reference: ContentRef = spec.parse().map_err(mlua::Error::external)?;

    // Snapshot the dependency-derived resolution inputs; the borrow must not
    // be held across the await below.
    let (mc_version, pack_loader) = {
        let pack = pack.borrow();
        (
            pack.mc_version().map(str::to_string),
            pack.loader().map(|dep| dep.id.clone()),
        )
    };
    let mc_version = mc_version.ok_or_else(|| {
        mlua::Error::runtime(format!(
            "minecraft(version) must be declared before {} '{}'",
            kind.label(),
            spec
        ))
    })?;
    let loader = match kind {
        ContentKind::Mod => pack_loader.ok_or_else(|| {
            mlua::Error::runtime(format!(
                "modloader(spec) must be declared before mod '{}'",
                spec
            ))
        })?,
        ContentKind::Shader => SHADER_LOADER.to_string(),
    };

    let resolution = resolver
        .resolve(&reference, &mc_version, &loader)
        .await
        .map_err(mlua::Error::external)?;

    match resolution {
        Resolution::Pinned { version, download } => {
            info!("Adding {} {}", kind.label(), reference);
            pack.borrow_mut().external_files.push(ExternalFile {
                path: format!("{}/{}-{}.{}", kind.dir(), reference.id, version, kind.extension()),
                hashes: download.hashes,
                downloads: vec![download.url],
                file_size: download.file_size,
                env: kind.env(),
            });
        }
        Resolution::LatestCompatible { version } => {
            info!(
                "No version pinned for {}, latest compatible with {}/{} is {}",
                reference.id, mc_version, loader, version
            );
        }
    }

    Ok(())
}

fn register_include(
    lua: &Lua,
    pack: &SharedPack,
    resolver: &Arc<ModrinthClient>,
    script_dir: PathBuf,
) -> LuaResult<()> {
    let pack = Rc::clone(pack);
    let resolver = Arc::clone(resolver);
    let include_fn = lua.create_async_function(move |_, rel_path: String| {
        // Relative to the directory of the script currently executing, not
        // the top-level one.
        let target = script_dir.join(&rel_path);
        let pack = Rc::clone(&pack);
        let resolver = Arc::clone(&resolver);
        async move {
            info!("Including {}", target.display());
            run_script(target, pack, resolver)
                .await
                .map_err(|e| mlua::Error::runtime(e.to_string()))
        }
    })?;
    lua.globals().set("include", include_fn)?;
    Ok(())
}

fn register_json(lua: &Lua) -> LuaResult<()> {
    let json_fn = lua.create_function(|lua, value: Value| {
        let json: serde_json::Value = lua.from_value(value)?;
        serde_json::to_string(&json).map_err(mlua::Error::external)
    })?;
    lua.globals().set("json", json_fn)?;
    Ok(())
}
