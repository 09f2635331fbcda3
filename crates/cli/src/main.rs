use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use pack_core::{assemble, PackFormat};
use pack_lua::Runtime;

// Helper to convert ScriptError to anyhow::Error (works around mlua not
// being Send+Sync)
fn map_script_err<T>(result: pack_lua::Result<T>) -> Result<T> {
    result.map_err(|e| anyhow::anyhow!("{}", e))
}

/// Build Minecraft modpacks from declarative Lua pack files
#[derive(Parser)]
#[command(name = "packlua")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The pack file to build
    file: PathBuf,

    /// The directory to write the assembled pack to
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// The type of pack to create (mmc, modrinth, curseforge)
    #[arg(short = 't', long = "type", default_value = "mmc")]
    format: PackFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .without_time()
        .init();

    let cli = Cli::parse();

    let runtime = Runtime::new();
    let pack = map_script_err(runtime.run_file(&cli.file).await)?;

    if let Ok(model) = serde_json::to_string(&pack) {
        debug!("Build model: {}", model);
    }

    assemble(&pack, &cli.output, cli.format).await?;

    info!("Wrote {} pack to {}", cli.format, cli.output.display());
    Ok(())
}
