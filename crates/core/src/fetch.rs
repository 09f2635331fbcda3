//! Downloading external pack content during assembly

use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::pack::{safe_join, ExternalFile};
use crate::Result;

/// Download one external file and write it below `root` at its declared
/// relative path, verifying the SHA256 the registry reported for it.
pub async fn fetch_external(
    http: &reqwest::Client,
    file: &ExternalFile,
    root: &Path,
) -> Result<()> {
    let url = file
        .downloads
        .first()
        .ok_or_else(|| CoreError::MissingDownloadUrl(file.path.clone()))?;

    info!("Fetching {}", url);

    let response = http.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;

    let actual = {
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hex::encode(hasher.finalize())
    };
    if actual != file.hashes.sha256 {
        return Err(CoreError::HashMismatch {
            url: url.clone(),
            expected: file.hashes.sha256.clone(),
            actual,
        });
    }

    let dest = safe_join(root, &file.path)?;
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut out = fs::File::create(&dest).await?;
    out.write_all(&bytes).await?;
    out.flush().await?;

    debug!("Wrote {} ({} bytes)", dest.display(), bytes.len());
    Ok(())
}
