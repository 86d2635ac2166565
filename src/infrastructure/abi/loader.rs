//! ABI loading from files and URLs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::abi::AbiRegistry;

/// Skip files larger than this; real ABIs are a few hundred KB at most
const MAX_ABI_BYTES: u64 = 5 * 1024 * 1024;

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load from a path or an http(s) URL
pub async fn load_abi(source: &str, client: &reqwest::Client) -> Result<AbiRegistry> {
    if is_url(source) {
        fetch_abi(source, client).await
    } else {
        load_abi_file(expand_home(source))
    }
}

pub fn load_abi_file(path: impl AsRef<Path>) -> Result<AbiRegistry> {
    let path = path.as_ref();
    let metadata =
        fs::metadata(path).with_context(|| format!("File not found: {}", path.display()))?;
    if metadata.len() > MAX_ABI_BYTES {
        anyhow::bail!(
            "ABI file {} is too large ({} bytes)",
            path.display(),
            metadata.len()
        );
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read ABI file {}", path.display()))?;
    let registry = AbiRegistry::from_json_str(&content)
        .with_context(|| format!("Invalid ABI in {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded ABI file");
    Ok(registry)
}

pub async fn fetch_abi(url: &str, client: &reqwest::Client) -> Result<AbiRegistry> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch ABI from {url}"))?
        .error_for_status()
        .with_context(|| format!("ABI request to {url} failed"))?;
    let content = response
        .text()
        .await
        .with_context(|| format!("Failed to read ABI body from {url}"))?;
    let registry =
        AbiRegistry::from_json_str(&content).with_context(|| format!("Invalid ABI at {url}"))?;
    tracing::debug!(url, "fetched ABI");
    Ok(registry)
}

/// `~/x` -> `$HOME/x`
pub fn expand_home(path: &str) -> std::path::PathBuf {
    match (path.strip_prefix("~/"), std::env::var_os("HOME")) {
        (Some(rest), Some(home)) => Path::new(&home).join(rest),
        _ => Path::new(path).to_path_buf(),
    }
}
