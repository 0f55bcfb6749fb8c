//! Directory diff viewer launcher
//!
//! `ginue diff` hands two environment directories to the `twins-diff` web
//! viewer. The binary is taken from `TWINS_DIFF_BIN` when set (so packaged
//! installs can pin it) and looked up on `PATH` otherwise.

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

pub const VIEWER: &str = "twins-diff";
pub const VIEWER_URL: &str = "http://localhost:3000/";

/// Resolve the path to an external tool: `{TOOL}_BIN` env var, then `PATH`
pub fn tool_path(tool: &str) -> Result<PathBuf> {
    let env_var = format!("{}_BIN", tool.to_uppercase().replace('-', "_"));
    if let Ok(path) = env::var(&env_var) {
        return Ok(PathBuf::from(path));
    }
    which::which(tool).with_context(|| format!("'{}' not found on PATH (or set {})", tool, env_var))
}

/// Viewer URL comparing two directories
pub fn viewer_url(from: Option<&Path>, to: Option<&Path>) -> String {
    let mut url = VIEWER_URL.to_string();
    if let Some(from) = from {
        url.push_str(&format!("?from={}", urlencoding::encode(&from.to_string_lossy())));
        if let Some(to) = to {
            url.push_str(&format!("&to={}", urlencoding::encode(&to.to_string_lossy())));
        }
    }
    url
}

/// Run the viewer in the foreground until the operator stops it
pub async fn launch() -> Result<()> {
    let viewer = tool_path(VIEWER)?;
    debug!("Launching {}", viewer.display());
    let status = Command::new(&viewer)
        .status()
        .await
        .with_context(|| format!("Failed to run {}", viewer.display()))?;
    if !status.success() {
        anyhow::bail!("{} exited with {}", VIEWER, status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_url() {
        let url = viewer_url(Some(Path::new("/work/dev")), Some(Path::new("/work/prod")));
        assert_eq!(url, "http://localhost:3000/?from=%2Fwork%2Fdev&to=%2Fwork%2Fprod");
        assert_eq!(viewer_url(None, None), "http://localhost:3000/");
    }

    #[test]
    fn test_tool_path_from_env() {
        env::set_var("GINUE_TEST_VIEWER_BIN", "/custom/viewer");
        assert_eq!(tool_path("ginue-test-viewer").unwrap(), PathBuf::from("/custom/viewer"));
        env::remove_var("GINUE_TEST_VIEWER_BIN");
    }

    #[test]
    fn test_tool_path_missing() {
        assert!(tool_path("ginue-definitely-missing-tool").is_err());
    }
}
