//! `ginue diff`: compare two environment directories in the diff viewer.
//!
//! The pair is the resolved environment and its push target, or the first
//! two environments when several were resolved.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{layout_of, EnvSettings, EnvironmentSpec};
use crate::infrastructure::diff_viewer::{launch, viewer_url};
use crate::ui;

/// Absolute directories to compare
pub fn compare_dirs(specs: &[EnvironmentSpec], cwd: &Path) -> (Option<PathBuf>, Option<PathBuf>) {
    let dir = |settings: &EnvSettings| cwd.join(layout_of(settings).base_dir(false));

    let mut dirs: Vec<PathBuf> = match specs {
        [spec] => std::iter::once(dir(&spec.settings))
            .chain(spec.push_target.as_deref().map(dir))
            .collect(),
        _ => specs.iter().map(|spec| dir(&spec.settings)).collect(),
    };
    dirs.truncate(2);

    let mut dirs = dirs.into_iter();
    (dirs.next(), dirs.next())
}

pub async fn execute(specs: &[EnvironmentSpec]) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let (from, to) = compare_dirs(specs, &cwd);
    let url = viewer_url(from.as_deref(), to.as_deref());
    ui::print_info(&format!("Open {}", url));
    launch().await
}
