//! Local file tree layout
//!
//! `<location>/<environment>[-preview]/<appName>/<command_with_underscores>[.json|.js]`

use std::path::{Path, PathBuf};

use super::descriptor::FileType;

pub const REVISION_FILE: &str = "revision.json";

/// Where one environment keeps its pulled settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalLayout {
    pub location: Option<PathBuf>,
    /// Per-environment directory overriding the environment name
    pub env_location: Option<PathBuf>,
    pub environment: Option<String>,
    pub file_type: FileType,
}

impl LocalLayout {
    /// Environment directory, suffixed with `-preview` for staged settings
    pub fn base_dir(&self, preview: bool) -> PathBuf {
        let mut dir = self.location.clone().unwrap_or_default();
        let env_dir = self
            .env_location
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| self.environment.clone());

        match (env_dir, preview) {
            (Some(env_dir), false) => dir.push(env_dir),
            (Some(env_dir), true) => dir.push(format!("{}-preview", env_dir)),
            (None, true) => dir.push("preview"),
            (None, false) => {}
        }
        dir
    }

    pub fn app_dir(&self, app_name: &str, preview: bool) -> PathBuf {
        self.base_dir(preview).join(app_name)
    }

    /// File holding one endpoint's settings
    pub fn command_file(&self, app_name: &str, command: &str, preview: bool) -> PathBuf {
        self.app_dir(app_name, preview)
            .join(self.file_name(&command.replace('/', "_")))
    }

    /// Sidecar holding the app revision counter
    pub fn revision_file(&self, app_name: &str, preview: bool) -> PathBuf {
        self.app_dir(app_name, preview)
            .join(self.file_name(REVISION_FILE))
    }

    fn file_name(&self, name: &str) -> String {
        match self.file_type {
            FileType::Json => name.to_string(),
            FileType::Js => match name.strip_suffix(".json") {
                Some(stem) => format!("{}.js", stem),
                None => name.to_string(),
            },
        }
    }
}

/// Masked copy next to the original: `app_form_fields.json` → `app_form_fields-alt.json`
pub fn alt_file(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}-alt.{}", stem, ext.to_string_lossy()),
        None => format!("{}-alt", stem),
    };
    path.with_file_name(name)
}
