//! Pull engine
//!
//! Fetches one endpoint and writes it to the local tree:
//! - the payload without its `revision`, pretty printed
//! - the revision counter in the per-app `revision.json` sidecar
//! - a masked `-alt` copy when enabled and the endpoint carries
//!   environment-specific identifiers
//! - uploaded customization files when `downloadJs` is set

use anyhow::Result;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::domain::catalog::{HttpMethod, CUSTOMIZE};
use crate::domain::descriptor::RunFlags;
use crate::domain::layout::alt_file;
use crate::domain::masking::{mask, revision_document, split_revision};
use crate::domain::request::SyncRequest;
use crate::infrastructure::kintone::KintoneApi;
use crate::infrastructure::store::LocalStore;
use crate::ui;

pub struct PullEngine<'a> {
    api: &'a dyn KintoneApi,
    store: &'a LocalStore,
    flags: RunFlags,
}

impl<'a> PullEngine<'a> {
    pub fn new(api: &'a dyn KintoneApi, store: &'a LocalStore, flags: RunFlags) -> Self {
        Self { api, store, flags }
    }

    /// Pull one endpoint; returns the written main file, or `None` when the
    /// endpoint cannot be read
    pub async fn pull(&self, request: &SyncRequest) -> Result<Option<PathBuf>> {
        if !request.allows(HttpMethod::Get) {
            debug!("Skipping {}: GET not supported", request.command);
            return Ok(None);
        }

        let payload = self
            .api
            .get(&request.connection, &request.path(), &request.query())
            .await?;
        let (payload, revision) = split_revision(payload);

        let layout = self.store.layout();
        let path = layout.command_file(&request.app_name, &request.command, request.preview);
        self.store.save(&path, &payload)?;
        ui::print_path(&path);

        if let Some(revision) = revision {
            let sidecar = layout.revision_file(&request.app_name, request.preview);
            self.store.save(&sidecar, &revision_document(revision))?;
        }

        if self.flags.alt {
            if let Some(masked) = mask(&request.command, &payload) {
                let alt = alt_file(&path);
                self.store.save(&alt, &masked)?;
                ui::print_path(&alt);
            }
        }

        if self.flags.download_js && request.command == CUSTOMIZE {
            self.download_resources(request, &payload).await?;
        }

        Ok(Some(path))
    }

    async fn download_resources(&self, request: &SyncRequest, customize: &Value) -> Result<()> {
        let dir = self.store.layout().app_dir(&request.app_name, request.preview);
        for (file_key, name) in uploaded_files(customize) {
            let bytes = self.api.download(&request.connection, &file_key).await?;
            let path = self.store.save_bytes(&dir.join(&name), &bytes)?;
            info!("📥 Downloaded {}", path.display());
        }
        Ok(())
    }
}

/// `(fileKey, name)` of every uploaded desktop/mobile JS and CSS resource
pub fn uploaded_files(customize: &Value) -> Vec<(String, String)> {
    let mut files = Vec::new();
    for platform in ["desktop", "mobile"] {
        for kind in ["js", "css"] {
            let Some(resources) = customize
                .get(platform)
                .and_then(|p| p.get(kind))
                .and_then(Value::as_array)
            else {
                continue;
            };
            for resource in resources {
                if resource.get("type").and_then(Value::as_str) != Some("FILE") {
                    continue;
                }
                let file = resource.get("file");
                let key = file.and_then(|f| f.get("fileKey")).and_then(Value::as_str);
                let name = file.and_then(|f| f.get("name")).and_then(Value::as_str);
                if let (Some(key), Some(name)) = (key, name) {
                    files.push((key.to_string(), name.to_string()));
                }
            }
        }
    }
    files
}
