//! `ginue pull`: download every endpoint of every app in scope.
//!
//! Apps are pulled concurrently. Within one app every endpoint is requested
//! at once and awaited together, so an app is done only when all of its
//! files are written; the first failure fails the environment.

use anyhow::Result;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

use crate::domain::app::AppId;
use crate::domain::catalog::{expand, CommandCatalog, Planned};
use crate::domain::descriptor::EnvironmentDescriptor;
use crate::domain::request::Connection;
use crate::infrastructure::kintone::KintoneApi;
use crate::infrastructure::store::LocalStore;
use crate::services::PullEngine;
use crate::ui;

use super::client_for;

/// Files written for one app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPulled {
    pub app_name: String,
    pub files: usize,
}

/// Execute the pull command for one environment
pub async fn execute(descriptor: &EnvironmentDescriptor) -> Result<()> {
    let client = client_for(descriptor)?;
    run(&client, descriptor).await?;
    Ok(())
}

pub async fn run(api: &dyn KintoneApi, descriptor: &EnvironmentDescriptor) -> Result<Vec<AppPulled>> {
    let catalog = descriptor.catalog()?;
    let store = LocalStore::new(descriptor.layout.clone());
    let engine = PullEngine::new(api, &store, descriptor.flags);
    let connection = Arc::new(descriptor.connection());

    let apps = descriptor
        .selected_apps()
        .map(|(name, id)| pull_app(&engine, &catalog, &connection, descriptor, name, id));
    let pulled = try_join_all(apps).await?;

    info!(
        "📥 Pulled {} file(s) for {} app(s) from {}",
        pulled.iter().map(|app| app.files).sum::<usize>(),
        pulled.len(),
        descriptor.label()
    );
    Ok(pulled)
}

async fn pull_app(
    engine: &PullEngine<'_>,
    catalog: &CommandCatalog,
    connection: &Arc<Connection>,
    descriptor: &EnvironmentDescriptor,
    name: &str,
    id: &AppId,
) -> Result<AppPulled> {
    ui::print_target(descriptor.label(), name);

    let mut requests = Vec::new();
    for planned in expand(catalog, connection, name, id, descriptor.flags.preview) {
        match planned {
            Planned::Sync(request) => requests.push(request),
            Planned::ForbiddenViaOauth(command) => ui::print_skip(&command, Some("Forbidden via OAuth")),
        }
    }

    let written = try_join_all(requests.iter().map(|request| engine.pull(request))).await?;
    let files = written.iter().flatten().count();
    info!("[{}/{}] pulled {} file(s)", descriptor.label(), name, files);
    Ok(AppPulled {
        app_name: name.to_string(),
        files,
    })
}
