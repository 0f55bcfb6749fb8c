//! Deploy / reset trigger
//!
//! One POST to the staging deploy endpoint for every app in scope. The remote
//! side applies (or reverts) the staged settings asynchronously; completion is
//! not polled.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::info;

use crate::domain::catalog::{HttpMethod, DEPLOY};
use crate::domain::descriptor::EnvironmentDescriptor;
use crate::infrastructure::kintone::KintoneApi;

/// Request body for the apps of `descriptor` (honors `--appName`)
pub fn deploy_body(descriptor: &EnvironmentDescriptor, revert: bool) -> Value {
    let apps: Vec<Value> = descriptor
        .selected_apps()
        .map(|(_, id)| json!({ "app": id.to_json() }))
        .collect();
    json!({ "apps": apps, "revert": revert })
}

/// Trigger deploy (`revert = false`) or reset (`revert = true`)
pub async fn deploy_or_reset(api: &dyn KintoneApi, descriptor: &EnvironmentDescriptor, revert: bool) -> Result<()> {
    let body = deploy_body(descriptor, revert);
    let count = body["apps"].as_array().map_or(0, Vec::len);
    if count == 0 {
        info!("No apps to {}", if revert { "reset" } else { "deploy" });
        return Ok(());
    }

    let connection = descriptor.connection();
    api.send(HttpMethod::Post, &connection, &format!("preview/{}", DEPLOY), &body)
        .await?;

    if revert {
        info!("🔄 Reset requested for {} app(s) on {}", count, descriptor.label());
    } else {
        info!("🚀 Deploy requested for {} app(s) on {}", count, descriptor.label());
    }
    Ok(())
}
