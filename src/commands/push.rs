//! `ginue push`: send local settings to the staging area.
//!
//! Apps and their endpoints are pushed one at a time so that recovery prompts
//! never interleave. With `<env>:<target>` the files of `<env>` are pushed to
//! the apps `<target>` maps to the same names.

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::domain::catalog::{expand, Planned, FIELD_ACL};
use crate::domain::descriptor::{EnvironmentDescriptor, RunFlags};
use crate::infrastructure::kintone::KintoneApi;
use crate::infrastructure::prompt::Prompter;
use crate::infrastructure::store::LocalStore;
use crate::services::{PushEngine, PushOutcome, PushTarget};
use crate::ui;

use super::client_for;

/// Execute the push command for one environment
pub async fn execute(descriptor: &EnvironmentDescriptor, prompter: &dyn Prompter) -> Result<()> {
    // Every remote call of a redirected push lands in the target environment
    let transport = descriptor.push_target.as_deref().unwrap_or(descriptor);
    let client = client_for(transport)?;
    run(&client, prompter, descriptor).await
}

/// ACL endpoints are only pushed when explicitly enabled
pub fn acl_allowed(command: &str, flags: RunFlags) -> bool {
    if command.contains("/acl.json") && !flags.acl {
        return false;
    }
    !(command == FIELD_ACL && !flags.field_acl)
}

pub async fn run(api: &dyn KintoneApi, prompter: &dyn Prompter, descriptor: &EnvironmentDescriptor) -> Result<()> {
    let catalog = descriptor.catalog()?;
    let store = LocalStore::new(descriptor.layout.clone());
    let engine = PushEngine::new(api, prompter, &store);
    let source = Arc::new(descriptor.connection());
    let target = descriptor.push_target.as_deref().map(|target| PushTarget {
        connection: Arc::new(target.connection()),
        apps: &target.apps,
    });
    let label = descriptor
        .push_target
        .as_deref()
        .map_or(descriptor.label(), EnvironmentDescriptor::label);

    let mut pushed = 0;
    for (name, id) in descriptor.selected_apps() {
        ui::print_target(label, name);
        for planned in expand(&catalog, &source, name, id, false) {
            let request = match planned {
                Planned::Sync(request) => request,
                Planned::ForbiddenViaOauth(command) => {
                    ui::print_skip(&command, Some("Forbidden via OAuth"));
                    continue;
                }
            };
            if !acl_allowed(&request.command, descriptor.flags) {
                ui::print_skip(&request.command, None);
                continue;
            }
            if engine.push(&request, &descriptor.apps, target.as_ref()).await? == PushOutcome::Pushed {
                pushed += 1;
            }
        }
    }

    info!("📤 Pushed {} endpoint(s) to {}", pushed, label);
    Ok(())
}
