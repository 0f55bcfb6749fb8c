//! `ginue erd`: draw the lookup relationships of the pulled apps.

use anyhow::Result;

use crate::config::{layout_of, EnvironmentSpec};
use crate::infrastructure::store::LocalStore;
use crate::services::write_erd;

/// Works from the local tree only, so no credentials are resolved
pub fn execute(spec: &EnvironmentSpec) -> Result<()> {
    let apps = spec
        .settings
        .app
        .as_ref()
        .map(|app| app.to_map())
        .unwrap_or_default();
    let store = LocalStore::new(layout_of(&spec.settings));
    write_erd(&store, &apps)?;
    Ok(())
}
