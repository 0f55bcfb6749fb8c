//! `ginue deploy` / `ginue reset`: apply or discard the staged settings.

use anyhow::Result;

use crate::domain::descriptor::EnvironmentDescriptor;
use crate::services::deploy_or_reset;

use super::client_for;

/// Execute deploy (`revert = false`) or reset (`revert = true`)
pub async fn execute(descriptor: &EnvironmentDescriptor, revert: bool) -> Result<()> {
    let client = client_for(descriptor)?;
    deploy_or_reset(&client, descriptor, revert).await
}
