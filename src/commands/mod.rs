//! Subcommand orchestration
//!
//! Every subcommand runs once per resolved environment. Environments run
//! concurrently and fail independently: a failure is reported (with the remote
//! error body when there is one) and the run exits non-zero once all of them
//! have finished.

pub mod deploy;
pub mod diff;
pub mod erd;
pub mod pull;
pub mod push;

use anyhow::Result;
use futures::future::join_all;
use std::future::Future;

use crate::domain::descriptor::EnvironmentDescriptor;
use crate::error::{KintoneError, PushError};
use crate::infrastructure::kintone::KintoneClient;
use crate::ui;

/// Run `run` for every environment concurrently
pub async fn for_each_environment<'a, F, Fut>(descriptors: &'a [EnvironmentDescriptor], run: F) -> Result<()>
where
    F: Fn(&'a EnvironmentDescriptor) -> Fut,
    Fut: Future<Output = Result<()>> + 'a,
{
    let runs = descriptors.iter().map(|descriptor| {
        let fut = run(descriptor);
        async move { (descriptor.label(), fut.await) }
    });

    let mut failed = 0;
    for (label, result) in join_all(runs).await {
        match result {
            Ok(()) => ui::print_success(&format!("[{}] done", label)),
            Err(err) => {
                report_failure(label, &err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} environment(s) failed", failed, descriptors.len());
    }
    Ok(())
}

/// Print a failed environment, with the structured remote error when present
pub fn report_failure(label: &str, err: &anyhow::Error) {
    if let Some(remote) = remote_error(err) {
        ui::print_json(&remote.to_report());
    }
    ui::print_error(&format!("[{}] {:#}", label, err));
}

fn remote_error(err: &anyhow::Error) -> Option<&KintoneError> {
    err.downcast_ref::<KintoneError>()
        .or_else(|| err.downcast_ref::<PushError>().map(PushError::remote))
}

/// HTTP client honoring an environment's proxy and client certificate
pub fn client_for(descriptor: &EnvironmentDescriptor) -> Result<KintoneClient> {
    KintoneClient::new(descriptor.proxy.as_ref(), descriptor.client_certificate.as_ref())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kintone::testing::api_error;
    use serde_json::Value;

    #[tokio::test]
    async fn test_failures_are_collected_per_environment() {
        let dir = tempfile::tempdir().unwrap();
        let descriptors = vec![
            fixtures::descriptor(dir.path(), "dev", "orders=10"),
            fixtures::descriptor(dir.path(), "prod", "orders=20"),
        ];

        let err = for_each_environment(&descriptors, |descriptor| async move {
            if descriptor.label() == "prod" {
                anyhow::bail!("boom");
            }
            Ok(())
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 environment(s) failed");
    }

    #[test]
    fn test_all_environments_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let descriptors = vec![fixtures::descriptor(dir.path(), "dev", "orders=10")];
        tokio_test::block_on(for_each_environment(&descriptors, |_| async { Ok(()) })).unwrap();
    }

    #[test]
    fn test_remote_error_through_push_error() {
        let source = api_error("PUT", "GAIA_FC01", "The field (code: X) not found.", Value::Null);
        let err: anyhow::Error = PushError::Declined {
            command: "app/form/fields.json".to_string(),
            source,
        }
        .into();
        assert_eq!(remote_error(&err).unwrap().api_error().unwrap().code, "GAIA_FC01");

        let plain = anyhow::anyhow!("not remote");
        assert!(remote_error(&plain).is_none());
    }
}
