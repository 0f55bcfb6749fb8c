//! Push engine
//!
//! Sends a locally edited endpoint to the staging ("preview") area of an
//! environment. kintone rejects some pushes until the remote form is brought
//! in line with the local one, so a failed PUT is classified and, with the
//! operator's consent, corrected and retried:
//!
//! | endpoint          | code        | correction                              |
//! |-------------------|-------------|-----------------------------------------|
//! | `form/fields`     | `GAIA_FC01` | POST the missing field                  |
//! | `form/layout`     | `GAIA_FN11` | DELETE fields left out of the layout    |
//! | `form/layout`     | `CB_VA01`   | DELETE subtable fields left out locally |
//! | `views`           | `CB_NO02`   | skip the endpoint                       |
//!
//! Retries are bounded, and a failure that reappears unchanged right after
//! its correction ends the push.

use anyhow::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::app::AppMap;
use crate::domain::catalog::{HttpMethod, CUSTOMIZE, FORM_FIELDS, FORM_LAYOUT, SETTINGS, VIEWS};
use crate::domain::masking::{remap_related_apps, strip_settings_for_push};
use crate::domain::recovery::{classify, RecoveryAction};
use crate::domain::request::{Connection, SyncRequest};
use crate::error::{ConfigError, PushError};
use crate::infrastructure::kintone::KintoneApi;
use crate::infrastructure::prompt::Prompter;
use crate::infrastructure::store::LocalStore;
use crate::ui;

/// Corrective actions allowed per push before giving up
pub const MAX_CORRECTIONS: u32 = 16;

/// Environment a cross-environment push lands in
pub struct PushTarget<'a> {
    pub connection: Arc<Connection>,
    pub apps: &'a AppMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    Skipped,
}

enum Correction {
    Applied,
    Skipped,
    Declined,
    NotApplicable,
}

pub struct PushEngine<'a> {
    api: &'a dyn KintoneApi,
    prompter: &'a dyn Prompter,
    store: &'a LocalStore,
    max_corrections: u32,
}

impl<'a> PushEngine<'a> {
    pub fn new(api: &'a dyn KintoneApi, prompter: &'a dyn Prompter, store: &'a LocalStore) -> Self {
        Self {
            api,
            prompter,
            store,
            max_corrections: MAX_CORRECTIONS,
        }
    }

    #[cfg(test)]
    pub fn with_max_corrections(mut self, max_corrections: u32) -> Self {
        self.max_corrections = max_corrections;
        self
    }

    /// Push one endpoint of one app.
    ///
    /// `source_apps` is the app map of the environment the files were pulled
    /// from; it is only consulted when `target` redirects the push.
    pub async fn push(
        &self,
        request: &SyncRequest,
        source_apps: &AppMap,
        target: Option<&PushTarget<'_>>,
    ) -> Result<PushOutcome> {
        if !request.allows(HttpMethod::Put) {
            debug!("Skipping {}: PUT not supported", request.command);
            return Ok(PushOutcome::Skipped);
        }
        if request.command == CUSTOMIZE {
            debug!("Skipping {}: file uploads are not pushed", request.command);
            return Ok(PushOutcome::Skipped);
        }

        info!("{}", request.command);
        let mut payload = self.store.load(&request.app_name, &request.command)?;
        let mut staged = request.staged();

        if staged.command == SETTINGS {
            strip_settings_for_push(&mut payload);
        }

        if let Some(target) = target {
            if staged.command == FORM_FIELDS {
                if let Some(properties) = payload.get_mut("properties") {
                    remap_related_apps(
                        properties,
                        source_apps,
                        &request.connection.environment,
                        target.apps,
                        &target.connection.environment,
                    )?;
                }
            }
            let app_id = target
                .apps
                .get(&request.app_name)
                .cloned()
                .ok_or_else(|| ConfigError::AppNotFound {
                    app: request.app_name.clone(),
                    environment: target.connection.environment.clone(),
                })?;
            staged = staged.retarget(Arc::clone(&target.connection), app_id);
        }

        if let Some(obj) = payload.as_object_mut() {
            obj.insert("app".to_string(), staged.app_id.to_json());
        }

        self.put_with_recovery(&staged, &payload).await
    }

    async fn put_with_recovery(&self, request: &SyncRequest, payload: &Value) -> Result<PushOutcome> {
        let mut corrections = 0u32;
        let mut last_corrected: Option<(String, String, String)> = None;

        loop {
            let error = match self
                .api
                .send(HttpMethod::Put, &request.connection, &request.path(), payload)
                .await
            {
                Ok(_) => return Ok(PushOutcome::Pushed),
                Err(error) => error,
            };

            let Some(body) = error.api_error() else {
                return Err(error.into());
            };
            let action = classify(&request.command, &body);
            if action == RecoveryAction::Unhandled {
                return Err(error.into());
            }

            let failure = (body.code.clone(), body.message.clone(), body.errors.to_string());
            if last_corrected.as_ref() == Some(&failure) {
                return Err(PushError::Recurring {
                    command: request.command.clone(),
                    code: body.code,
                    source: error,
                }
                .into());
            }
            if corrections >= self.max_corrections {
                return Err(PushError::TooManyCorrections {
                    command: request.command.clone(),
                    attempts: corrections,
                    source: error,
                }
                .into());
            }

            match self.correct(request, payload, action).await? {
                Correction::Applied => {
                    corrections += 1;
                    last_corrected = Some(failure);
                    debug!("Retrying {} after correction {}", request.command, corrections);
                }
                Correction::Skipped => return Ok(PushOutcome::Skipped),
                Correction::Declined => {
                    return Err(PushError::Declined {
                        command: request.command.clone(),
                        source: error,
                    }
                    .into())
                }
                Correction::NotApplicable => return Err(error.into()),
            }
        }
    }

    fn target_label(request: &SyncRequest) -> String {
        format!("{}.{}", request.connection.environment, request.app_name)
    }

    async fn correct(&self, request: &SyncRequest, payload: &Value, action: RecoveryAction) -> Result<Correction> {
        match action {
            RecoveryAction::AddField { code } => self.add_field(request, payload, &code).await,
            RecoveryAction::DeleteRootFields { codes } => {
                let question = format!("Delete fields [{}] from {}?", codes.join(", "), Self::target_label(request));
                if !self.prompter.confirm(&question)? {
                    return Ok(Correction::Declined);
                }
                self.delete_fields(request, &codes).await?;
                Ok(Correction::Applied)
            }
            RecoveryAction::DeleteSubtableFields { subtable } => {
                self.delete_subtable_fields(request, payload, &subtable).await
            }
            RecoveryAction::SkipWithConfirmation { reason } => {
                let question = format!("[{}] {} Skip request?", VIEWS, reason);
                if !self.prompter.confirm(&question)? {
                    return Ok(Correction::Declined);
                }
                ui::print_skip(VIEWS, None);
                Ok(Correction::Skipped)
            }
            RecoveryAction::Unhandled => Ok(Correction::NotApplicable),
        }
    }

    async fn add_field(&self, request: &SyncRequest, payload: &Value, code: &str) -> Result<Correction> {
        let Some((key, property, label)) = field_definition(payload, code) else {
            ui::print_warning(&format!("Field {} is not defined locally", code));
            return Ok(Correction::NotApplicable);
        };

        let question = format!("Add field [{}] to {}?", label, Self::target_label(request));
        if !self.prompter.confirm(&question)? {
            return Ok(Correction::Declined);
        }

        let mut properties = Map::new();
        properties.insert(key, property);
        let body = json!({
            "app": request.app_id.to_json(),
            "properties": properties,
        });
        let fields = request.with_command(FORM_FIELDS);
        self.api
            .send(HttpMethod::Post, &fields.connection, &fields.path(), &body)
            .await?;
        Ok(Correction::Applied)
    }

    async fn delete_fields(&self, request: &SyncRequest, codes: &[String]) -> Result<()> {
        let body = json!({
            "app": request.app_id.to_json(),
            "fields": codes,
        });
        let fields = request.with_command(FORM_FIELDS);
        self.api
            .send(HttpMethod::Delete, &fields.connection, &fields.path(), &body)
            .await?;
        Ok(())
    }

    async fn delete_subtable_fields(&self, request: &SyncRequest, payload: &Value, subtable: &str) -> Result<Correction> {
        let layout = request.with_command(FORM_LAYOUT);
        let remote = self
            .api
            .get(&layout.connection, &layout.path(), &layout.query())
            .await?;

        let local_codes = subtable_codes(payload, subtable);
        let stale: Vec<String> = subtable_codes(&remote, subtable)
            .into_iter()
            .filter(|code| !local_codes.contains(code))
            .collect();
        if stale.is_empty() {
            return Ok(Correction::NotApplicable);
        }

        let listed: Vec<String> = stale.iter().map(|code| format!("{}.{}", subtable, code)).collect();
        let question = format!("Delete fields [{}] from {}?", listed.join(", "), Self::target_label(request));
        if !self.prompter.confirm(&question)? {
            return Ok(Correction::Declined);
        }
        self.delete_fields(request, &stale).await?;
        Ok(Correction::Applied)
    }
}

/// Definition of a field to create remotely: `(properties key, property,
/// display label)`. A field inside a subtable is wrapped in its table.
fn field_definition(payload: &Value, code: &str) -> Option<(String, Value, String)> {
    let properties = payload.get("properties")?.as_object()?;
    if let Some(property) = properties.get(code) {
        return Some((code.to_string(), property.clone(), code.to_string()));
    }

    properties.iter().find_map(|(table_code, table)| {
        if table.get("type").and_then(Value::as_str) != Some("SUBTABLE") {
            return None;
        }
        let inner = table.get("fields")?.get(code)?.clone();
        let mut wrapped = table.clone();
        let mut fields = Map::new();
        fields.insert(code.to_string(), inner);
        wrapped
            .as_object_mut()?
            .insert("fields".to_string(), Value::Object(fields));
        Some((table_code.clone(), wrapped, format!("{}.{}", table_code, code)))
    })
}

/// Field codes laid out inside one subtable of a layout document
fn subtable_codes(layout: &Value, subtable: &str) -> Vec<String> {
    layout
        .get("layout")
        .and_then(Value::as_array)
        .and_then(|rows| {
            rows.iter()
                .find(|row| row.get("code").and_then(Value::as_str) == Some(subtable))
        })
        .and_then(|row| row.get("fields"))
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("code").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
