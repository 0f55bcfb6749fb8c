//! kintone REST command catalog and walker
//!
//! The catalog maps each app-settings endpoint to its query parameter, the
//! HTTP methods it supports and whether it has a staged ("preview") variant.
//! The walker expands one app into the sync requests a run has to perform.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::app::AppId;
use super::request::{Connection, SyncRequest};
use crate::error::ConfigError;

pub const APP: &str = "app.json";
pub const APP_ACL: &str = "app/acl.json";
pub const CUSTOMIZE: &str = "app/customize.json";
pub const FORM_FIELDS: &str = "app/form/fields.json";
pub const FORM_LAYOUT: &str = "app/form/layout.json";
pub const REPORTS: &str = "app/reports.json";
pub const SETTINGS: &str = "app/settings.json";
pub const STATUS: &str = "app/status.json";
pub const VIEWS: &str = "app/views.json";
pub const FIELD_ACL: &str = "field/acl.json";
pub const RECORD_ACL: &str = "record/acl.json";
pub const DEPLOY: &str = "app/deploy.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub app_param: String,
    #[serde(default)]
    pub has_preview: bool,
    pub methods: Vec<HttpMethod>,
    #[serde(default)]
    pub skip_oauth: bool,
}

impl CommandSpec {
    fn new(app_param: &str, has_preview: bool, methods: &[HttpMethod]) -> Self {
        Self {
            app_param: app_param.to_string(),
            has_preview,
            methods: methods.to_vec(),
            skip_oauth: false,
        }
    }
}

/// Command name → entry, iterated in name order (fields before layout)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CommandCatalog(BTreeMap<String, CommandSpec>);

impl CommandCatalog {
    /// The endpoints ginue syncs by default
    pub fn builtin() -> Self {
        use HttpMethod::{Get, Put};
        let get_put = [Get, Put];

        let mut commands = BTreeMap::new();
        commands.insert(APP.to_string(), CommandSpec::new("id", false, &[Get]));
        commands.insert(APP_ACL.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(CUSTOMIZE.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(FORM_FIELDS.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(FORM_LAYOUT.to_string(), CommandSpec::new("app", true, &get_put));
        let mut reports = CommandSpec::new("app", true, &get_put);
        reports.skip_oauth = true;
        commands.insert(REPORTS.to_string(), reports);
        commands.insert(SETTINGS.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(STATUS.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(VIEWS.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(FIELD_ACL.to_string(), CommandSpec::new("app", true, &get_put));
        commands.insert(RECORD_ACL.to_string(), CommandSpec::new("app", true, &get_put));
        Self(commands)
    }

    /// Catalog for one run: a custom catalog (or the built-in one) minus the
    /// operator's exclusions. Excluding an unknown command is fatal.
    pub fn for_run(custom: Option<&CommandCatalog>, exclude: &[String]) -> Result<Self, ConfigError> {
        let mut catalog = custom.cloned().unwrap_or_else(Self::builtin);
        for name in exclude {
            if catalog.0.remove(name).is_none() {
                return Err(ConfigError::UnknownCommand { name: name.clone() });
            }
        }
        Ok(catalog)
    }

    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CommandSpec)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Result of walking one catalog entry
#[derive(Debug, Clone)]
pub enum Planned {
    Sync(SyncRequest),
    /// Endpoint not reachable with an OAuth token
    ForbiddenViaOauth(String),
}

/// Expand one app into its sync requests.
///
/// Every command yields its production request; when `with_preview` is set
/// and the entry has a staged variant, the preview request follows it.
pub fn expand(
    catalog: &CommandCatalog,
    connection: &Arc<Connection>,
    app_name: &str,
    app_id: &AppId,
    with_preview: bool,
) -> Vec<Planned> {
    let oauth = connection.credentials.is_oauth();
    let mut planned = Vec::new();

    for (name, spec) in catalog.iter() {
        if oauth && spec.skip_oauth {
            planned.push(Planned::ForbiddenViaOauth(name.clone()));
            continue;
        }

        let request = SyncRequest {
            connection: Arc::clone(connection),
            app_name: app_name.to_string(),
            app_id: app_id.clone(),
            command: name.clone(),
            preview: false,
            app_param: spec.app_param.clone(),
            methods: spec.methods.clone(),
        };
        if with_preview && spec.has_preview {
            let staged = request.staged();
            planned.push(Planned::Sync(request));
            planned.push(Planned::Sync(staged));
        } else {
            planned.push(Planned::Sync(request));
        }
    }
    planned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::{Auth, Credentials};

    fn connection(oauth: bool) -> Arc<Connection> {
        let auth = if oauth {
            Auth::OAuth {
                token: "token".to_string(),
            }
        } else {
            Auth::Password {
                username: "alice".to_string(),
                password: "secret".to_string(),
            }
        };
        Arc::new(Connection {
            environment: "dev".to_string(),
            domain: "dev.cybozu.com".to_string(),
            guest_space_id: None,
            credentials: Credentials { auth, basic: None },
        })
    }

    fn requests(planned: &[Planned]) -> Vec<(String, bool)> {
        planned
            .iter()
            .filter_map(|p| match p {
                Planned::Sync(r) => Some((r.command.clone(), r.preview)),
                Planned::ForbiddenViaOauth(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_exclude_unknown_command_is_fatal() {
        let err = CommandCatalog::for_run(None, &["app/nope.json".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCommand { .. }));
    }

    #[test]
    fn test_exclude_removes_command() {
        let catalog = CommandCatalog::for_run(None, &[VIEWS.to_string()]).unwrap();
        assert!(catalog.get(VIEWS).is_none());
        assert_eq!(catalog.len(), CommandCatalog::builtin().len() - 1);
    }

    #[test]
    fn test_expand_without_preview() {
        let catalog = CommandCatalog::builtin();
        let planned = expand(&catalog, &connection(false), "orders", &AppId::new("10"), false);
        let requests = requests(&planned);
        assert_eq!(requests.len(), catalog.len());
        assert!(requests.iter().all(|(_, preview)| !preview));
    }

    #[test]
    fn test_expand_with_preview_skips_entries_without_variant() {
        let catalog = CommandCatalog::builtin();
        let planned = expand(&catalog, &connection(false), "orders", &AppId::new("10"), true);
        let requests = requests(&planned);
        assert!(requests.contains(&(APP.to_string(), false)));
        assert!(!requests.contains(&(APP.to_string(), true)));
        assert!(requests.contains(&(FORM_FIELDS.to_string(), true)));
        assert_eq!(requests.len(), catalog.len() * 2 - 1);
    }

    #[test]
    fn test_expand_oauth_forbidden() {
        let planned = expand(
            &CommandCatalog::builtin(),
            &connection(true),
            "orders",
            &AppId::new("10"),
            false,
        );
        assert!(planned
            .iter()
            .any(|p| matches!(p, Planned::ForbiddenViaOauth(name) if name == REPORTS)));
    }

    #[test]
    fn test_custom_catalog() {
        let custom: CommandCatalog = serde_json::from_value(serde_json::json!({
            "app/form/fields.json": { "appParam": "app", "hasPreview": true, "langParam": "lang", "methods": ["GET"] }
        }))
        .unwrap();
        let catalog = CommandCatalog::for_run(Some(&custom), &[]).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(FORM_FIELDS).unwrap().methods, vec![HttpMethod::Get]);
    }
}
