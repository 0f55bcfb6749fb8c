//! Credential resolution
//!
//! Turns merged environment settings into a fully resolved
//! [`EnvironmentDescriptor`]. Each credential field is taken from the first
//! source that has it:
//!
//! 1. value already present (command line or rc)
//! 2. netrc entry for the domain (never in OAuth mode; its password only
//!    when its login is the resolved username)
//! 3. `GINUE_*` environment variable
//! 4. interactive prompt (hidden input for secrets)
//!
//! Non-secret values are echoed first so the operator can tell which
//! environment is being asked about.

use anyhow::Result;

use crate::config::{layout_of, EnvSettings, EnvironmentSpec};
use crate::domain::app::AppSpec;
use crate::domain::descriptor::{
    Auth, BasicAuth, ClientCertificate, Credentials, EnvironmentDescriptor, ProxySetting, RunFlags,
};
use crate::error::ConfigError;
use crate::infrastructure::netrc::{CredentialStore, NetrcMachine};
use crate::infrastructure::prompt::Prompter;
use crate::ui;

pub const ENV_USERNAME: &str = "GINUE_USERNAME";
pub const ENV_PASSWORD: &str = "GINUE_PASSWORD";
pub const ENV_BASIC: &str = "GINUE_BASIC";
pub const ENV_PFX_FILEPATH: &str = "GINUE_PFX_FILEPATH";
pub const ENV_PFX_PASSWORD: &str = "GINUE_PFX_PASSWORD";
pub const ENV_ACCESS_TOKEN: &str = "GINUE_ACCESS_TOKEN";

const HIDDEN: &str = "[hidden]";

type EnvLookup<'a> = Box<dyn Fn(&str) -> Option<String> + Send + Sync + 'a>;

pub struct CredentialResolver<'a> {
    store: &'a CredentialStore,
    prompter: &'a dyn Prompter,
    env: EnvLookup<'a>,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(store: &'a CredentialStore, prompter: &'a dyn Prompter) -> Self {
        Self {
            store,
            prompter,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the process environment lookup
    #[cfg(test)]
    pub fn with_env(mut self, env: impl Fn(&str) -> Option<String> + Send + Sync + 'a) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Resolve an environment and, when present, its push target
    pub fn resolve(&self, spec: &EnvironmentSpec) -> Result<EnvironmentDescriptor> {
        let (mut descriptor, named) = self.resolve_settings(&spec.settings)?;

        if let Some(target) = &spec.push_target {
            let (target, target_named) = self.resolve_settings(target)?;
            for (side, is_named) in [(&descriptor, named), (&target, target_named)] {
                if !is_named {
                    return Err(ConfigError::AppMapNotDictionary {
                        environment: side.label().to_string(),
                    }
                    .into());
                }
            }
            descriptor.push_target = Some(Box::new(target));
        }
        Ok(descriptor)
    }

    fn env_var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|v| !v.is_empty())
    }

    fn ask(&self, name: &str) -> Result<String> {
        let answer = self.prompter.input(&format!("Enter your kintone {}:", name))?;
        required(name, answer)
    }

    fn ask_secret(&self, name: &str) -> Result<String> {
        let answer = self.prompter.secret(&format!("Enter your kintone {}:", name))?;
        required(name, answer)
    }

    fn resolve_settings(&self, settings: &EnvSettings) -> Result<(EnvironmentDescriptor, bool)> {
        for (name, value) in echo_entries(settings) {
            ui::print_option(name, &value);
        }

        let proxy = settings.proxy.clone().map(|proxy| self.fill_proxy_auth(proxy));

        let domain = match non_empty(settings.domain.clone()) {
            Some(domain) => domain,
            None => self.ask("domain")?,
        };

        let oauth = settings.oauth.unwrap_or(false);
        let machine = if oauth { None } else { self.store.lookup(&domain) };

        let mut basic = self.resolve_basic(settings.basic.as_deref(), machine)?;

        let auth = if oauth {
            let token = match self.env_var(ENV_ACCESS_TOKEN) {
                Some(token) => token,
                None => self.ask_secret("OAuth access token")?,
            };
            Auth::OAuth { token }
        } else {
            let username = match non_empty(settings.username.clone())
                .or_else(|| machine.and_then(|m| m.login.clone()))
                .or_else(|| self.env_var(ENV_USERNAME))
            {
                Some(username) => username,
                None => self.ask("username")?,
            };
            // A netrc password only belongs to the netrc login
            let netrc_password = machine
                .filter(|m| m.login.as_deref().map_or(true, |login| login == username))
                .and_then(|m| m.password.clone());
            let password = match non_empty(settings.password.clone())
                .or(netrc_password)
                .or_else(|| self.env_var(ENV_PASSWORD))
            {
                Some(password) => password,
                None => self.ask_secret("password")?,
            };
            if basic.is_none() {
                if let Some(raw) = self.env_var(ENV_BASIC) {
                    basic = Some(BasicAuth::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                        field: ENV_BASIC.to_string(),
                        value: HIDDEN.to_string(),
                    })?);
                }
            }
            Auth::Password { username, password }
        };

        let client_certificate = self.resolve_certificate(settings)?;
        if proxy.is_some() && client_certificate.is_some() {
            return Err(ConfigError::ProxyWithClientCertificate.into());
        }

        let app = match &settings.app {
            Some(app) => app.clone(),
            None => AppSpec::parse(&self.ask("app")?)?,
        };
        ui::print_separator();

        let descriptor = EnvironmentDescriptor {
            environment: settings.environment.clone(),
            layout: layout_of(settings),
            domain,
            credentials: Credentials { auth, basic },
            guest_space_id: non_empty(settings.guest.clone()),
            proxy,
            client_certificate,
            apps: app.to_map(),
            app_name: settings.app_name.clone(),
            flags: RunFlags {
                preview: settings.preview.unwrap_or(false),
                acl: settings.acl.unwrap_or(false),
                field_acl: settings.field_acl.unwrap_or(false),
                alt: settings.alt.unwrap_or(false),
                download_js: settings.download_js.unwrap_or(false),
            },
            exclude: settings.exclude.clone().unwrap_or_default(),
            commands: settings.commands.clone(),
            push_target: None,
        };
        Ok((descriptor, app.is_dictionary()))
    }

    /// Fill missing proxy credentials from the netrc entry of the proxy host
    fn fill_proxy_auth(&self, proxy: ProxySetting) -> ProxySetting {
        match proxy {
            ProxySetting::Parts {
                protocol,
                auth: None,
                hostname,
                port,
            } => {
                let auth = self.store.lookup(&hostname).and_then(|m| match (&m.login, &m.password) {
                    (Some(login), Some(password)) => Some(format!("{}:{}", login, password)),
                    _ => None,
                });
                ProxySetting::Parts {
                    protocol,
                    auth,
                    hostname,
                    port,
                }
            }
            other => other,
        }
    }

    /// `user:password` is complete; a bare user (from the flag or the netrc
    /// account) prompts for the password
    fn resolve_basic(&self, raw: Option<&str>, machine: Option<&NetrcMachine>) -> Result<Option<BasicAuth>> {
        let raw = raw
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| machine.and_then(|m| m.account.clone()));
        let Some(raw) = raw else {
            return Ok(None);
        };
        if let Some(basic) = BasicAuth::parse(&raw) {
            return Ok(Some(basic));
        }
        let password = self.ask_secret("Basic Authentication password")?;
        Ok(Some(BasicAuth { user: raw, password }))
    }

    fn resolve_certificate(&self, settings: &EnvSettings) -> Result<Option<ClientCertificate>> {
        let path = settings
            .pfx_filepath
            .clone()
            .or_else(|| self.env_var(ENV_PFX_FILEPATH).map(Into::into));
        let Some(path) = path else {
            return Ok(None);
        };
        let password = match non_empty(settings.pfx_password.clone()).or_else(|| self.env_var(ENV_PFX_PASSWORD)) {
            Some(password) => password,
            None => self.ask_secret("client certificate password")?,
        };
        Ok(Some(ClientCertificate { path, password }))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn required(name: &str, answer: String) -> Result<String> {
    if answer.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: name.to_string(),
        }
        .into());
    }
    Ok(answer)
}

fn describe_apps(app: &AppSpec) -> String {
    app.to_map()
        .iter()
        .map(|(name, id)| {
            if name == id.as_str() {
                name.clone()
            } else {
                format!("{}={}", name, id)
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Option values shown to the operator, secrets hidden
pub fn echo_entries(settings: &EnvSettings) -> Vec<(&'static str, String)> {
    let mut entries = Vec::new();
    let mut push = |name: &'static str, value: Option<String>| {
        if let Some(value) = value {
            entries.push((name, value));
        }
    };

    let path = |p: &Option<std::path::PathBuf>| p.as_ref().map(|p| p.display().to_string());
    let flag = |b: Option<bool>| b.filter(|b| *b).map(|b| b.to_string());

    push("location", path(&settings.location));
    push("envLocation", path(&settings.env_location));
    push("environment", settings.environment.clone());
    push(
        "proxy",
        settings.proxy.as_ref().map(|p| match p {
            ProxySetting::Parts { hostname, .. } => hostname.clone(),
            ProxySetting::Url(_) => HIDDEN.to_string(),
        }),
    );
    push("domain", settings.domain.clone());
    push("username", settings.username.clone());
    push("password", settings.password.as_ref().map(|_| HIDDEN.to_string()));
    push("basic", settings.basic.as_ref().map(|_| HIDDEN.to_string()));
    push("oauth", flag(settings.oauth));
    push("pfxFilepath", path(&settings.pfx_filepath));
    push("pfxPassword", settings.pfx_password.as_ref().map(|_| HIDDEN.to_string()));
    push("app", settings.app.as_ref().map(describe_apps));
    push("appName", settings.app_name.clone());
    push("guestSpaceId", settings.guest.clone());
    push("fileType", settings.file_type.map(|t| t.as_str().to_string()));
    push("preview", flag(settings.preview));
    push("alt", flag(settings.alt));
    push("acl", flag(settings.acl));
    push("field_acl", flag(settings.field_acl));
    push("downloadJs", flag(settings.download_js));
    push("exclude", settings.exclude.as_ref().map(|e| e.join(", ")));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AppId;
    use crate::infrastructure::prompt::testing::ScriptedPrompter;
    use std::collections::HashMap;
    use std::io::Write;

    fn settings() -> EnvSettings {
        EnvSettings {
            environment: Some("dev".to_string()),
            domain: Some("dev.cybozu.com".to_string()),
            app: Some(AppSpec::parse("orders=10").unwrap()),
            ..Default::default()
        }
    }

    fn netrc(content: &str) -> (tempfile::NamedTempFile, CredentialStore) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        let store = CredentialStore::from_path(file.path());
        (file, store)
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + Send + Sync {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    fn password_of(descriptor: &EnvironmentDescriptor) -> (&str, &str) {
        match &descriptor.credentials.auth {
            Auth::Password { username, password } => (username, password),
            Auth::OAuth { .. } => panic!("expected password auth"),
        }
    }

    #[test]
    fn test_explicit_values_need_no_lookup() {
        let store = CredentialStore::empty();
        let prompter = ScriptedPrompter::new(&[]);
        let mut s = settings();
        s.username = Some("alice".to_string());
        s.password = Some("secret".to_string());
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[(ENV_USERNAME, "env-user")]));

        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s, push_target: None }).unwrap();
        assert_eq!(password_of(&descriptor), ("alice", "secret"));
        assert_eq!(descriptor.apps["orders"], AppId::new("10"));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn test_netrc_before_env_before_prompt() {
        let (_file, store) = netrc("machine dev.cybozu.com login netrc-user account basic:pass\n");
        let prompter = ScriptedPrompter::new(&["typed-password"]);
        let resolver = CredentialResolver::new(&store, &prompter)
            .with_env(vars(&[(ENV_USERNAME, "env-user")]));

        let descriptor = resolver
            .resolve(&EnvironmentSpec { settings: settings(), push_target: None })
            .unwrap();
        assert_eq!(password_of(&descriptor), ("netrc-user", "typed-password"));
        assert_eq!(descriptor.credentials.basic, BasicAuth::parse("basic:pass"));
        assert_eq!(prompter.asked(), vec!["Enter your kintone password:".to_string()]);
    }

    #[test]
    fn test_netrc_password_of_another_login_is_ignored() {
        let (_file, store) = netrc("machine dev.cybozu.com login bob password bob-pass\n");
        let prompter = ScriptedPrompter::new(&["typed-password"]);
        let mut s = settings();
        s.username = Some("alice".to_string());
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[]));

        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s.clone(), push_target: None }).unwrap();
        assert_eq!(password_of(&descriptor), ("alice", "typed-password"));

        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[(ENV_PASSWORD, "env-pass")]));
        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s, push_target: None }).unwrap();
        assert_eq!(password_of(&descriptor), ("alice", "env-pass"));
    }

    #[test]
    fn test_netrc_password_of_same_login_is_used() {
        let (_file, store) = netrc("machine dev.cybozu.com login alice password netrc-pass\n");
        let prompter = ScriptedPrompter::new(&[]);
        let mut s = settings();
        s.username = Some("alice".to_string());
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[(ENV_PASSWORD, "env-pass")]));

        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s, push_target: None }).unwrap();
        assert_eq!(password_of(&descriptor), ("alice", "netrc-pass"));
        assert!(prompter.asked().is_empty());
    }

    #[test]
    fn test_env_vars_fill_gaps() {
        let store = CredentialStore::empty();
        let prompter = ScriptedPrompter::new(&[]);
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
            (ENV_BASIC, "b:p"),
        ]));

        let descriptor = resolver
            .resolve(&EnvironmentSpec { settings: settings(), push_target: None })
            .unwrap();
        assert_eq!(password_of(&descriptor), ("env-user", "env-pass"));
        assert_eq!(descriptor.credentials.basic.unwrap().user, "b");
    }

    #[test]
    fn test_empty_prompt_is_fatal() {
        let store = CredentialStore::empty();
        let prompter = ScriptedPrompter::new(&[""]);
        let mut s = settings();
        s.domain = None;
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[]));

        let err = resolver
            .resolve(&EnvironmentSpec { settings: s, push_target: None })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::MissingField { field }) if field == "domain"
        ));
    }

    #[test]
    fn test_oauth_skips_netrc_and_uses_token() {
        let (_file, store) = netrc("machine dev.cybozu.com login netrc-user password netrc-pass\n");
        let prompter = ScriptedPrompter::new(&[]);
        let mut s = settings();
        s.oauth = Some(true);
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[(ENV_ACCESS_TOKEN, "tok")]));

        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s, push_target: None }).unwrap();
        assert_eq!(descriptor.credentials.auth, Auth::OAuth { token: "tok".to_string() });
    }

    #[test]
    fn test_basic_user_prompts_for_password() {
        let store = CredentialStore::empty();
        let prompter = ScriptedPrompter::new(&["basic-pass"]);
        let mut s = settings();
        s.username = Some("alice".to_string());
        s.password = Some("secret".to_string());
        s.basic = Some("gate".to_string());
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[]));

        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s, push_target: None }).unwrap();
        assert_eq!(
            descriptor.credentials.basic,
            Some(BasicAuth { user: "gate".to_string(), password: "basic-pass".to_string() })
        );
    }

    #[test]
    fn test_client_certificate_from_env() {
        let store = CredentialStore::empty();
        let prompter = ScriptedPrompter::new(&[]);
        let mut s = settings();
        s.username = Some("alice".to_string());
        s.password = Some("secret".to_string());
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[
            (ENV_PFX_FILEPATH, "/certs/client.pfx"),
            (ENV_PFX_PASSWORD, "pfx-pass"),
        ]));

        let descriptor = resolver.resolve(&EnvironmentSpec { settings: s.clone(), push_target: None }).unwrap();
        let certificate = descriptor.client_certificate.unwrap();
        assert_eq!(certificate.path, std::path::PathBuf::from("/certs/client.pfx"));
        assert_eq!(certificate.password, "pfx-pass");

        s.proxy = Some(ProxySetting::Url("http://proxy:8080".to_string()));
        let err = resolver.resolve(&EnvironmentSpec { settings: s, push_target: None }).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ProxyWithClientCertificate)
        ));
    }

    #[test]
    fn test_push_target_resolved_separately() {
        let (_file, store) = netrc(
            "machine dev.cybozu.com login dev-user password dev-pass\n\
             machine prod.cybozu.com login prod-user password prod-pass\n",
        );
        let prompter = ScriptedPrompter::new(&[]);
        let target = EnvSettings {
            environment: Some("prod".to_string()),
            domain: Some("prod.cybozu.com".to_string()),
            app: Some(AppSpec::parse("orders=20").unwrap()),
            ..Default::default()
        };
        let resolver = CredentialResolver::new(&store, &prompter).with_env(vars(&[]));

        let descriptor = resolver
            .resolve(&EnvironmentSpec {
                settings: settings(),
                push_target: Some(Box::new(target)),
            })
            .unwrap();
        let target = descriptor.push_target.as_ref().unwrap();
        assert_eq!(password_of(target), ("prod-user", "prod-pass"));
        assert_eq!(target.apps["orders"], AppId::new("20"));
    }

    #[test]
    fn test_echo_hides_secrets() {
        let mut s = settings();
        s.password = Some("secret".to_string());
        s.basic = Some("u:p".to_string());
        let entries = echo_entries(&s);
        assert!(entries.contains(&("password", "[hidden]".to_string())));
        assert!(entries.contains(&("basic", "[hidden]".to_string())));
        assert!(entries.contains(&("domain", "dev.cybozu.com".to_string())));
        assert!(!entries.iter().any(|(_, v)| v.contains("secret")));
    }
}
