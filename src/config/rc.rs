//! `.ginuerc` discovery and parsing
//!
//! The rc file mirrors the command-line flags. Its root object is either the
//! single environment, or holds defaults for the named environments under
//! `env`:
//!
//! ```yaml
//! location: kintone
//! fileType: js
//! env:
//!   dev:
//!     domain: dev.cybozu.com
//!     app: { orders: 10, customers: 11 }
//!   prod:
//!     location: production
//!     domain: prod.cybozu.com
//!     app: { orders: 20, customers: 21 }
//! ```

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::domain::app::AppSpec;
use crate::domain::catalog::CommandCatalog;
use crate::domain::descriptor::{FileType, ProxySetting};
use crate::error::ConfigError;

/// Candidate file names, in lookup order within each directory
pub const RC_FILE_NAMES: [&str; 4] = [".ginuerc", ".ginuerc.json", ".ginuerc.yaml", ".ginuerc.yml"];

/// One layer of environment settings (rc entry or command line); every
/// field is optional so layers can be merged field by field
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSettings {
    pub location: Option<PathBuf>,
    #[serde(skip)]
    pub env_location: Option<PathBuf>,
    #[serde(skip)]
    pub environment: Option<String>,

    pub domain: Option<String>,
    #[serde(alias = "user")]
    pub username: Option<String>,
    pub password: Option<String>,
    pub oauth: Option<bool>,
    pub basic: Option<String>,
    pub pfx_filepath: Option<PathBuf>,
    pub pfx_password: Option<String>,
    pub proxy: Option<ProxySetting>,

    pub app: Option<AppSpec>,
    pub app_name: Option<String>,
    #[serde(alias = "guestSpaceId", default, deserialize_with = "string_or_number")]
    pub guest: Option<String>,

    pub file_type: Option<FileType>,
    pub preview: Option<bool>,
    pub alt: Option<bool>,
    pub acl: Option<bool>,
    #[serde(alias = "field_acl")]
    pub field_acl: Option<bool>,
    pub download_js: Option<bool>,

    pub commands: Option<CommandCatalog>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub exclude: Option<Vec<String>>,
}

impl EnvSettings {
    /// Field-by-field merge: values present in `self` win
    pub fn merge(self, fallback: &EnvSettings) -> EnvSettings {
        let fallback = fallback.clone();
        EnvSettings {
            location: self.location.or(fallback.location),
            env_location: self.env_location.or(fallback.env_location),
            environment: self.environment.or(fallback.environment),
            domain: self.domain.or(fallback.domain),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            oauth: self.oauth.or(fallback.oauth),
            basic: self.basic.or(fallback.basic),
            pfx_filepath: self.pfx_filepath.or(fallback.pfx_filepath),
            pfx_password: self.pfx_password.or(fallback.pfx_password),
            proxy: self.proxy.or(fallback.proxy),
            app: self.app.or(fallback.app),
            app_name: self.app_name.or(fallback.app_name),
            guest: self.guest.or(fallback.guest),
            file_type: self.file_type.or(fallback.file_type),
            preview: self.preview.or(fallback.preview),
            alt: self.alt.or(fallback.alt),
            acl: self.acl.or(fallback.acl),
            field_acl: self.field_acl.or(fallback.field_acl),
            download_js: self.download_js.or(fallback.download_js),
            commands: self.commands.or(fallback.commands),
            exclude: self.exclude.or(fallback.exclude),
        }
    }

    /// Inherit the root-level defaults a named environment leaves unset
    fn inherit(mut self, root: &EnvSettings) -> EnvSettings {
        self.file_type = self.file_type.or(root.file_type);
        self.preview = self.preview.or(root.preview);
        self.alt = self.alt.or(root.alt);
        self.oauth = self.oauth.or(root.oauth);
        self.download_js = self.download_js.or(root.download_js);
        if self.commands.is_none() {
            self.commands = root.commands.clone();
        }
        if self.proxy.is_none() {
            self.proxy = root.proxy.clone();
        }
        self
    }

    /// Whether any connection-identifying field is set
    pub fn identifies_environment(&self) -> bool {
        self.domain.is_some()
            || self.username.is_some()
            || self.password.is_some()
            || self.app.is_some()
            || self.guest.is_some()
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }
    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    }))
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<String>>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }
    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::One(s) => vec![s],
        Raw::Many(v) => v,
    }))
}

/// Parsed rc file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RcConfig {
    #[serde(flatten)]
    pub root: EnvSettings,
    #[serde(default)]
    pub env: Option<BTreeMap<String, EnvSettings>>,
}

impl RcConfig {
    /// Find the nearest rc file from `start` up to the filesystem root
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            RC_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Discover and load; no rc file means one empty environment
    pub fn load_from(start: &Path) -> Result<Self, ConfigError> {
        match Self::discover(start) {
            Some(path) => {
                debug!("Using {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let parse_error = |message: String| ConfigError::ParseError {
            path: display.clone(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| parse_error(e.to_string()))?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json {
            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
            match value {
                serde_json::Value::Array(_) => Err(ConfigError::TopLevelArray { path: display.clone() }),
                serde_json::Value::Null => Ok(Self::default()),
                value => serde_json::from_value(value).map_err(|e| parse_error(e.to_string())),
            }
        } else {
            let value: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
            match value {
                serde_yaml::Value::Sequence(_) => Err(ConfigError::TopLevelArray { path: display.clone() }),
                serde_yaml::Value::Null => Ok(Self::default()),
                value => serde_yaml::from_value(value).map_err(|e| parse_error(e.to_string())),
            }
        }
    }

    /// Environments defined by the file, with root defaults applied
    pub fn environments(&self) -> Vec<EnvSettings> {
        let Some(env) = &self.env else {
            return vec![self.root.clone()];
        };

        env.iter()
            .map(|(name, settings)| {
                let mut settings = settings.clone();
                settings.environment = Some(name.clone());
                settings.env_location = settings.location.take();
                settings.location = self.root.location.clone();
                settings.inherit(&self.root)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::app::AppId;

    const MULTI: &str = r#"
location: kintone
fileType: js
alt: true
env:
  dev:
    domain: dev.cybozu.com
    guest: 5
    app: { orders: 10, customers: 11 }
    exclude: app/acl.json
  prod:
    location: production
    domain: prod.cybozu.com
    alt: false
    app: { orders: 20, customers: 21 }
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_environments_inherit_root() {
        let dir = tempfile::tempdir().unwrap();
        let rc = RcConfig::load(&write(dir.path(), ".ginuerc.yml", MULTI)).unwrap();
        let envs = rc.environments();
        assert_eq!(envs.len(), 2);

        let dev = &envs[0];
        assert_eq!(dev.environment.as_deref(), Some("dev"));
        assert_eq!(dev.location, Some(PathBuf::from("kintone")));
        assert_eq!(dev.env_location, None);
        assert_eq!(dev.file_type, Some(FileType::Js));
        assert_eq!(dev.alt, Some(true));
        assert_eq!(dev.guest.as_deref(), Some("5"));
        assert_eq!(dev.exclude, Some(vec!["app/acl.json".to_string()]));

        let prod = &envs[1];
        assert_eq!(prod.env_location, Some(PathBuf::from("production")));
        assert_eq!(prod.location, Some(PathBuf::from("kintone")));
        assert_eq!(prod.alt, Some(false));
        assert_eq!(prod.app.as_ref().unwrap().to_map()["orders"], AppId::new("20"));
    }

    #[test]
    fn test_single_environment_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            ".ginuerc.json",
            r#"{ "domain": "a.cybozu.com", "username": "alice", "app": [1, 2], "field_acl": true }"#,
        );
        let envs = RcConfig::load(&path).unwrap().environments();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].domain.as_deref(), Some("a.cybozu.com"));
        assert_eq!(envs[0].field_acl, Some(true));
        assert!(!envs[0].app.as_ref().unwrap().is_dictionary());
    }

    #[test]
    fn test_top_level_array_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), ".ginuerc", "- domain: a.cybozu.com\n");
        assert!(matches!(RcConfig::load(&path), Err(ConfigError::TopLevelArray { .. })));
    }

    #[test]
    fn test_invalid_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), ".ginuerc.json", "{ nope");
        assert!(matches!(RcConfig::load(&path), Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".ginuerc.yaml", "domain: a.cybozu.com\n");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let found = RcConfig::discover(&nested).unwrap();
        assert_eq!(found, dir.path().join(".ginuerc.yaml"));
        let rc = RcConfig::load_from(&nested).unwrap();
        assert_eq!(rc.root.domain.as_deref(), Some("a.cybozu.com"));
    }

    #[test]
    fn test_merge_prefers_self() {
        let cli = EnvSettings {
            domain: Some("a.example.com".to_string()),
            ..Default::default()
        };
        let rc = EnvSettings {
            domain: Some("b.example.com".to_string()),
            username: Some("alice".to_string()),
            ..Default::default()
        };
        let merged = cli.merge(&rc);
        assert_eq!(merged.domain.as_deref(), Some("a.example.com"));
        assert_eq!(merged.username.as_deref(), Some("alice"));
    }
}
