//! Environment descriptor types
//!
//! An [`EnvironmentDescriptor`] is the fully resolved view of one named
//! environment for the duration of a run: where it lives remotely, how to
//! authenticate, which apps it holds and where its files go locally.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::app::AppMap;
use super::catalog::CommandCatalog;
use super::layout::LocalLayout;
use super::request::Connection;

/// Top-level operation requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pull,
    Push,
    Reset,
    Deploy,
    Erd,
    Diff,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Reset => "reset",
            Self::Deploy => "deploy",
            Self::Erd => "erd",
            Self::Diff => "diff",
        }
    }

    /// Operations that change remote state and therefore need exactly one
    /// environment plus an operator confirmation
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Push | Self::Reset | Self::Deploy)
    }

    /// Whether `<env>:<pushTarget>` is accepted
    pub fn allows_push_target(&self) -> bool {
        matches!(self, Self::Push | Self::Diff)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// On-disk representation of pulled settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    #[default]
    Json,
    Js,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Js => "js",
        }
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "js" => Ok(Self::Js),
            other => Err(format!("invalid file type '{}' (expected 'json' or 'js')", other)),
        }
    }
}

/// Proxy server, either as a URL or as discrete parts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProxySetting {
    Url(String),
    Parts {
        #[serde(default = "default_proxy_protocol")]
        protocol: String,
        #[serde(default)]
        auth: Option<String>,
        hostname: String,
        #[serde(default)]
        port: Option<u16>,
    },
}

fn default_proxy_protocol() -> String {
    "http".to_string()
}

impl ProxySetting {
    pub fn to_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Parts {
                protocol,
                auth,
                hostname,
                port,
            } => {
                let protocol = protocol.trim_end_matches(':');
                let auth = auth
                    .as_deref()
                    .map(|a| format!("{}@", a))
                    .unwrap_or_default();
                let port = port.map(|p| format!(":{}", p)).unwrap_or_default();
                format!("{}://{}{}{}", protocol, auth, hostname, port)
            }
        }
    }
}

/// PKCS#12 client certificate used for TLS client authentication
#[derive(Debug, Clone, PartialEq)]
pub struct ClientCertificate {
    pub path: PathBuf,
    pub password: String,
}

/// HTTP Basic credentials in front of the kintone domain
#[derive(Debug, Clone, PartialEq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl BasicAuth {
    /// Parse `user:password`; `None` when the password part is absent
    pub fn parse(raw: &str) -> Option<Self> {
        let (user, password) = raw.split_once(':')?;
        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

/// How requests authenticate against kintone itself
#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    Password { username: String, password: String },
    OAuth { token: String },
}

/// Exactly one kintone auth form plus optional Basic auth
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub auth: Auth,
    pub basic: Option<BasicAuth>,
}

impl Credentials {
    pub fn is_oauth(&self) -> bool {
        matches!(self.auth, Auth::OAuth { .. })
    }
}

/// Per-run switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunFlags {
    pub preview: bool,
    pub acl: bool,
    pub field_acl: bool,
    pub alt: bool,
    pub download_js: bool,
}

/// One fully resolved environment
#[derive(Debug, Clone)]
pub struct EnvironmentDescriptor {
    pub environment: Option<String>,
    pub layout: LocalLayout,
    pub domain: String,
    pub credentials: Credentials,
    pub guest_space_id: Option<String>,
    pub proxy: Option<ProxySetting>,
    pub client_certificate: Option<ClientCertificate>,
    pub apps: AppMap,
    pub app_name: Option<String>,
    pub flags: RunFlags,
    pub exclude: Vec<String>,
    pub commands: Option<CommandCatalog>,
    /// Promotion target; always one level deep
    pub push_target: Option<Box<EnvironmentDescriptor>>,
}

impl EnvironmentDescriptor {
    /// Name shown to the operator: the environment name, else the domain
    pub fn label(&self) -> &str {
        self.environment.as_deref().unwrap_or(&self.domain)
    }

    pub fn connection(&self) -> Connection {
        Connection {
            environment: self.label().to_string(),
            domain: self.domain.clone(),
            guest_space_id: self.guest_space_id.clone(),
            credentials: self.credentials.clone(),
        }
    }

    /// Apps in scope, honoring `--appName`
    pub fn selected_apps(&self) -> impl Iterator<Item = (&String, &super::app::AppId)> {
        let filter = self.app_name.as_deref();
        self.apps
            .iter()
            .filter(move |(name, _)| filter.map_or(true, |f| f == name.as_str()))
    }

    /// Command catalog in effect after exclusions
    pub fn catalog(&self) -> Result<CommandCatalog, crate::error::ConfigError> {
        CommandCatalog::for_run(self.commands.as_ref(), &self.exclude)
    }
}
