//! netrc credential store
//!
//! Machine-level credentials keyed by host name. The file is `$NETRC` when set,
//! else `~/.netrc`; it is read on first lookup and a missing or unreadable
//! file simply yields no entries.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

/// One `machine` entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetrcMachine {
    pub login: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
}

/// Lazily parsed netrc file
#[derive(Debug, Default)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    machines: OnceLock<HashMap<String, NetrcMachine>>,
}

impl CredentialStore {
    /// Store backed by `$NETRC` or `$HOME/.netrc`
    pub fn from_env() -> Self {
        let path = env::var_os("NETRC")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".netrc")));
        Self {
            path,
            machines: OnceLock::new(),
        }
    }

    #[cfg(test)]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            machines: OnceLock::new(),
        }
    }

    /// Store with no entries
    #[cfg(test)]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entry for a host, if any
    pub fn lookup(&self, host: &str) -> Option<&NetrcMachine> {
        self.machines().get(host)
    }

    fn machines(&self) -> &HashMap<String, NetrcMachine> {
        self.machines.get_or_init(|| {
            let Some(path) = &self.path else {
                return HashMap::new();
            };
            match std::fs::read_to_string(path) {
                Ok(content) => parse(&content),
                Err(e) => {
                    debug!("No netrc at {}: {}", path.display(), e);
                    HashMap::new()
                }
            }
        })
    }
}

/// Parse netrc text; `default` entries and macros are ignored
pub fn parse(content: &str) -> HashMap<String, NetrcMachine> {
    let mut machines = HashMap::new();
    let mut current: Option<(String, NetrcMachine)> = None;
    let mut tokens = content.split_whitespace();

    while let Some(token) = tokens.next() {
        match token {
            "machine" => {
                if let Some((host, machine)) = current.take() {
                    machines.insert(host, machine);
                }
                if let Some(host) = tokens.next() {
                    current = Some((host.to_string(), NetrcMachine::default()));
                }
            }
            "default" => {
                if let Some((host, machine)) = current.take() {
                    machines.insert(host, machine);
                }
            }
            "login" | "password" | "account" => {
                let value = tokens.next().map(str::to_string);
                if let Some((_, machine)) = current.as_mut() {
                    match token {
                        "login" => machine.login = value,
                        "password" => machine.password = value,
                        _ => machine.account = value,
                    }
                }
            }
            _ => {}
        }
    }
    if let Some((host, machine)) = current {
        machines.insert(host, machine);
    }
    machines
}
