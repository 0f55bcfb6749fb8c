//! App identifiers and app maps
//!
//! An environment names its apps either as a plain list of IDs or as a
//! name → ID dictionary. Cross-environment pushes match apps by name, so only
//! the dictionary form can be promoted.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// Numeric kintone app ID, kept as text because the API accepts both forms
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AppId(String);

impl AppId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read an ID out of a JSON payload (`"10"` or `10`)
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self(s.clone())),
            Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AppId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => AppId(n.to_string()),
            Raw::Text(s) => AppId(s.trim().to_string()),
        })
    }
}

/// App name → app ID
pub type AppMap = BTreeMap<String, AppId>;

/// Find the name an environment gives to an app ID
pub fn name_of<'a>(apps: &'a AppMap, id: &AppId) -> Option<&'a str> {
    apps.iter()
        .find(|(_, app_id)| *app_id == id)
        .map(|(name, _)| name.as_str())
}

/// How an environment lists its apps
#[derive(Debug, Clone, PartialEq)]
pub enum AppSpec {
    /// Plain IDs; each app is named after its ID
    Ids(Vec<AppId>),
    /// Name → ID dictionary
    Named(AppMap),
}

impl AppSpec {
    /// Parse the `--app` syntax: `1,2,3` or `orders=10,customers=11`
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let entries: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if entries.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "app".to_string(),
                value: raw.to_string(),
            });
        }

        if !entries.iter().any(|e| e.contains('=')) {
            return Ok(Self::Ids(entries.into_iter().map(AppId::new).collect()));
        }

        let mut apps = AppMap::new();
        for entry in entries {
            let (name, id) = match entry.split_once('=') {
                Some((name, id)) => (name.trim(), id.trim()),
                None => (entry, entry),
            };
            if name.is_empty() || id.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "app".to_string(),
                    value: raw.to_string(),
                });
            }
            apps.insert(name.to_string(), AppId::new(id));
        }
        Ok(Self::Named(apps))
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(self, Self::Named(_))
    }

    pub fn to_map(&self) -> AppMap {
        match self {
            Self::Named(apps) => apps.clone(),
            Self::Ids(ids) => ids
                .iter()
                .map(|id| (id.as_str().to_string(), id.clone()))
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for AppSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Named(AppMap),
            Ids(Vec<AppId>),
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Named(apps) => Ok(Self::Named(apps)),
            Raw::Ids(ids) => Ok(Self::Ids(ids)),
            Raw::Number(n) => Ok(Self::Ids(vec![AppId(n.to_string())])),
            Raw::Text(s) => Self::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}
