//! Centralized error types for ginue
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use serde_json::Value;
use thiserror::Error;

/// Fatal configuration and validation errors.
///
/// None of these are retryable; the process reports them and exits with 1.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("The top-level structure of {path} must not be an array")]
    TopLevelArray { path: String },

    #[error("Environment '{name}' not found")]
    UnknownEnvironment { name: String },

    #[error("<target environment>:<push target> is only allowed for push and diff, not '{operation}'")]
    PushTargetNotAllowed { operation: String },

    #[error("'app' should be a name-to-id map if '<env>:<env>' is specified (environment '{environment}')")]
    AppMapNotDictionary { environment: String },

    #[error("<target environment> is required for '{operation}' if .ginuerc has multiple environments")]
    AmbiguousTarget { operation: String },

    #[error("'{name}' no such command")]
    UnknownCommand { name: String },

    #[error("Required configuration missing: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("App \"{app}\" not found in \"{environment}\" environment")]
    AppNotFound { app: String, environment: String },

    #[error("Proxy server and client certificate cannot be used at the same time")]
    ProxyWithClientCertificate,
}

/// Structured error payload returned by the kintone REST API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    pub errors: Value,
}

/// Body of a failed response: parsed JSON when possible, raw text otherwise
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    pub fn parse(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }
}

impl std::fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{}", value),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Remote call failures
#[derive(Error, Debug)]
pub enum KintoneError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Api {
        status: u16,
        method: String,
        url: String,
        body: ResponseBody,
    },
}

impl KintoneError {
    /// Extract the `{code, message, errors}` triple when the body carries one
    pub fn api_error(&self) -> Option<ApiErrorBody> {
        let Self::Api {
            body: ResponseBody::Json(value),
            ..
        } = self
        else {
            return None;
        };
        let code = value.get("code")?.as_str()?.to_string();
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let errors = value.get("errors").cloned().unwrap_or(Value::Null);
        Some(ApiErrorBody {
            code,
            message,
            errors,
        })
    }

    /// Structured view of the failure for operator diagnostics
    pub fn to_report(&self) -> Value {
        match self {
            Self::Transport { url, source } => serde_json::json!({
                "url": url,
                "error": source.to_string(),
            }),
            Self::Api {
                status,
                method,
                url,
                body,
            } => {
                let body = match body {
                    ResponseBody::Json(value) => value.clone(),
                    ResponseBody::Text(text) => serde_json::json!({ "text": text }),
                };
                serde_json::json!({
                    "status": status,
                    "method": method,
                    "url": url,
                    "body": body,
                })
            }
        }
    }
}

/// Local file tree errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {path}: {message}")]
    Invalid { path: String, message: String },
}

/// Push recovery outcomes that end a push without a plain remote error
#[derive(Error, Debug)]
pub enum PushError {
    #[error("{command}: operator declined the corrective action")]
    Declined {
        command: String,
        #[source]
        source: KintoneError,
    },

    #[error("{command}: gave up after {attempts} corrective actions")]
    TooManyCorrections {
        command: String,
        attempts: u32,
        #[source]
        source: KintoneError,
    },

    #[error("{command}: {code} recurred after a corrective action")]
    Recurring {
        command: String,
        code: String,
        #[source]
        source: KintoneError,
    },
}

impl PushError {
    /// The remote failure that started the recovery attempt
    pub fn remote(&self) -> &KintoneError {
        match self {
            Self::Declined { source, .. }
            | Self::TooManyCorrections { source, .. }
            | Self::Recurring { source, .. } => source,
        }
    }
}
