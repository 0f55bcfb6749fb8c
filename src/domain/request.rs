//! Sync requests
//!
//! A [`SyncRequest`] is the unit of work for one (environment, app, command)
//! triple. Requests are values: staging a push or retargeting it at another
//! environment builds a new request instead of patching the old one.

use std::sync::Arc;

use super::app::AppId;
use super::catalog::HttpMethod;
use super::descriptor::Credentials;

/// Where and as whom requests are sent
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Environment label used in operator messages
    pub environment: String,
    pub domain: String,
    pub guest_space_id: Option<String>,
    pub credentials: Credentials,
}

impl Connection {
    /// REST base URL; guest-space apps live under an alternate prefix
    pub fn base_url(&self) -> String {
        match &self.guest_space_id {
            Some(guest) => format!("https://{}/k/guest/{}/v1", self.domain, guest),
            None => format!("https://{}/k/v1", self.domain),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url(), path)
    }
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub connection: Arc<Connection>,
    pub app_name: String,
    pub app_id: AppId,
    /// Canonical command, e.g. `app/form/fields.json`
    pub command: String,
    /// Target the staged ("preview") variant of the command
    pub preview: bool,
    pub app_param: String,
    pub methods: Vec<HttpMethod>,
}

impl SyncRequest {
    pub fn allows(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    /// REST path relative to the base URL
    pub fn path(&self) -> String {
        if self.preview {
            format!("preview/{}", self.command)
        } else {
            self.command.clone()
        }
    }

    /// Query identifying the app on GET
    pub fn query(&self) -> Vec<(String, String)> {
        vec![(self.app_param.clone(), self.app_id.as_str().to_string())]
    }

    /// Same request aimed at the staging area
    pub fn staged(&self) -> Self {
        Self {
            preview: true,
            ..self.clone()
        }
    }

    /// Same app, different endpoint (keeps the staging flag)
    pub fn with_command(&self, command: &str) -> Self {
        Self {
            command: command.to_string(),
            app_param: "app".to_string(),
            ..self.clone()
        }
    }

    /// Same command aimed at another environment's copy of the app
    pub fn retarget(&self, connection: Arc<Connection>, app_id: AppId) -> Self {
        Self {
            connection,
            app_id,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::descriptor::Auth;

    fn connection(domain: &str, guest: Option<&str>) -> Arc<Connection> {
        Arc::new(Connection {
            environment: "dev".to_string(),
            domain: domain.to_string(),
            guest_space_id: guest.map(str::to_string),
            credentials: Credentials {
                auth: Auth::Password {
                    username: "alice".to_string(),
                    password: "secret".to_string(),
                },
                basic: None,
            },
        })
    }

    fn request() -> SyncRequest {
        SyncRequest {
            connection: connection("dev.cybozu.com", None),
            app_name: "orders".to_string(),
            app_id: AppId::new("10"),
            command: "app/form/fields.json".to_string(),
            preview: false,
            app_param: "app".to_string(),
            methods: vec![HttpMethod::Get, HttpMethod::Put],
        }
    }

    #[test]
    fn test_urls() {
        assert_eq!(
            connection("a.cybozu.com", None).url("app.json"),
            "https://a.cybozu.com/k/v1/app.json"
        );
        assert_eq!(
            connection("a.cybozu.com", Some("3")).url("app.json"),
            "https://a.cybozu.com/k/guest/3/v1/app.json"
        );
    }

    #[test]
    fn test_staged_leaves_original_untouched() {
        let original = request();
        let staged = original.staged();
        assert_eq!(original.path(), "app/form/fields.json");
        assert_eq!(staged.path(), "preview/app/form/fields.json");
    }

    #[test]
    fn test_retarget() {
        let target = connection("prod.cybozu.com", Some("7"));
        let moved = request().staged().retarget(target, AppId::new("20"));
        assert_eq!(moved.app_id, AppId::new("20"));
        assert_eq!(
            moved.connection.url(&moved.path()),
            "https://prod.cybozu.com/k/guest/7/v1/preview/app/form/fields.json"
        );
    }

    #[test]
    fn test_allows() {
        let mut req = request();
        req.methods = vec![HttpMethod::Get];
        assert!(req.allows(HttpMethod::Get));
        assert!(!req.allows(HttpMethod::Put));
    }
}
