//! kintone REST client
//!
//! Thin JSON-over-HTTPS adapter. Every call takes the [`Connection`] it is
//! aimed at, so one client can serve every request of an environment. Proxy
//! and client-certificate settings are fixed when the client is built.
//!
//! Failures keep the HTTP status, method, URL and the response body (parsed
//! JSON when possible) so the push recovery can inspect the remote error code.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Identity, Method, Proxy, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::domain::catalog::HttpMethod;
use crate::domain::descriptor::{Auth, ClientCertificate, ProxySetting};
use crate::domain::request::Connection;
use crate::error::{ConfigError, KintoneError, ResponseBody};

/// Remote operations the engines need
#[async_trait]
pub trait KintoneApi: Send + Sync {
    /// GET a JSON document
    async fn get(
        &self,
        connection: &Connection,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, KintoneError>;

    /// PUT/POST/DELETE a JSON body
    async fn send(
        &self,
        method: HttpMethod,
        connection: &Connection,
        path: &str,
        body: &Value,
    ) -> Result<Value, KintoneError>;

    /// Download an uploaded file by its key
    async fn download(&self, connection: &Connection, file_key: &str) -> Result<Vec<u8>, KintoneError>;
}

/// reqwest-backed [`KintoneApi`]
pub struct KintoneClient {
    client: Client,
}

impl KintoneClient {
    /// Build a client for one environment's transport settings
    pub fn new(proxy: Option<&ProxySetting>, certificate: Option<&ClientCertificate>) -> Result<Self> {
        if proxy.is_some() && certificate.is_some() {
            return Err(ConfigError::ProxyWithClientCertificate.into());
        }

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10));

        if let Some(proxy) = proxy {
            let url = proxy.to_url();
            builder = builder.proxy(Proxy::all(&url).with_context(|| format!("Invalid proxy: {}", url))?);
        }

        if let Some(certificate) = certificate {
            let der = std::fs::read(&certificate.path).with_context(|| {
                format!("Failed to read client certificate {}", certificate.path.display())
            })?;
            let identity = Identity::from_pkcs12_der(&der, &certificate.password)
                .context("Failed to load PKCS#12 client certificate")?;
            builder = builder.use_native_tls().identity(identity);
        }

        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    fn authorize(&self, builder: RequestBuilder, connection: &Connection) -> RequestBuilder {
        let credentials = &connection.credentials;
        let builder = match &credentials.auth {
            Auth::OAuth { token } => return builder.bearer_auth(token),
            Auth::Password { username, password } => builder.header(
                "X-Cybozu-Authorization",
                STANDARD.encode(format!("{}:{}", username, password)),
            ),
        };
        match &credentials.basic {
            Some(basic) => builder.basic_auth(&basic.user, Some(&basic.password)),
            None => builder,
        }
    }

    async fn execute(&self, method: &str, url: &str, builder: RequestBuilder) -> Result<reqwest::Response, KintoneError> {
        debug!("{} {}", method, url);
        let response = builder.send().await.map_err(|source| KintoneError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        Err(KintoneError::Api {
            status: status.as_u16(),
            method: method.to_string(),
            url: url.to_string(),
            body: ResponseBody::parse(text),
        })
    }

    async fn json(url: &str, response: reqwest::Response) -> Result<Value, KintoneError> {
        response.json().await.map_err(|source| KintoneError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Post => Method::POST,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl KintoneApi for KintoneClient {
    async fn get(
        &self,
        connection: &Connection,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Value, KintoneError> {
        let url = connection.url(path);
        let builder = self.authorize(self.client.get(&url).query(query), connection);
        let response = self.execute("GET", &url, builder).await?;
        Self::json(&url, response).await
    }

    async fn send(
        &self,
        method: HttpMethod,
        connection: &Connection,
        path: &str,
        body: &Value,
    ) -> Result<Value, KintoneError> {
        let url = connection.url(path);
        let builder = self.authorize(self.client.request(to_method(method), &url).json(body), connection);
        let response = self.execute(method.as_str(), &url, builder).await?;
        Self::json(&url, response).await
    }

    async fn download(&self, connection: &Connection, file_key: &str) -> Result<Vec<u8>, KintoneError> {
        let url = connection.url("file.json");
        let builder = self.authorize(self.client.get(&url).query(&[("fileKey", file_key)]), connection);
        let response = self.execute("GET", &url, builder).await?;
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|source| KintoneError::Transport { url, source })
    }
}
