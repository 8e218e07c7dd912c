//! Proxmox VE HTTP API

use crate::error::{ProxmoxError, Result};
use crate::vm::CreateVmRequest;
use async_trait::async_trait;
use homelab_cloud::Session;
use homelab_core::Identity;
use reqwest::header::COOKIE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

const CSRF_HEADER: &str = "CSRFPreventionToken";
const AUTH_COOKIE: &str = "PVEAuthCookie";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub realm: String,
}

impl From<&Identity> for Credentials {
    fn from(identity: &Identity) -> Self {
        Self {
            username: identity.username.clone(),
            password: identity.password.clone(),
            realm: identity.realm.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct AuthTicket {
    username: String,
    ticket: String,
    #[serde(rename = "CSRFPreventionToken")]
    csrf_token: String,
}

/// A storage entry of `GET /nodes/{node}/storage`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageInfo {
    pub storage: String,
    /// Comma separated content types, e.g. `iso,vztmpl,backup`
    #[serde(default)]
    pub content: String,
}

impl StorageInfo {
    pub fn accepts(&self, format: &str) -> bool {
        self.content.split(',').any(|c| c.trim() == format)
    }
}

/// Calls the provider makes against the platform
#[async_trait]
pub trait PlatformApi: Send + Sync {
    async fn login(&self, api_server: &str, credentials: &Credentials) -> Result<Session>;

    async fn list_storage(&self, session: &Session, node: &str) -> Result<Vec<StorageInfo>>;

    async fn upload(
        &self,
        session: &Session,
        node: &str,
        storage: &str,
        format: &str,
        file: &Path,
    ) -> Result<()>;

    async fn create_vm(&self, session: &Session, node: &str, request: &CreateVmRequest)
    -> Result<()>;

    async fn start_vm(&self, session: &Session, node: &str, vmid: &str) -> Result<()>;
}

pub(crate) fn normalize_server(api_server: &str) -> String {
    api_server.trim().trim_end_matches('/').to_string()
}

fn api_url(api_server: &str, path: &str) -> String {
    format!("{}/api2/json{}", normalize_server(api_server), path)
}

/// reqwest based client. Proxmox ships self-signed certificates,
/// so certificate validation is off.
#[derive(Debug, Clone)]
pub struct ProxmoxClient {
    http: Client,
}

impl ProxmoxClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { http })
    }

    fn authorized(&self, builder: RequestBuilder, session: &Session) -> RequestBuilder {
        builder
            .header(CSRF_HEADER, &session.csrf_token)
            .header(COOKIE, format!("{}={}", AUTH_COOKIE, session.ticket))
    }

    /// 401 is an authentication failure, any other non-2xx a request failure
    async fn check(method: &'static str, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        tracing::debug!("{} {} -> {}", method, path, status);

        if status == StatusCode::UNAUTHORIZED {
            let reason = status.canonical_reason().unwrap_or("unauthorized");
            return Err(ProxmoxError::AuthenticationFailed(format!(
                "{} {}: {}",
                method, path, reason
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxmoxError::RequestFailed {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }
        Ok(response)
    }

    async fn data<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body)?;
        Ok(parsed.data)
    }

    async fn post_form(
        &self,
        session: &Session,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<()> {
        let request = self.http.post(api_url(&session.api_server, path)).form(form);
        let response = self.authorized(request, session).send().await?;
        Self::check("POST", path, response).await?;
        Ok(())
    }
}

#[async_trait]
impl PlatformApi for ProxmoxClient {
    async fn login(&self, api_server: &str, credentials: &Credentials) -> Result<Session> {
        let path = "/access/ticket";
        let form = [
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("realm", credentials.realm.as_str()),
        ];
        let response = self
            .http
            .post(api_url(api_server, path))
            .form(&form)
            .send()
            .await?;
        let response = Self::check("POST", path, response).await?;
        let ticket: AuthTicket = Self::data(response).await?;

        Ok(Session {
            username: ticket.username,
            ticket: ticket.ticket,
            csrf_token: ticket.csrf_token,
            api_server: normalize_server(api_server),
        })
    }

    async fn list_storage(&self, session: &Session, node: &str) -> Result<Vec<StorageInfo>> {
        let path = format!("/nodes/{}/storage", node);
        let request = self.http.get(api_url(&session.api_server, &path));
        let response = self.authorized(request, session).send().await?;
        let response = Self::check("GET", &path, response).await?;
        Self::data(response).await
    }

    async fn upload(
        &self,
        session: &Session,
        node: &str,
        storage: &str,
        format: &str,
        file: &Path,
    ) -> Result<()> {
        let path = format!("/nodes/{}/storage/{}/upload", node, storage);
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ProxmoxError::FileNotFound(file.to_path_buf()))?;

        let handle = tokio::fs::File::open(file).await?;
        let length = handle.metadata().await?.len();
        let part = Part::stream_with_length(handle, length)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;
        let form = Form::new()
            .text("content", format.to_string())
            .part("filename", part);

        tracing::debug!("Uploading {} ({} bytes) to {}", file.display(), length, path);
        let request = self
            .http
            .post(api_url(&session.api_server, &path))
            .multipart(form);
        let response = self.authorized(request, session).send().await?;
        Self::check("POST", &path, response).await?;
        Ok(())
    }

    async fn create_vm(
        &self,
        session: &Session,
        node: &str,
        request: &CreateVmRequest,
    ) -> Result<()> {
        let path = format!("/nodes/{}/qemu", node);
        self.post_form(session, &path, &request.form()).await
    }

    async fn start_vm(&self, session: &Session, node: &str, vmid: &str) -> Result<()> {
        let path = format!("/nodes/{}/qemu/{}/status/start", node, vmid);
        self.post_form(session, &path, &[]).await
    }
}
