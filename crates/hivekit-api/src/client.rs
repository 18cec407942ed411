// Authenticated Omnia HTTP client
//
// Wraps `reqwest::Client` with the Omnia headers, URL construction against
// the session's base, and the one-shot re-login on 401. Callers own the
// `Session` and lend it mutably, so a re-login is written straight back
// into whatever the caller is guarding.

use reqwest::{Method, StatusCode};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::nodes::{Node, NodeUpdate, NodeUpdateRequest, NodesReply};
use crate::session::{Credentials, Session, SessionManager};
use crate::transport::TransportConfig;

/// Header carrying the session token.
pub const ACCESS_TOKEN_HEADER: &str = "X-Omnia-Access-Token";
/// Header identifying the calling application.
pub const CLIENT_HEADER: &str = "X-Omnia-Client";
/// Value sent in [`CLIENT_HEADER`].
pub const CLIENT_ID: &str = "Hivekit";
/// Versioned media type the node API speaks.
pub const ACCEPT_MEDIA_TYPE: &str = "application/vnd.alertme.zoo-6.1+json";

const NODES_PATH: &str = "omnia/nodes";

/// HTTP client for the Omnia node API.
pub struct HiveClient {
    http: reqwest::Client,
    sessions: SessionManager,
}

impl HiveClient {
    /// Create a client from a `TransportConfig`.
    pub fn new(
        login_url: Url,
        credentials: Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, login_url, credentials))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, login_url: Url, credentials: Credentials) -> Self {
        let sessions = SessionManager::new(http.clone(), login_url, credentials);
        Self { http, sessions }
    }

    /// Pin the API base instead of using the one discovered at login.
    pub fn with_api_base(mut self, api_base: Url) -> Self {
        self.sessions = self.sessions.with_api_base(api_base);
        self
    }

    /// Log in, returning a new session.
    pub async fn login(&self) -> Result<Session, Error> {
        Ok(self.sessions.login().await?)
    }

    // ── Typed endpoints ──────────────────────────────────────────────

    /// `GET /omnia/nodes`
    pub async fn list_nodes(&self, session: &mut Session) -> Result<Vec<Node>, Error> {
        let resp = self.get(session, NODES_PATH).await?;
        let body = resp.text().await?;
        let reply: NodesReply = serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })?;
        trace!(count = reply.nodes.len(), "nodes received");
        Ok(reply.nodes)
    }

    /// `PUT /omnia/nodes/{id}`. The echoed attributes are not read.
    ///
    /// `id` is not validated; an empty id addresses the collection path
    /// and the upstream's answer is returned as-is.
    pub async fn update_node(
        &self,
        session: &mut Session,
        id: &str,
        update: &NodeUpdate,
    ) -> Result<StatusCode, Error> {
        let body = serde_json::to_vec(&NodeUpdateRequest { nodes: [update] })?;
        let resp = self.put(session, &format!("{NODES_PATH}/{id}"), body).await?;
        Ok(resp.status())
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Authenticated GET relative to the session base.
    pub async fn get(&self, session: &mut Session, path: &str) -> Result<reqwest::Response, Error> {
        self.send(session, Method::GET, path, None).await
    }

    /// Authenticated PUT of a raw JSON body relative to the session base.
    pub async fn put(
        &self,
        session: &mut Session,
        path: &str,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, Error> {
        self.send(session, Method::PUT, path, Some(body)).await
    }

    /// Send once; on 401 log in again and resend exactly once.
    ///
    /// Only an unauthorized *response* triggers the retry. A transport
    /// failure on the first attempt is returned as-is, without a login.
    async fn send(
        &self,
        session: &mut Session,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, Error> {
        let url = session.url(path)?;
        debug!(%method, %url, "request");

        let resp = self
            .request(session, method.clone(), url.clone(), body.clone())
            .send()
            .await?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return check_status(resp).await;
        }

        debug!(%url, "session rejected, logging in again");
        *session = self.sessions.login().await?;

        let resp = self.request(session, method, url, body).send().await?;
        check_status(resp).await
    }

    fn request(
        &self,
        session: &Session,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(ACCESS_TOKEN_HEADER, session.token())
            .header(reqwest::header::ACCEPT, ACCEPT_MEDIA_TYPE)
            .header(CLIENT_HEADER, CLIENT_ID);

        match body {
            Some(body) => builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body),
            None => builder,
        }
    }
}

/// Pass 2xx responses through; turn anything else into `Error::Upstream`.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(Error::Upstream {
        status: status.as_u16(),
        message: if body.is_empty() {
            status.to_string()
        } else {
            preview(&body)
        },
    })
}

fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
