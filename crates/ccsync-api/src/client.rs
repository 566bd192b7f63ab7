// Async HTTP client for the Catalyst Center intent API.
//
// Base path: /dna/intent/api/v1/
// Auth: X-Auth-Token header, minted by `login` (see auth.rs)
//
// The client is stateless with respect to authentication: every call takes
// the token explicitly, so token caching and refresh stay with the caller.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::AuthToken;
use crate::error::Error;
use crate::transport::TransportConfig;

const TOKEN_HEADER: &str = "X-Auth-Token";

// ── Error response shapes ────────────────────────────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    response: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Catalyst Center intent API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct CatalystClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalystClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a controller root URL (e.g. `https://10.0.0.5`).
    pub fn new(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Self::from_reqwest(base_url, http)
    }

    /// Wrap an existing `reqwest::Client`.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let mut url = Url::parse(base_url)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(Self {
            http,
            base_url: url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a path onto the controller root.
    ///
    /// Relative paths (`dna/intent/...`) and absolute ones
    /// (`/dna/platform/...`, as found in `executionStatusUrl`) both work.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        token: &AuthToken,
        path: &str,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self
            .http
            .get(url)
            .header(TOKEN_HEADER, token.expose())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn get_with_params<T: DeserializeOwned>(
        &self,
        token: &AuthToken,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url} params={params:?}");

        let resp = self
            .http
            .get(url)
            .query(params)
            .header(TOKEN_HEADER, token.expose())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        token: &AuthToken,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        let resp = self
            .http
            .post(url)
            .header(TOKEN_HEADER, token.expose())
            .json(body)
            .send()
            .await?;
        self.handle_response(resp).await
    }

    pub(crate) async fn delete<T: DeserializeOwned>(
        &self,
        token: &AuthToken,
        path: &str,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("DELETE {url}");

        let resp = self
            .http
            .delete(url)
            .header(TOKEN_HEADER, token.expose())
            .send()
            .await?;
        self.handle_response(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    pub(crate) async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            // Some DELETEs answer 2xx with an empty body.
            let text = if body.trim().is_empty() { "{}" } else { &body };
            serde_json::from_str(text).map_err(|e| Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body: body.clone(),
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Error::SessionExpired;
        }

        let raw = resp.text().await.unwrap_or_default();

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(&raw) {
            let (nested_msg, nested_detail, nested_code) = match err.response {
                Some(d) => (d.message, d.detail, d.error_code),
                None => (None, None, None),
            };
            let message = nested_detail
                .or(nested_msg)
                .or(err.detail)
                .or(err.message)
                .unwrap_or_else(|| {
                    if raw.is_empty() {
                        status.to_string()
                    } else {
                        raw.clone()
                    }
                });
            Error::Api {
                status: status.as_u16(),
                message,
                code: nested_code.or(err.error_code),
            }
        } else {
            Error::Api {
                status: status.as_u16(),
                message: if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                code: None,
            }
        }
    }
}

/// First 200 bytes of a body, cut on a char boundary.
pub(crate) fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
