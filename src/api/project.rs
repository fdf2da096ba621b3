//! Purpose: The project client seam plus a blocking HTTP implementation.
//! Exports: `ProjectClient`, `HttpProjectClient`, `ProjectConfig`, `DEFAULT_API_URL`.
//! Role: All platform traffic goes through `ProjectClient::get`/`post`.
//! Invariants: Non-2xx statuses and `{"status": "error"}` bodies are Transport errors.
//! Invariants: Project roots always end in '/' so endpoint joins stay under them.
//! Invariants: No retries and no timeout policy of our own; one call, one round trip.
#![allow(clippy::result_large_err)]

use crate::core::error::{Error, ErrorKind};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

pub type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_API_URL: &str = "https://api.brandwatch.com/";

/// Request capability the uploader and content-source calls are written against.
pub trait ProjectClient {
    /// Project-scoped API root, ending in '/'.
    fn api_root(&self) -> &Url;

    fn get(&self, url: &Url) -> ApiResult<Value>;

    fn post(&self, url: &Url, data: &Value) -> ApiResult<Value>;

    /// Resolve `path` (no leading '/') under the project root.
    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        self.api_root().join(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("invalid endpoint path '{path}'"))
                .with_source(err)
        })
    }
}

impl<C: ProjectClient + ?Sized> ProjectClient for &C {
    fn api_root(&self) -> &Url {
        (**self).api_root()
    }

    fn get(&self, url: &Url) -> ApiResult<Value> {
        (**self).get(url)
    }

    fn post(&self, url: &Url, data: &Value) -> ApiResult<Value> {
        (**self).post(url, data)
    }
}

/// Where to talk to and as whom.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProjectConfig {
    pub api_url: Url,
    pub project_id: u64,
    pub token: String,
}

impl ProjectConfig {
    pub fn new(
        api_url: Option<&str>,
        project: Option<&str>,
        token: Option<&str>,
    ) -> ApiResult<Self> {
        let api_url = normalize_root(api_url.unwrap_or(DEFAULT_API_URL))?;
        let project = project
            .map(str::trim)
            .filter(|project| !project.is_empty())
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message("no project configured")
                    .with_hint("Pass --project <id> or set CONTENTPUSH_PROJECT.")
            })?;
        let project_id = project.parse::<u64>().map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("project id must be numeric, got '{project}'"))
                .with_source(err)
        })?;
        let token = token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                Error::new(ErrorKind::Usage)
                    .with_message("no access token configured")
                    .with_hint("Pass --token <token> or set CONTENTPUSH_TOKEN.")
            })?
            .to_string();
        Ok(Self {
            api_url,
            project_id,
            token,
        })
    }

    /// `<api_url>/projects/<project_id>/`
    pub fn project_root(&self) -> ApiResult<Url> {
        self.api_url
            .join(&format!("projects/{}/", self.project_id))
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message("cannot build project url")
                    .with_source(err)
            })
    }
}

#[derive(Clone)]
pub struct HttpProjectClient {
    inner: Arc<HttpProjectClientInner>,
}

struct HttpProjectClientInner {
    api_root: Url,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpProjectClient {
    pub fn new(api_root: impl Into<String>) -> ApiResult<Self> {
        let api_root = normalize_root(&api_root.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(HttpProjectClientInner {
                api_root,
                token: None,
                agent,
            }),
        })
    }

    pub fn from_config(config: &ProjectConfig) -> ApiResult<Self> {
        Ok(Self::new(config.project_root()?.as_str())?.with_token(config.token.clone()))
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.token = Some(token.into());
        } else {
            self.inner = Arc::new(HttpProjectClientInner {
                api_root: self.inner.api_root.clone(),
                token: Some(token.into()),
                agent: self.inner.agent.clone(),
            });
        }
        self
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        let mut request = self
            .inner
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        if let Some(token) = &self.inner.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
    }

    fn request_json(&self, method: &str, url: &Url, body: Option<&Value>) -> ApiResult<Value> {
        debug!(method, url = %url, "sending request");
        let request = self.request(method, url);
        let response = match body {
            None => request.call(),
            Some(body) => {
                let payload = serde_json::to_string(body).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode request json")
                        .with_source(err)
                })?;
                request
                    .set("Content-Type", "application/json")
                    .send_string(&payload)
            }
        };

        match response {
            Ok(resp) => {
                debug!(status = resp.status(), url = %url, "received response");
                let value = read_json_response(resp).map_err(|err| err.with_url(url.as_str()))?;
                check_platform_status(url, value)
            }
            Err(ureq::Error::Status(code, resp)) => Err(status_error(url, code, resp)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Transport)
                .with_message("request failed")
                .with_url(url.as_str())
                .with_source(err)),
        }
    }
}

impl ProjectClient for HttpProjectClient {
    fn api_root(&self) -> &Url {
        &self.inner.api_root
    }

    fn get(&self, url: &Url) -> ApiResult<Value> {
        self.request_json("GET", url, None)
    }

    fn post(&self, url: &Url, data: &Value) -> ApiResult<Value> {
        self.request_json("POST", url, Some(data))
    }
}

fn normalize_root(raw: &str) -> ApiResult<Url> {
    let mut url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid api url '{raw}'"))
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(
            Error::new(ErrorKind::Usage).with_message("api url must use http or https scheme")
        );
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn read_json_response(response: ureq::Response) -> ApiResult<Value> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_message("failed to read response body")
            .with_source(err)
    })?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_message("invalid response json")
            .with_source(err)
    })
}

fn status_error(url: &Url, status: u16, response: ureq::Response) -> Error {
    let body = response.into_string().unwrap_or_default();
    let parsed = serde_json::from_str::<Value>(&body).ok();
    let message = parsed
        .as_ref()
        .and_then(platform_error_message)
        .unwrap_or_else(|| format!("platform returned status {status}"));
    let mut err = Error::new(ErrorKind::Transport)
        .with_message(message)
        .with_url(url.as_str())
        .with_status(status);
    if status == 401 || status == 403 {
        err = err.with_hint("Check that the access token is valid for this project.");
    }
    if let Some(parsed) = parsed {
        err = err.with_response(parsed);
    }
    err
}

/// A 2xx body can still carry `{"status": "error", ...}`.
pub(crate) fn check_platform_status(url: &Url, value: Value) -> ApiResult<Value> {
    let failed = value.get("status").and_then(Value::as_str) == Some("error");
    if !failed {
        return Ok(value);
    }
    let message = platform_error_message(&value)
        .map(|message| format!("platform reported an error: {message}"))
        .unwrap_or_else(|| "platform reported an error".to_string());
    Err(Error::new(ErrorKind::Transport)
        .with_message(message)
        .with_url(url.as_str())
        .with_response(value))
}

fn platform_error_message(value: &Value) -> Option<String> {
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    let errors = value.get("errors")?.as_array()?;
    let messages: Vec<String> = errors
        .iter()
        .filter_map(|error| match error {
            Value::String(text) => Some(text.clone()),
            other => other
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect();
    (!messages.is_empty()).then(|| messages.join("; "))
}
