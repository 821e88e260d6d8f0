use epicflow_core::api::{ProviderEpic, SpawnedAgent};
use serde::de::DeserializeOwned;
use std::{error::Error as StdError, fmt, time::Duration};

const BODY_PREVIEW_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Decode,
    Status,
    Unknown,
}

impl HttpErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Request => "request",
            Self::Body => "body",
            Self::Decode => "decode",
            Self::Status => "status",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure talking to a task provider or agent runtime service.
#[derive(Debug)]
pub struct HttpError {
    kind: HttpErrorKind,
    status: Option<u16>,
    url: Option<String>,
    message: String,
    source: Option<anyhow::Error>,
}

impl HttpError {
    pub fn kind(&self) -> HttpErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    fn from_reqwest(err: reqwest::Error, url: String) -> Self {
        let kind = if err.is_timeout() {
            HttpErrorKind::Timeout
        } else if err.is_connect() {
            HttpErrorKind::Connect
        } else if err.is_request() {
            HttpErrorKind::Request
        } else if err.is_body() {
            HttpErrorKind::Body
        } else if err.is_decode() {
            HttpErrorKind::Decode
        } else {
            HttpErrorKind::Unknown
        };
        HttpError {
            kind,
            status: err.status().map(|s| s.as_u16()),
            url: Some(url),
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }

    fn status_error(status: u16, url: String, preview: String) -> Self {
        HttpError {
            kind: HttpErrorKind::Status,
            status: Some(status),
            url: Some(url),
            message: preview,
            source: None,
        }
    }

    fn decode_error(status: u16, url: String, err: serde_json::Error, preview: String) -> Self {
        HttpError {
            kind: HttpErrorKind::Decode,
            status: Some(status),
            url: Some(url),
            message: format!("failed to decode response body: {} | body={}", err, preview),
            source: Some(anyhow::Error::new(err)),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http error kind={}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(url) = &self.url {
            write!(f, " url={}", url)?;
        }
        write!(f, ": {}", self.message)
    }
}

impl StdError for HttpError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().nth(BODY_PREVIEW_LIMIT).is_some() {
        out.push_str("...");
    }
    out
}

async fn parse_json_response<T: DeserializeOwned>(resp: reqwest::Response) -> anyhow::Result<T> {
    let status = resp.status();
    let url = resp.url().to_string();
    let body = resp
        .text()
        .await
        .map_err(|err| HttpError::from_reqwest(err, url.clone()))?;

    if !status.is_success() {
        let preview = preview_body(&body);
        return Err(HttpError::status_error(status.as_u16(), url, preview).into());
    }

    serde_json::from_str::<T>(&body).map_err(|err| {
        let preview = preview_body(&body);
        HttpError::decode_error(status.as_u16(), url, err, preview).into()
    })
}

/// Thin JSON client shared by the HTTP provider and runtime plugins.
#[derive(Clone)]
pub struct HttpClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: String, api_key: String, timeout_ms: u64) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            api_key,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.trim().is_empty() {
            req
        } else {
            req.bearer_auth(&self.api_key)
        }
    }

    pub async fn epic_children(&self, epic_id: &str) -> anyhow::Result<ProviderEpic> {
        let url = format!("{}/v1/epics/{}/children", self.base_url, epic_id);
        tracing::debug!(
            target: "epicflow.provider",
            stage = "provider.http.children.in",
            url = %url
        );
        let resp = self
            .auth(self.http.get(&url))
            .send()
            .await
            .map_err(|err| HttpError::from_reqwest(err, url.clone()))?;
        let status = resp.status();
        let epic: ProviderEpic = parse_json_response(resp).await?;
        tracing::debug!(
            target: "epicflow.provider",
            stage = "provider.http.children.out",
            status = %status,
            children = epic.children.len()
        );
        Ok(epic)
    }

    pub async fn spawn_agent(&self, task_id: &str) -> anyhow::Result<SpawnedAgent> {
        let url = format!("{}/v1/agents", self.base_url);
        tracing::debug!(
            target: "epicflow.runtime",
            stage = "runtime.http.spawn.in",
            url = %url,
            task_id = %task_id
        );
        let req = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "taskId": task_id }));
        let resp = self
            .auth(req)
            .send()
            .await
            .map_err(|err| HttpError::from_reqwest(err, url.clone()))?;
        let status = resp.status();
        let agent: SpawnedAgent = parse_json_response(resp).await?;
        tracing::debug!(
            target: "epicflow.runtime",
            stage = "runtime.http.spawn.out",
            status = %status,
            agent_id = %agent.agent_id
        );
        Ok(agent)
    }
}
