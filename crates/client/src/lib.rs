//! Async client for the thorn compiler's trace server.
//!
//! Each endpoint has a typed method; [`InsightClient::fulfill`] runs the
//! request named by a session [`Effect`] and packages the outcome as the
//! [`Response`] the session expects.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use thorn_insight_core::GlobalSpan;
use thorn_insight_core::model::{Effect, Payload, Request, Response, Stage};
use thorn_insight_protocol::{FileContent, FileEntry, FileId, GraphPayload, TraceEventRecord};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("could not decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone)]
pub struct InsightClient {
    base_url: String,
    http: reqwest::Client,
}

impl InsightClient {
    /// `addr` is `host:port` or a full `http://` base URL. Every request is
    /// bounded by `timeout`.
    pub fn new(addr: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = if addr.starts_with("http://") || addr.starts_with("https://") {
            addr.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", addr.trim_end_matches('/'))
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /files`: `[[id, name], ...]`.
    pub async fn files(&self) -> Result<Vec<FileEntry>, ClientError> {
        self.get_json("/files", &[]).await
    }

    /// `GET /files/{id}`: `[text, [start, end]]`.
    pub async fn file_content(&self, id: FileId) -> Result<FileContent, ClientError> {
        self.get_json(&format!("/files/{id}"), &[]).await
    }

    /// `GET /files?low=&high=`: the raw source text of `span`.
    pub async fn span_text(&self, span: GlobalSpan) -> Result<String, ClientError> {
        self.get_json("/files", &span_query(span)).await
    }

    /// `GET /data?low=&high=`: trace events overlapping `span`.
    pub async fn trace_events(
        &self,
        span: GlobalSpan,
    ) -> Result<Vec<TraceEventRecord>, ClientError> {
        self.get_json("/data", &span_query(span)).await
    }

    /// `GET /data/graph?stage=`.
    pub async fn graph(&self, stage: &Stage) -> Result<GraphPayload, ClientError> {
        self.get_json("/data/graph", &[("stage", stage.as_str().to_string())])
            .await
    }

    pub async fn fulfill(&self, effect: Effect) -> Response {
        let Effect { token, request } = effect;
        let result = match request {
            Request::Files => self.files().await.map(Payload::Files),
            Request::FileContent(id) => self.file_content(id).await.map(Payload::FileContent),
            Request::SpanText(span) => self.span_text(span).await.map(Payload::SpanText),
            Request::TraceEvents(span) => self.trace_events(span).await.map(Payload::TraceEvents),
            Request::Graph(stage) => self.graph(&stage).await.map(Payload::Graph),
        };
        if let Err(e) = &result {
            warn!(?token, error = %e, "request failed");
        }
        Response {
            token,
            result: result.map_err(|e| e.to_string()),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, ?query, "GET");
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Status { url, status });
        }
        let body = resp.bytes().await.map_err(|source| ClientError::Transport {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { url, source })
    }
}

fn span_query(span: GlobalSpan) -> [(&'static str, String); 2] {
    [
        ("low", span.start().to_string()),
        ("high", span.end().to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_accepts_bare_addresses() {
        let timeout = Duration::from_secs(1);
        let client = InsightClient::new("127.0.0.1:8000", timeout).expect("client builds");
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        let client = InsightClient::new("http://localhost:9/", timeout).expect("client builds");
        assert_eq!(client.base_url(), "http://localhost:9");
    }
}
