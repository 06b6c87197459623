//! Node producers: whatever turns a named collection or subscription into
//! sing-box outbound descriptors.

use crate::source::request::{ProduceRequest, SourceKind};

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ProducerError {
    #[error("read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid source name {0:?}")]
    InvalidName(String),

    #[error("invalid producer endpoint {0:?}")]
    InvalidEndpoint(String),

    #[error("unexpected payload: expected an array or an object with an outbounds array, found {0}")]
    UnexpectedShape(&'static str),
}

pub trait NodeProducer {
    /// Produce the descriptors for one source, in the producer's order.
    fn produce(&self, request: &ProduceRequest) -> Result<Vec<Value>, ProducerError>;
}

/// Accept a bare array of outbounds or a whole sing-box document.
pub fn nodes_from_payload(payload: Value) -> Result<Vec<Value>, ProducerError> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("outbounds") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(ProducerError::UnexpectedShape("an object without outbounds")),
        },
        Value::Null => Err(ProducerError::UnexpectedShape("null")),
        _ => Err(ProducerError::UnexpectedShape("a scalar")),
    }
}

/// Reads pre-produced node lists from disk:
/// `<root>/collections/<name>.json` and `<root>/subscriptions/<name>.json`.
#[derive(Debug, Clone)]
pub struct DirProducer {
    root: PathBuf,
}

impl DirProducer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, request: &ProduceRequest) -> Result<PathBuf, ProducerError> {
        let name = request.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ProducerError::InvalidName(name.to_string()));
        }
        let dir = match request.kind {
            SourceKind::Collection => "collections",
            SourceKind::Subscription => "subscriptions",
        };
        Ok(self.root.join(dir).join(format!("{}.json", name)))
    }
}

impl NodeProducer for DirProducer {
    fn produce(&self, request: &ProduceRequest) -> Result<Vec<Value>, ProducerError> {
        let path = self.path_for(request)?;
        let text = fs::read_to_string(&path).map_err(|source| ProducerError::Io {
            path: display(&path),
            source,
        })?;
        let payload: Value = serde_json::from_str(&text).map_err(|source| ProducerError::Json {
            origin: display(&path),
            source,
        })?;
        nodes_from_payload(payload)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Fetches node lists from a Sub-Store backend:
/// `<base>/download/<name>` for subscriptions and
/// `<base>/download/collection/<name>` for collections.
#[derive(Debug, Clone)]
pub struct HttpProducer {
    client: reqwest::blocking::Client,
    base: String,
}

impl HttpProducer {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base: base.into(),
        }
    }

    pub fn endpoint(&self, request: &ProduceRequest) -> Result<reqwest::Url, ProducerError> {
        let mut url = reqwest::Url::parse(&self.base)
            .map_err(|_| ProducerError::InvalidEndpoint(self.base.clone()))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ProducerError::InvalidEndpoint(self.base.clone()))?;
            segments.pop_if_empty().push("download");
            if request.kind == SourceKind::Collection {
                segments.push("collection");
            }
            segments.push(&request.name);
        }
        url.query_pairs_mut()
            .append_pair("target", request.platform)
            .append_pair("produceType", request.mode);
        Ok(url)
    }
}

impl NodeProducer for HttpProducer {
    fn produce(&self, request: &ProduceRequest) -> Result<Vec<Value>, ProducerError> {
        let url = self.endpoint(request)?;
        tracing::debug!(%url, "requesting nodes");
        let text = self.client.get(url.clone()).send()?.error_for_status()?.text()?;
        let payload: Value = serde_json::from_str(&text).map_err(|source| ProducerError::Json {
            origin: url.to_string(),
            source,
        })?;
        nodes_from_payload(payload)
    }
}
