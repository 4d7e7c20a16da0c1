//! HTTP fetch processor
//!
//! The response body of the configured request replaces the document.
//! Requests go through one shared blocking reqwest client. Inside a tokio
//! runtime the request is moved off the executor: multi-thread runtimes use
//! `block_in_place`, current-thread runtimes a scoped helper thread.

use super::{load_json, save_json, LoadProcessor, ProcessError, Processor};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tokio::runtime::{Handle, RuntimeFlavor};

static CLIENT: OnceLock<Client> = OnceLock::new();

/// Shared client, built on first use
fn client(url: &str) -> Result<&'static Client, ProcessError> {
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }
    let client = Client::builder()
        .build()
        .map_err(|e| ProcessError::fetch(url, e))?;
    Ok(CLIENT.get_or_init(|| client))
}

/// Fetches a document over HTTP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurlProcessor {
    #[serde(default)]
    pub path: String,

    pub url: String,

    /// HTTP method, `GET` when empty
    #[serde(default)]
    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub author: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CurlProcessor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            url: url.into(),
            method: String::new(),
            body: None,
            headers: BTreeMap::new(),
            author: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    fn method(&self) -> Result<Method, ProcessError> {
        let method = self.method.trim().to_uppercase();
        if method.is_empty() {
            return Ok(Method::GET);
        }
        Method::from_bytes(method.as_bytes()).map_err(|e| ProcessError::fetch(&self.url, e))
    }

    /// Issue the request on the calling thread
    fn fetch(&self) -> Result<Vec<u8>, ProcessError> {
        let mut request = client(&self.url)?.request(self.method()?, &self.url);
        for (name, values) in &self.headers {
            for value in values {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        if let Some(body) = &self.body {
            request = request.body(body.clone());
        }

        tracing::debug!(url = %self.url, "fetching document");
        let response = request
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| ProcessError::fetch(&self.url, e))?;
        let content = response
            .bytes()
            .map_err(|e| ProcessError::fetch(&self.url, e))?;
        Ok(content.to_vec())
    }
}

impl Processor for CurlProcessor {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn process(&self, _before: &[u8]) -> Result<Vec<u8>, ProcessError> {
        match Handle::try_current() {
            Err(_) => self.fetch(),
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::MultiThread => tokio::task::block_in_place(|| self.fetch()),
                // block_in_place is unavailable on a current-thread runtime
                _ => std::thread::scope(|scope| {
                    scope.spawn(|| self.fetch()).join().unwrap_or_else(|_| {
                        Err(ProcessError::fetch(&self.url, "fetch thread panicked"))
                    })
                }),
            },
        }
    }

    fn author(&self) -> &str {
        &self.author
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn save(&self) -> Result<Vec<u8>, ProcessError> {
        save_json(self)
    }
}

impl LoadProcessor for CurlProcessor {
    const KIND: &'static str = "curl";

    fn load(data: &[u8]) -> Result<Self, ProcessError> {
        load_json(data)
    }
}
