use crate::error::ReportError;
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// Description of one outbound API call, relative to the tracker's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.set_query(key, value);
        self
    }

    /// Replaces `key` if already present, otherwise appends it.
    pub fn set_query(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.query.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key.to_string(), value)),
        }
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Sends a request and returns the decoded JSON body.
///
/// Implementations must map any non-success status to [`ReportError::Transport`].
/// Exactly one request is in flight at a time; callers await each call fully.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<Value, ReportError>;
}
