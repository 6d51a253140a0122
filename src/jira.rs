use crate::config::Credentials;
use crate::error::ReportError;
use crate::transport::{ApiRequest, Transport};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

pub const SEARCH_PATH: &str = "/rest/api/3/search";
pub const DEV_DETAILS_PATH: &str = "/jsw/graphql";
pub const DEV_DETAILS_OPERATION: &str = "DevDetailsDialog";

/// GraphQL document backing the development panel of an issue. Only the
/// repository, commit and deployment fields read by the report are selected.
const DEV_DETAILS_QUERY: &str = r#"
query DevDetailsDialog ($issueId: ID!) {
    developmentInformation(issueId: $issueId) {
        details {
            instanceTypes {
                repository {
                    name
                    branches {
                        name
                    }
                    commits {
                        isMerge
                        files {
                            path
                            linesAdded
                            linesRemoved
                        }
                    }
                }
            }
            deploymentProviders {
                deployments {
                    displayName
                }
            }
        }
    }
}"#;

/// Changelog path for one issue.
pub fn changelog_path(issue_id: &str) -> String {
    format!("/rest/api/2/issue/{}/changelog", issue_id)
}

/// Builds the non-paginated development-details request for one issue.
pub fn dev_details_request(issue_id: &str) -> ApiRequest {
    let body = json!({
        "operationName": DEV_DETAILS_OPERATION,
        "query": DEV_DETAILS_QUERY,
        "variables": { "issueId": issue_id },
    });
    ApiRequest::post(DEV_DETAILS_PATH, body).with_query("operation", DEV_DETAILS_OPERATION)
}

/// HTTP transport for the tracker's REST and GraphQL endpoints.
#[derive(Clone)]
pub struct JiraClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl JiraClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, ReportError> {
        Ok(Self {
            http: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for JiraClient {
    async fn send(&self, request: &ApiRequest) -> Result<Value, ReportError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path))
            .basic_auth(&self.credentials.username, Some(&self.credentials.token))
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), path = %request.path, "Jira request failed");
            return Err(ReportError::Transport {
                status: status.as_u16(),
                path: request.path.clone(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| ReportError::decode(format!("response body from {}", request.path), e))
    }
}
