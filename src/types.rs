//! Wire model for the tracker's search, changelog and development-details payloads.
//!
//! Only the fields the report reads are modelled. Everything optional in practice is
//! defaulted so that sparse payloads still decode.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// Timestamp format used by the tracker, e.g. `2024-01-05T10:12:33.123+0000`.
const JIRA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f%z";

/// Parses a tracker timestamp, falling back to RFC 3339.
pub fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_str(s, JIRA_TIMESTAMP_FORMAT).or_else(|_| DateTime::parse_from_rfc3339(s))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    parse_timestamp(&s).map_err(serde::de::Error::custom)
}

/// A response page that reports the size of the whole result set.
pub trait Paged {
    fn total(&self) -> u64;
}

/// One page of issue search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

impl Paged for SearchPage {
    fn total(&self) -> u64 {
        self.total
    }
}

/// One page of an issue's change history.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangelogPage {
    pub total: u64,
    #[serde(default)]
    pub values: Vec<ChangeEvent>,
}

impl Paged for ChangelogPage {
    fn total(&self) -> u64 {
        self.total
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueFields {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created: DateTime<FixedOffset>,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "issuetype")]
    pub issue_type: IssueType,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default, rename = "fixVersions")]
    pub fix_versions: Vec<FixVersion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueType {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixVersion {
    #[serde(default)]
    pub released: bool,
    #[serde(default, rename = "releaseDate")]
    pub release_date: Option<NaiveDate>,
}

/// A timestamped group of field changes on one issue.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEvent {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created: DateTime<FixedOffset>,
    #[serde(default)]
    pub items: Vec<ChangeItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangeItem {
    pub field: String,
    #[serde(default, rename = "fromString")]
    pub from_value: Option<String>,
    #[serde(default, rename = "toString")]
    pub to_value: Option<String>,
}

/// Top level of the `DevDetailsDialog` GraphQL response.
#[derive(Debug, Clone, Deserialize)]
pub struct DevDetailsResponse {
    pub data: DevDetailsData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevDetailsData {
    #[serde(rename = "developmentInformation")]
    pub development_information: DevelopmentInformation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevelopmentInformation {
    pub details: DevelopmentDetails,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DevelopmentDetails {
    #[serde(default, rename = "instanceTypes")]
    pub instance_types: Vec<InstanceType>,
    #[serde(default, rename = "deploymentProviders")]
    pub deployment_providers: Vec<DeploymentProvider>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceType {
    #[serde(default, rename = "repository")]
    pub repositories: Vec<Repository>,
}

/// Branches are only counted, so their contents are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub branches: Vec<IgnoredAny>,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commit {
    #[serde(default, rename = "isMerge")]
    pub is_merge: bool,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitFile {
    pub path: String,
    #[serde(default, rename = "linesAdded")]
    pub lines_added: u64,
    #[serde(default, rename = "linesRemoved")]
    pub lines_removed: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeploymentProvider {
    #[serde(default)]
    pub deployments: Vec<IgnoredAny>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_jira_timestamp() {
        let ts = parse_timestamp("2024-01-05T10:12:33.123+0000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-05T10:12:33.123+00:00");

        let ts = parse_timestamp("2024-01-05T10:12:33.000-0500").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_parse_rfc3339_fallback() {
        let ts = parse_timestamp("2024-01-05T10:12:33Z").unwrap();
        assert_eq!(ts.timestamp(), 1_704_449_553);
    }

    #[test]
    fn test_issue_decodes_with_sparse_fields() {
        let issue: Issue = serde_json::from_value(json!({
            "id": "10001",
            "key": "SI-1",
            "fields": {
                "created": "2024-01-01T09:00:00.000+0000",
                "issuetype": { "name": "Bug" }
            }
        }))
        .unwrap();

        assert_eq!(issue.key, "SI-1");
        assert!(issue.fields.components.is_empty());
        assert!(issue.fields.fix_versions.is_empty());
        assert_eq!(issue.fields.summary, "");
    }

    #[test]
    fn test_change_item_null_from_string() {
        let item: ChangeItem = serde_json::from_value(json!({
            "field": "assignee",
            "fromString": null,
            "toString": "Ada"
        }))
        .unwrap();

        assert_eq!(item.from_value, None);
        assert_eq!(item.to_value.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_dev_details_counts_opaque_branches_and_deployments() {
        let details: DevelopmentDetails = serde_json::from_value(json!({
            "instanceTypes": [{
                "name": "Bitbucket",
                "repository": [{
                    "name": "shop",
                    "branches": [{ "name": "a", "url": "x" }, { "name": "b" }],
                    "commits": [{ "displayId": "abc", "isMerge": false, "files": [] }],
                    "pullRequests": [{ "id": "1" }]
                }]
            }],
            "deploymentProviders": [{ "name": "Pipelines", "deployments": [{ "state": "OK" }] }]
        }))
        .unwrap();

        let repository = &details.instance_types[0].repositories[0];
        assert_eq!(repository.branches.len(), 2);
        assert_eq!(repository.commits.len(), 1);
        assert_eq!(details.deployment_providers[0].deployments.len(), 1);
    }
}
