pub mod activity;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod jira;
pub mod metrics;
pub mod output;
pub mod report;
pub mod transport;
pub mod types;

use anyhow::Context;
use config::AppConfig;
use jira::JiraClient;
use output::CsvFileSink;
use report::{Report, ReportAssembler, SearchQuery};

/// Runs the configured search end to end: writes the CSV as rows arrive and
/// returns the finished report.
pub async fn generate_report(config: &AppConfig) -> anyhow::Result<Report> {
    let client = JiraClient::new(&config.jira_endpoint, config.jira_credentials.clone())
        .context("Failed to build Jira client")?;
    let query = SearchQuery::jql(config.jira_jql.clone()).with_page_size(config.search_page_size);
    let mut sink = CsvFileSink::new(config.output_csv.clone());

    tracing::info!(jql = %config.jira_jql, output = %config.output_csv.display(), "Generating report");

    let report = ReportAssembler::new(&client, config.changelog_page_size)
        .run(&query, &mut sink)
        .await?;

    Ok(report)
}
