//! Assembles one report row per issue.
//!
//! This module implements `ReportAssembler`, which walks the issue search and, for each
//! issue:
//! 1. Pages in the full changelog and derives timeline metrics.
//! 2. Fetches development details and tallies activity and hotspots.
//! 3. Appends a flattened `ReportRow` and hands the rows so far to the sink.

use crate::activity::{self, ActivityMetrics, HotspotMaps};
use crate::error::ReportError;
use crate::fetcher::{self, PageAccumulator, Pager};
use crate::jira;
use crate::metrics::{self, TimelineMetrics};
use crate::output::RowSink;
use crate::transport::{ApiRequest, Transport};
use crate::types::{ChangeEvent, ChangelogPage, DevDetailsResponse, DevelopmentDetails, Issue, SearchPage};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Rendering of a day metric whose event never happened.
pub const ABSENT_DAYS: &str = "NaN";

/// Issue search input: a free-form expression plus any structured filter keys.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub jql: Option<String>,
    pub filter: Map<String, Value>,
    pub page_size: Option<u32>,
}

impl SearchQuery {
    pub fn jql(jql: impl Into<String>) -> Self {
        Self {
            jql: Some(jql.into()),
            ..Self::default()
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn to_request(&self) -> ApiRequest {
        let mut body = self.filter.clone();
        if let Some(jql) = &self.jql {
            body.insert("jql".to_string(), Value::String(jql.clone()));
        }
        ApiRequest::post(jira::SEARCH_PATH, Value::Object(body))
    }
}

fn serialize_days<S>(days: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match days {
        Some(days) => serializer.serialize_i64(*days),
        None => serializer.serialize_str(ABSENT_DAYS),
    }
}

/// One flattened output record. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub issue_id: String,
    pub issue_key: String,
    pub issue_type: String,
    /// Creation date (YYYY-MM-DD) in the timestamp's own offset.
    pub date: String,
    pub pipeline_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub file_count: u64,
    pub branch_count: u64,
    pub repo_count: u64,
    pub component_count: u64,
    #[serde(serialize_with = "serialize_days")]
    pub days_until_done: Option<i64>,
    #[serde(serialize_with = "serialize_days")]
    pub days_until_released: Option<i64>,
    #[serde(serialize_with = "serialize_days")]
    pub days_until_ready_for_system_testing: Option<i64>,
    #[serde(serialize_with = "serialize_days")]
    pub days_until_first_ready_for_testing: Option<i64>,
    #[serde(serialize_with = "serialize_days")]
    pub days_until_in_progress: Option<i64>,
    #[serde(serialize_with = "serialize_days")]
    pub days_until_first_assigned: Option<i64>,
    pub comment_count: u64,
    pub attachment_count: u64,
    pub zendesk_tickets: u64,
    pub component_list: String,
    pub issue_summary: String,
}

pub const COLUMNS: [&str; 22] = [
    "issue_id",
    "issue_key",
    "issue_type",
    "date",
    "pipeline_count",
    "lines_added",
    "lines_removed",
    "file_count",
    "branch_count",
    "repo_count",
    "component_count",
    "days_until_done",
    "days_until_released",
    "days_until_ready_for_system_testing",
    "days_until_first_ready_for_testing",
    "days_until_in_progress",
    "days_until_first_assigned",
    "comment_count",
    "attachment_count",
    "zendesk_tickets",
    "component_list",
    "issue_summary",
];

/// `<a;b;c>` for the issue's component names, in their listed order.
pub fn component_list(issue: &Issue) -> String {
    let names: Vec<&str> = issue
        .fields
        .components
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    format!("<{}>", names.join(";"))
}

/// Flattens identity fields and both metric sets into one row.
pub fn assemble_row(issue: &Issue, timeline: &TimelineMetrics, activity: &ActivityMetrics) -> ReportRow {
    ReportRow {
        issue_id: issue.id.clone(),
        issue_key: issue.key.clone(),
        issue_type: issue.fields.issue_type.name.clone(),
        date: issue.fields.created.format("%Y-%m-%d").to_string(),
        pipeline_count: activity.pipeline_count,
        lines_added: activity.lines_added,
        lines_removed: activity.lines_removed,
        file_count: activity.file_count,
        branch_count: activity.branch_count,
        repo_count: activity.repo_count,
        component_count: activity.component_count,
        days_until_done: timeline.days_until_done,
        days_until_released: timeline.days_until_released,
        days_until_ready_for_system_testing: timeline.days_until_ready_for_system_testing,
        days_until_first_ready_for_testing: timeline.days_until_first_ready_for_testing,
        days_until_in_progress: timeline.days_until_in_progress,
        days_until_first_assigned: timeline.days_until_first_assigned,
        comment_count: timeline.comment_count,
        attachment_count: timeline.attachment_count,
        zendesk_tickets: timeline.zendesk_tickets,
        component_list: component_list(issue),
        issue_summary: issue.fields.summary.clone(),
    }
}

/// Rows and hotspot tallies of one report run.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub hotspots: HotspotMaps,
}

/// Collects change events across changelog pages.
#[derive(Debug, Default)]
pub struct ChangelogCollector {
    events: Vec<ChangeEvent>,
}

impl ChangelogCollector {
    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.events
    }
}

impl PageAccumulator for ChangelogCollector {
    type Page = ChangelogPage;

    fn accumulate(&mut self, page: ChangelogPage) -> usize {
        let consumed = page.values.len();
        self.events.extend(page.values);
        consumed
    }
}

pub struct ReportAssembler<'a, T: Transport + ?Sized> {
    transport: &'a T,
    changelog_page_size: u32,
}

impl<'a, T: Transport + ?Sized> ReportAssembler<'a, T> {
    pub fn new(transport: &'a T, changelog_page_size: u32) -> Self {
        Self {
            transport,
            changelog_page_size,
        }
    }

    /// Runs the search and builds a row for every issue it returns.
    ///
    /// The sink is reset to an empty table before the search starts and then
    /// receives the full row set after each issue, so a failure part way through
    /// leaves every finished row on disk and nothing from an earlier run.
    pub async fn run(&self, query: &SearchQuery, sink: &mut dyn RowSink) -> Result<Report, ReportError> {
        let mut report = Report::default();
        sink.write_rows(&report.rows)?;
        let mut pager = Pager::new(self.transport, query.to_request(), query.page_size);

        while let Some(page) = pager.next_page::<SearchPage>().await? {
            let consumed = page.issues.len();
            tracing::info!(
                offset = pager.offset(),
                total = page.total,
                issues = consumed,
                "Fetched search page"
            );

            for issue in &page.issues {
                self.process_issue(issue, &mut report).await?;
                sink.write_rows(&report.rows)?;
            }
            pager.advance(consumed)?;
        }

        tracing::info!(rows = report.rows.len(), "Report complete");
        Ok(report)
    }

    /// Fetches everything one issue needs and appends its row to `report`.
    pub async fn process_issue(&self, issue: &Issue, report: &mut Report) -> Result<(), ReportError> {
        tracing::info!(issue_key = %issue.key, "Processing issue");

        let events = self.fetch_changelog(issue).await?;
        let details = self.fetch_dev_details(issue).await?;

        let timeline = metrics::calculate_metrics(issue, &events);
        let activity = activity::aggregate(&details, &issue.fields.components, &mut report.hotspots);

        report.rows.push(assemble_row(issue, &timeline, &activity));
        Ok(())
    }

    async fn fetch_changelog(&self, issue: &Issue) -> Result<Vec<ChangeEvent>, ReportError> {
        let mut collector = ChangelogCollector::default();
        fetcher::fetch_all(
            self.transport,
            ApiRequest::get(jira::changelog_path(&issue.id)),
            &mut collector,
            Some(self.changelog_page_size),
        )
        .await?;

        let events = collector.into_events();
        if !metrics::is_chronological(&events) {
            tracing::debug!(
                issue_key = %issue.key,
                events = events.len(),
                "Changelog not in chronological order; sorting before scan"
            );
        }
        Ok(events)
    }

    async fn fetch_dev_details(&self, issue: &Issue) -> Result<DevelopmentDetails, ReportError> {
        let body = self
            .transport
            .send(&jira::dev_details_request(&issue.id))
            .await?;

        if let Some(errors) = body.get("errors").filter(|e| !e.is_null()) {
            let message = serde_json::to_string_pretty(errors).unwrap_or_default();
            return Err(ReportError::GraphQl(message));
        }

        let response: DevDetailsResponse = serde_json::from_value(body)
            .map_err(|e| ReportError::decode(format!("development details of {}", issue.key), e))?;
        Ok(response.data.development_information.details)
    }
}
