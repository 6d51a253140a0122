use crate::types::{ChangeEvent, ChangeItem, Issue};
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

const MILLIS_PER_DAY: i64 = 86_400_000;

pub const FIELD_RESOLUTION: &str = "resolution";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_ASSIGNEE: &str = "assignee";
pub const FIELD_COMMENT: &str = "Comment";
pub const FIELD_ATTACHMENT: &str = "Attachment";
pub const FIELD_ZENDESK_TICKET_COUNT: &str = "Zendesk Ticket Count";

pub const RESOLUTION_DONE: &str = "Done";
pub const STATUS_IN_PROGRESS: &str = "In Progress";
pub const STATUS_READY_FOR_TESTING: &str = "Ready For Testing";
pub const STATUS_READY_FOR_SYSTEM_TESTING: &str = "Ready For System Testing";

/// Which end of the timeline a search starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    /// Oldest event first; finds the first occurrence.
    Earliest,
    /// Newest event first; finds the last occurrence.
    Latest,
}

/// What a change item must look like to count as the event a metric waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemMatcher {
    /// `field` changed to exactly `to`.
    ChangedTo {
        field: &'static str,
        to: &'static str,
    },
    /// `field` was set while previously empty.
    FirstSet { field: &'static str },
}

impl ItemMatcher {
    pub fn matches(&self, item: &ChangeItem) -> bool {
        match *self {
            ItemMatcher::ChangedTo { field, to } => {
                item.field == field && item.to_value.as_deref() == Some(to)
            }
            ItemMatcher::FirstSet { field } => {
                item.field == field && item.from_value.as_deref().map_or(true, str::is_empty)
            }
        }
    }
}

/// A "days from creation until X" metric over an issue's change history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineRule {
    pub name: &'static str,
    pub matcher: ItemMatcher,
    pub order: SearchOrder,
}

pub const DONE: TimelineRule = TimelineRule {
    name: "days_until_done",
    matcher: ItemMatcher::ChangedTo {
        field: FIELD_RESOLUTION,
        to: RESOLUTION_DONE,
    },
    order: SearchOrder::Earliest,
};

pub const IN_PROGRESS: TimelineRule = TimelineRule {
    name: "days_until_in_progress",
    matcher: ItemMatcher::ChangedTo {
        field: FIELD_STATUS,
        to: STATUS_IN_PROGRESS,
    },
    order: SearchOrder::Earliest,
};

pub const FIRST_READY_FOR_TESTING: TimelineRule = TimelineRule {
    name: "days_until_first_ready_for_testing",
    matcher: ItemMatcher::ChangedTo {
        field: FIELD_STATUS,
        to: STATUS_READY_FOR_TESTING,
    },
    order: SearchOrder::Earliest,
};

/// Deliberately the last hand-off to system testing, not the first.
pub const READY_FOR_SYSTEM_TESTING: TimelineRule = TimelineRule {
    name: "days_until_ready_for_system_testing",
    matcher: ItemMatcher::ChangedTo {
        field: FIELD_STATUS,
        to: STATUS_READY_FOR_SYSTEM_TESTING,
    },
    order: SearchOrder::Latest,
};

pub const FIRST_ASSIGNED: TimelineRule = TimelineRule {
    name: "days_until_first_assigned",
    matcher: ItemMatcher::FirstSet {
        field: FIELD_ASSIGNEE,
    },
    order: SearchOrder::Earliest,
};

/// Metrics derived from one issue's change history and fix versions.
///
/// Day counts are `None` when the event they measure never happened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineMetrics {
    pub days_until_done: Option<i64>,
    pub days_until_released: Option<i64>,
    pub days_until_ready_for_system_testing: Option<i64>,
    pub days_until_first_ready_for_testing: Option<i64>,
    pub days_until_in_progress: Option<i64>,
    pub days_until_first_assigned: Option<i64>,
    pub comment_count: u64,
    pub attachment_count: u64,
    pub zendesk_tickets: u64,
}

/// Change events ordered for a scan. The sort is stable, so events sharing a
/// timestamp keep their upstream order in both directions.
pub struct OrderedTimeline<'a> {
    ascending: Vec<&'a ChangeEvent>,
    descending: Vec<&'a ChangeEvent>,
}

impl<'a> OrderedTimeline<'a> {
    pub fn new(events: &'a [ChangeEvent]) -> Self {
        let mut ascending: Vec<&ChangeEvent> = events.iter().collect();
        ascending.sort_by(|a, b| a.created.cmp(&b.created));
        let mut descending: Vec<&ChangeEvent> = events.iter().collect();
        descending.sort_by(|a, b| b.created.cmp(&a.created));
        Self {
            ascending,
            descending,
        }
    }

    pub fn in_order(&self, order: SearchOrder) -> &[&'a ChangeEvent] {
        match order {
            SearchOrder::Earliest => &self.ascending,
            SearchOrder::Latest => &self.descending,
        }
    }

    /// Timestamp of the first event, in `rule.order`, holding a matching item.
    pub fn find(&self, rule: &TimelineRule) -> Option<DateTime<FixedOffset>> {
        self.in_order(rule.order)
            .iter()
            .find(|event| event.items.iter().any(|item| rule.matcher.matches(item)))
            .map(|event| event.created)
    }
}

/// Whole days from `from` to `to`, rounded toward negative infinity.
pub fn days_between<Tz1: TimeZone, Tz2: TimeZone>(from: &DateTime<Tz1>, to: &DateTime<Tz2>) -> i64 {
    let millis = to.timestamp_millis() - from.timestamp_millis();
    millis.div_euclid(MILLIS_PER_DAY)
}

/// Days from creation until the event `rule` looks for.
pub fn days_until(issue: &Issue, timeline: &OrderedTimeline<'_>, rule: &TimelineRule) -> Option<i64> {
    timeline
        .find(rule)
        .map(|at| days_between(&issue.fields.created, &at))
}

/// Days from creation to the release date of the first released fix version.
///
/// Release dates carry no time and are taken as midnight UTC.
pub fn days_until_released(issue: &Issue) -> Option<i64> {
    let version = issue.fields.fix_versions.iter().find(|v| v.released)?;
    let release_date = version.release_date?;
    let released_at = Utc.from_utc_datetime(&release_date.and_hms_opt(0, 0, 0)?);
    Some(days_between(&issue.fields.created, &released_at))
}

/// The most recent parseable "Zendesk Ticket Count", or 0 if there is none.
///
/// Events are visited newest first and, within an event, only its last ticket
/// count item is considered. A value that is not a non-negative integer is
/// skipped and the scan moves on to the next older event.
pub fn zendesk_tickets(timeline: &OrderedTimeline<'_>) -> u64 {
    timeline
        .in_order(SearchOrder::Latest)
        .iter()
        .filter_map(|event| {
            event
                .items
                .iter()
                .rev()
                .find(|item| item.field == FIELD_ZENDESK_TICKET_COUNT)
        })
        .find_map(|item| item.to_value.as_deref()?.trim().parse::<u64>().ok())
        .unwrap_or(0)
}

/// Number of items across all events touching `field`.
pub fn count_items(events: &[ChangeEvent], field: &str) -> u64 {
    events
        .iter()
        .flat_map(|event| event.items.iter())
        .filter(|item| item.field == field)
        .count() as u64
}

/// Derives every timeline metric for `issue`.
///
/// # Arguments
/// * `issue` - The issue, for its creation time and fix versions.
/// * `events` - Its full change history, in any order.
pub fn calculate_metrics(issue: &Issue, events: &[ChangeEvent]) -> TimelineMetrics {
    let timeline = OrderedTimeline::new(events);

    TimelineMetrics {
        days_until_done: days_until(issue, &timeline, &DONE),
        days_until_released: days_until_released(issue),
        days_until_ready_for_system_testing: days_until(issue, &timeline, &READY_FOR_SYSTEM_TESTING),
        days_until_first_ready_for_testing: days_until(issue, &timeline, &FIRST_READY_FOR_TESTING),
        days_until_in_progress: days_until(issue, &timeline, &IN_PROGRESS),
        days_until_first_assigned: days_until(issue, &timeline, &FIRST_ASSIGNED),
        comment_count: count_items(events, FIELD_COMMENT),
        attachment_count: count_items(events, FIELD_ATTACHMENT),
        zendesk_tickets: zendesk_tickets(&timeline),
    }
}

/// True when `events` are already in non-decreasing time order.
pub fn is_chronological(events: &[ChangeEvent]) -> bool {
    events.windows(2).all(|pair| pair[0].created <= pair[1].created)
}
